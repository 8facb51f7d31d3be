mod provider;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use examgrade_agent::{
    grade_student, AgentConfig, AnswerKey, ChatRequest, EvaluationOutput, ExamEvaluationAgent,
    StudentAnswers, StudentReport, TracingProgress, Traced,
};
use examgrade_core::Message;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::provider::{build_client, ClientOptions, Provider};

#[derive(Parser, Debug)]
#[command(name = "examgrade", version, about = "Grade exam answer sheets with an LLM")]
struct Cli {
    #[arg(long, value_enum, env = "EXAMGRADE_PROVIDER", default_value = "gemini", global = true)]
    provider: Provider,

    /// Model name; defaults to the provider's standard model
    #[arg(long, env = "EXAMGRADE_MODEL", global = true)]
    model: Option<String>,

    /// API key; falls back to GEMINI_API_KEY or OPENAI_API_KEY
    #[arg(long, env = "EXAMGRADE_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", global = true)]
    base_url: Option<String>,

    /// JSON file with agent settings (thresholds, backoff, sampling)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (default 120, 15 for chat)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Include the audit trace in the output
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract questions and expected answers from answer key text
    ParseKey { file: PathBuf },
    /// Extract a student's answers from answer sheet text
    ParseStudent {
        file: PathBuf,
        #[arg(long)]
        questions: usize,
    },
    /// Grade parsed answers against a parsed answer key
    Evaluate {
        #[arg(long)]
        key: PathBuf,
        #[arg(long)]
        answers: PathBuf,
    },
    /// Name strengths and weaknesses from an evaluation
    Analyze {
        #[arg(long)]
        name: String,
        #[arg(long)]
        evaluation: PathBuf,
        /// Maximum exam score; defaults to the sum over evaluated questions
        #[arg(long)]
        max_score: Option<f64>,
    },
    /// Parse, evaluate and analyze one student end to end
    Grade {
        /// Answer key as parsed JSON or as raw text
        #[arg(long)]
        key: PathBuf,
        #[arg(long)]
        student: PathBuf,
        #[arg(long)]
        name: String,
    },
    /// Ask a question about a graded student
    Chat {
        /// Report written by `grade`
        #[arg(long)]
        evaluation: PathBuf,
        #[arg(long)]
        question: String,
        /// Earlier turns as a JSON list of {"role", "content"}
        #[arg(long)]
        history: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct Printed<'a, T: Serialize> {
    output: &'a T,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<&'a examgrade_agent::AgentTrace>,
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = read_text(path)?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_traced<T: Serialize>(traced: &Traced<T>, with_trace: bool) -> anyhow::Result<()> {
    if with_trace {
        print_json(&Printed {
            output: &traced.output,
            trace: Some(&traced.trace),
        })
    } else {
        print_json(&traced.output)
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AgentConfig> {
    match path {
        Some(path) => Ok(AgentConfig::from_json(&read_text(path)?)
            .with_context(|| format!("loading config {}", path.display()))?),
        None => Ok(AgentConfig::default()),
    }
}

fn chat_summary(report: &StudentReport) -> String {
    match &report.analysis {
        Some(analysis) => format!(
            "Güçlü yönler: {}. Zayıf yönler: {}.",
            analysis.strengths.join("; "),
            analysis.weaknesses.join("; ")
        ),
        None => String::new(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let default_timeout = match cli.command {
        Command::Chat { .. } => 15,
        _ => 120,
    };
    let llm = build_client(ClientOptions {
        provider: cli.provider,
        model: cli.model.clone(),
        api_key: cli.api_key.clone(),
        base_url: cli.base_url.clone(),
        timeout: Duration::from_secs(cli.timeout.unwrap_or(default_timeout)),
    })?;
    let config = load_config(cli.config.as_deref())?;
    let agent = ExamEvaluationAgent::new(llm, config)?;

    match cli.command {
        Command::ParseKey { file } => {
            let traced = agent.parse_answer_key(&read_text(&file)?).await?;
            print_traced(&traced, cli.trace)?;
        }
        Command::ParseStudent { file, questions } => {
            let traced = agent
                .parse_student_answer(&read_text(&file)?, questions)
                .await?;
            print_traced(&traced, cli.trace)?;
        }
        Command::Evaluate { key, answers } => {
            let key: AnswerKey = read_json(&key)?;
            let answers: StudentAnswers = read_json(&answers)?;
            let traced = agent.evaluate_student(&key, &answers).await?;
            print_traced(&traced, cli.trace)?;
        }
        Command::Analyze {
            name,
            evaluation,
            max_score,
        } => {
            let evaluated: EvaluationOutput = read_json(&evaluation)?;
            let max_score = max_score
                .unwrap_or_else(|| evaluated.evaluations.iter().map(|e| e.max_score).sum());
            let report = StudentReport::from_evaluations(name, evaluated.evaluations, max_score);
            let traced = agent
                .analyze_student_performance(
                    &report.student_name,
                    report.total_score,
                    report.max_score,
                    report.percentage,
                    &report.question_summaries(),
                )
                .await?;
            print_traced(&traced, cli.trace)?;
        }
        Command::Grade { key, student, name } => {
            let raw_key = read_text(&key)?;
            let key = match serde_json::from_str::<AnswerKey>(&raw_key) {
                Ok(key) => key,
                Err(_) => {
                    tracing::info!(file = %key.display(), "answer key is not JSON, parsing it as text");
                    agent.parse_answer_key(&raw_key).await?.output
                }
            };
            let report =
                grade_student(&agent, &key, &name, &read_text(&student)?, &TracingProgress)
                    .await?;
            print_json(&report)?;
        }
        Command::Chat {
            evaluation,
            question,
            history,
        } => {
            let report: StudentReport = read_json(&evaluation)?;
            let history: Vec<Message> = match history {
                Some(path) => read_json(&path)?,
                None => Vec::new(),
            };
            let request = ChatRequest {
                question,
                summary: chat_summary(&report),
                questions: report.question_summaries(),
                student_name: report.student_name,
                total_score: report.total_score,
                max_score: report.max_score,
                percentage: report.percentage,
                history,
            };
            println!("{}", agent.chat_about_student(&request).await);
        }
    }
    Ok(())
}
