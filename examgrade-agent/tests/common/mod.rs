#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use examgrade_agent::{
    prompts, AgentConfig, AnswerKey, AnswerKeyQuestion, StudentAnswer, StudentAnswers,
};
use examgrade_core::{BackoffPolicy, ChatLlm, GradeError, LlmRequest, LlmResponse};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    ParseKey,
    ParseStudent,
    Evaluate,
    QualityCheck,
    Analyze,
    Chat,
}

pub fn tool_of(request: &LlmRequest) -> Tool {
    let system = request
        .messages
        .first()
        .map(|m| m.content.as_str())
        .unwrap_or_default();
    if system == prompts::PARSE_ANSWER_KEY_SYSTEM {
        Tool::ParseKey
    } else if system.starts_with(prompts::PARSE_STUDENT_SYSTEM.split("{{").next().unwrap()) {
        Tool::ParseStudent
    } else if system == prompts::EVALUATE_SYSTEM {
        Tool::Evaluate
    } else if system == prompts::QUALITY_CHECK_SYSTEM {
        Tool::QualityCheck
    } else if system == prompts::ANALYZE_SYSTEM {
        Tool::Analyze
    } else {
        Tool::Chat
    }
}

pub fn user_prompt(request: &LlmRequest) -> &str {
    request
        .messages
        .last()
        .map(|m| m.content.as_str())
        .unwrap_or_default()
}

/// Number after `SORU #` in an evaluate prompt.
pub fn question_number(request: &LlmRequest) -> u32 {
    let prompt = user_prompt(request);
    let start = prompt.find("SORU #").expect("evaluate prompt") + "SORU #".len();
    prompt[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .expect("question number")
}

type Responder = dyn Fn(&LlmRequest) -> Result<String, GradeError> + Send + Sync;

/// Answers every request with whatever the closure returns and records the
/// requests it saw.
pub struct FakeLlm {
    respond: Box<Responder>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl FakeLlm {
    pub fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&LlmRequest) -> Result<String, GradeError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        let message = message.to_string();
        Self::new(move |_| Err(GradeError::LlmProvider(message.clone())))
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self, tool: Tool) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| tool_of(r) == tool)
            .count()
    }
}

#[async_trait::async_trait]
impl ChatLlm for FakeLlm {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, GradeError> {
        self.requests.lock().unwrap().push(request.clone());
        let content = (self.respond)(&request)?;
        Ok(LlmResponse {
            content,
            finish_reason: Some("STOP".to_string()),
        })
    }
}

pub fn test_config() -> AgentConfig {
    AgentConfig {
        backoff: BackoffPolicy::immediate(3),
        ..AgentConfig::default()
    }
}

pub fn question(number: u32) -> AnswerKeyQuestion {
    AnswerKeyQuestion {
        number,
        question_text: format!("Soru {number} metni"),
        expected_answer: format!("Beklenen cevap {number}"),
        max_score: 10.0,
        keywords: vec!["kavram".to_string()],
    }
}

pub fn answer_key(count: u32) -> AnswerKey {
    AnswerKey::new((1..=count).map(question).collect())
}

pub fn answers(numbers: &[u32]) -> StudentAnswers {
    StudentAnswers {
        answers: numbers
            .iter()
            .map(|n| StudentAnswer::new(*n, format!("Öğrenci cevabı {n}")))
            .collect(),
    }
}

pub fn evaluation_json(score: f64, confidence: f64) -> String {
    serde_json::json!({
        "score": score,
        "feedback": "İyi bir cevap",
        "is_correct": score >= 7.0,
        "confidence": confidence,
        "reasoning": "Ana noktalar mevcut"
    })
    .to_string()
}

pub fn verdict_json(acceptable: bool) -> String {
    serde_json::json!({
        "is_acceptable": acceptable,
        "issues": if acceptable { vec![] } else { vec!["Puan ile geri bildirim uyumsuz"] },
        "confidence": 0.9
    })
    .to_string()
}
