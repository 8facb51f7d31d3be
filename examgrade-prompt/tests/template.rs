use examgrade_core::{Role, Value};
use examgrade_prompt::{vars, ChatPromptTemplate, PromptTemplate, PromptVars};

#[test]
fn renders_template_with_vars() {
    let tmpl = PromptTemplate::new("Hello {{name}}");
    let rendered = tmpl.render(&vars([("name", "Ayşe")])).expect("render");
    assert_eq!(rendered, "Hello Ayşe");
}

#[test]
fn does_not_confuse_overlapping_keys() {
    let tmpl = PromptTemplate::new("{{name}} {{fullname}}");
    let rendered = tmpl
        .render(&vars([("name", "X"), ("fullname", "Y")]))
        .expect("render");
    assert_eq!(rendered, "X Y");
}

#[test]
fn renders_numbers_and_tolerates_whitespace() {
    let tmpl = PromptTemplate::new("MAX: {{ max_score }}");
    let rendered = tmpl
        .render(&vars([("max_score", Value::from(10.5))]))
        .expect("render");
    assert_eq!(rendered, "MAX: 10.5");
}

#[test]
fn missing_vars_render_empty() {
    let tmpl = PromptTemplate::new("[{{missing}}]");
    assert_eq!(tmpl.render(&PromptVars::new()).unwrap(), "[]");
}

#[test]
fn literal_json_braces_survive_rendering() {
    let tmpl = PromptTemplate::new(r#"Return {"score": 1} for {{q}}"#);
    let rendered = tmpl.render(&vars([("q", "Q1")])).unwrap();
    assert_eq!(rendered, r#"Return {"score": 1} for Q1"#);
}

#[test]
fn chat_template_emits_system_then_user() {
    let chat = ChatPromptTemplate::new("You grade {{subject}}.", "Answer: {{answer}}");
    let messages = chat
        .format_messages(&vars([("subject", "biology"), ("answer", "mitochondria")]))
        .unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[0].content, "You grade biology.");
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(messages[1].content, "Answer: mitochondria");
}
