use examgrade_core::{parse_json, strip_code_fences, GradeError};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize, PartialEq)]
struct Score {
    score: f64,
}

#[test]
fn strips_json_fences() {
    assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fences("```\n[1]\n```"), "[1]");
    assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
}

#[test]
fn parses_fenced_json() {
    let parsed: Score = parse_json("```json\n{\"score\": 7.5}\n```").unwrap();
    assert_eq!(parsed, Score { score: 7.5 });
}

#[test]
fn recovers_json_surrounded_by_chatter() {
    let parsed: serde_json::Value =
        parse_json("Here is the result: {\"score\": 3} Hope it helps!").unwrap();
    assert_eq!(parsed, json!({"score": 3}));
}

#[test]
fn recovers_top_level_arrays() {
    let parsed: Vec<u32> = parse_json("answers follow [1, 2, 3]").unwrap();
    assert_eq!(parsed, vec![1, 2, 3]);
}

#[test]
fn recovers_object_after_bracketed_note() {
    let parsed: Score = parse_json("Note [1]: {\"score\": 6} see [2]").unwrap();
    assert_eq!(parsed, Score { score: 6.0 });
}

#[test]
fn recovers_array_after_braced_chatter() {
    let parsed: Vec<u32> = parse_json("Format {id}: [4, 5]").unwrap();
    assert_eq!(parsed, vec![4, 5]);
}

#[test]
fn reports_parse_failure_with_raw_output() {
    let err = parse_json::<Score>("no json here").unwrap_err();
    match err {
        GradeError::ParseFailed { output, .. } => assert_eq!(output, "no json here"),
        other => panic!("unexpected error: {other:?}"),
    }
}
