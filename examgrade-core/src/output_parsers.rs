use serde::de::DeserializeOwned;

use crate::GradeError;

/// Removes a surrounding markdown code fence, with or without a `json` tag.
pub fn strip_code_fences(input: &str) -> &str {
    let cleaned = input.trim();
    if cleaned.starts_with("```json") {
        cleaned
            .trim_start_matches("```json")
            .trim_end_matches("```")
            .trim()
    } else if cleaned.starts_with("```") {
        cleaned
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        cleaned
    }
}

/// Parses model output into `T`, tolerating code fences and chatter around
/// the JSON body.
pub fn parse_json<T: DeserializeOwned>(input: &str) -> Result<T, GradeError> {
    let cleaned = strip_code_fences(input);
    match serde_json::from_str(cleaned) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let mut last_err = first_err;
            for span in json_spans(cleaned) {
                match serde_json::from_str(span) {
                    Ok(value) => return Ok(value),
                    Err(err) => last_err = err,
                }
            }
            Err(GradeError::ParseFailed {
                output: input.to_string(),
                reason: last_err.to_string(),
            })
        }
    }
}

/// Outermost `{...}` and `[...]` spans, the one opening first tried first.
fn json_spans(text: &str) -> Vec<&str> {
    let mut spans: Vec<(usize, &str)> = [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| {
            let start = text.find(open)?;
            let end = text.rfind(close)?;
            (end > start).then(|| (start, &text[start..=end]))
        })
        .collect();
    spans.sort_by_key(|(start, _)| *start);
    spans.into_iter().map(|(_, span)| span).collect()
}
