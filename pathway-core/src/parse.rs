use serde::de::DeserializeOwned;
use thiserror::Error;

/// A model response that could not be turned into the stage's typed shape.
#[derive(Debug, Error)]
#[error("malformed model response: {reason}")]
pub struct MalformedResponse {
    pub reason: String,
}

/// Parse raw model output into a stage response.
///
/// The model is instructed to answer with a single JSON object, but in
/// practice responses arrive wrapped in code fences or prose. The object is
/// located by its outermost braces before deserializing.
pub fn parse_stage_response<T>(raw: &str) -> Result<T, MalformedResponse>
where
    T: DeserializeOwned,
{
    let json = extract_json_object(raw).ok_or_else(|| MalformedResponse {
        reason: "no JSON object in output".to_string(),
    })?;

    serde_json::from_str(json).map_err(|e| MalformedResponse {
        reason: e.to_string(),
    })
}

/// Extract the JSON object substring from raw model output.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn parses_a_bare_object() {
        let parsed: Sample = parse_stage_response(r#"{"name": "intro", "count": 3}"#).unwrap();
        assert_eq!(
            parsed,
            Sample {
                name: "intro".to_string(),
                count: 3
            }
        );
    }

    #[test]
    fn parses_an_object_wrapped_in_fences_and_prose() {
        let raw = "Sure! Here is the JSON you asked for:\n```json\n{\"name\": \"intro\", \"count\": 3}\n```\nLet me know if you need anything else.";
        let parsed: Sample = parse_stage_response(raw).unwrap();
        assert_eq!(parsed.count, 3);
    }

    #[test]
    fn rejects_output_without_an_object() {
        let result: Result<Sample, _> = parse_stage_response("I can't help with that.");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_an_object_with_the_wrong_shape() {
        let result: Result<Sample, _> = parse_stage_response(r#"{"name": "intro"}"#);
        let error = result.unwrap_err();
        assert!(error.to_string().starts_with("malformed model response"));
    }
}
