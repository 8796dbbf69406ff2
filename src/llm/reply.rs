//! JSON-or-text model replies

use serde::de::DeserializeOwned;
use serde_json::Value;

/// A model reply that may or may not be the JSON object we asked for
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Reply parsed as a JSON object
    Structured(serde_json::Map<String, Value>),
    /// Anything else, trimmed
    Unstructured(String),
}

impl ModelReply {
    /// Classify raw reply text
    ///
    /// A reply wrapped in a Markdown code fence is unwrapped first. Only JSON
    /// objects count as structured; bare strings, numbers and arrays do not.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let candidate = strip_code_fence(trimmed);

        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => Self::Structured(map),
            _ => Self::Unstructured(trimmed.to_string()),
        }
    }

    /// Deserialize the structured form into `T`
    ///
    /// Returns `None` for unstructured replies or when the object does not fit `T`.
    #[must_use]
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        match self {
            Self::Structured(map) => serde_json::from_value(Value::Object(map.clone())).ok(),
            Self::Unstructured(_) => None,
        }
    }

    /// Whether the reply parsed as a JSON object
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }
}

/// Strip a surrounding ```json ... ``` fence, if present
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return text;
    };

    // Drop the info string ("json") on the opening line
    body.split_once('\n').map_or(body, |(_, inner)| inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Deserialize)]
    struct Judgment {
        found: bool,
    }

    #[test]
    fn test_parse_plain_object() {
        let reply = ModelReply::parse(r#"  {"found": true, "description": "to your left"} "#);
        assert!(reply.is_structured());
        assert!(reply.decode::<Judgment>().unwrap().found);
    }

    #[test]
    fn test_parse_fenced_object() {
        let reply = ModelReply::parse("```json\n{\"found\": false}\n```");
        assert!(reply.is_structured());
        assert!(!reply.decode::<Judgment>().unwrap().found);
    }

    #[test]
    fn test_prose_is_unstructured() {
        let reply = ModelReply::parse("  Yes, the cup is on your right.\n");
        assert_eq!(
            reply,
            ModelReply::Unstructured("Yes, the cup is on your right.".to_string())
        );
        assert!(reply.decode::<Judgment>().is_none());
    }

    #[test]
    fn test_non_object_json_is_unstructured() {
        assert!(!ModelReply::parse("true").is_structured());
        assert!(!ModelReply::parse("[1, 2]").is_structured());
        assert!(!ModelReply::parse("\"cup\"").is_structured());
    }

    #[test]
    fn test_unterminated_fence_is_left_alone() {
        let reply = ModelReply::parse("```json\n{\"found\": true}");
        assert!(!reply.is_structured());
    }
}
