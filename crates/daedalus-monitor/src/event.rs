//! Payload parsing and the compact view record built from each event.

use serde_json::Value;

use crate::errors::ParseFailure;

/// Author value used by the engine for its own status messages.
pub const SYSTEM_AUTHOR: &str = "system";
/// Placeholder when the payload names no model version.
pub const UNKNOWN_MODEL_VERSION: &str = "unknown";
/// Title used when neither a system message nor an explicit title exists.
pub const UNTITLED_EVENT: &str = "Untitled Event";

const TITLE_MAX_CHARS: usize = 100;
const TITLE_ELLIPSIS: &str = "...";

/// Token counters reported by the model behind an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub candidate_tokens: u64,
    pub thought_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens
            .saturating_add(self.candidate_tokens)
            .saturating_add(self.thought_tokens)
    }

    pub(crate) fn saturating_add(self, other: TokenUsage) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens.saturating_add(other.prompt_tokens),
            candidate_tokens: self.candidate_tokens.saturating_add(other.candidate_tokens),
            thought_tokens: self.thought_tokens.saturating_add(other.thought_tokens),
        }
    }

    fn from_metadata(value: Option<&Value>) -> Self {
        let count = |key: &str| {
            value
                .and_then(|m| m.get(key))
                .and_then(Value::as_u64)
                .unwrap_or(0)
        };
        Self {
            prompt_tokens: count("promptTokenCount"),
            candidate_tokens: count("candidatesTokenCount"),
            thought_tokens: count("thoughtsTokenCount"),
        }
    }
}

/// One pipeline event projected for display.
///
/// When the payload has no `id`, a random local token is used instead; such
/// ids are not stable across reconnects, so a replayed event will not be
/// recognised as a duplicate.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StreamEvent {
    pub id: String,
    pub author: String,
    pub model_version: String,
    pub usage: TokenUsage,
    pub title: String,
}

/// Parses the trimmed content of a `data: ` line.
pub fn parse_event(content: &str) -> Result<StreamEvent, ParseFailure> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| ParseFailure::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(ParseFailure::Malformed("payload is not a JSON object".into()));
    }
    event_from_value(&value)
}

pub(crate) fn event_from_value(value: &Value) -> Result<StreamEvent, ParseFailure> {
    let author = value
        .get("author")
        .and_then(Value::as_str)
        .ok_or(ParseFailure::MissingAuthor)?
        .to_string();
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
    let model_version = value
        .get("modelVersion")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_MODEL_VERSION)
        .to_string();
    let usage = TokenUsage::from_metadata(value.get("usageMetadata"));
    let title = derive_title(&author, value);

    Ok(StreamEvent {
        id,
        author,
        model_version,
        usage,
        title,
    })
}

fn derive_title(author: &str, value: &Value) -> String {
    if author == SYSTEM_AUTHOR
        && let Some(body) = message_text(value)
    {
        let mut title: String = body.chars().take(TITLE_MAX_CHARS).collect();
        title.push_str(TITLE_ELLIPSIS);
        return title;
    }
    value
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(UNTITLED_EVENT)
        .to_string()
}

/// First text part of `content.parts`, falling back to a top-level `message`.
fn message_text(value: &Value) -> Option<&str> {
    let from_parts = value
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .and_then(|parts| parts.iter().find_map(|p| p.get("text").and_then(Value::as_str)));
    from_parts.or_else(|| value.get("message").and_then(Value::as_str))
}
