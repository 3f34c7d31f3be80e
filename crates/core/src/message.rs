//! Message and Context domain types.
//!
//! A context is the ordered list of role-tagged messages a caller wants to
//! send to a provider. On the wire it is newline-delimited JSON, one message
//! object per line.

use crate::error::ContextError;
use serde::{Deserialize, Serialize};

/// The role that is protected from resizing unless configured otherwise.
pub const DEVELOPER_ROLE: &str = "developer";

/// A single message in a context.
///
/// `role` is an opaque tag and is never rewritten. Fields other than `role`
/// and `content` are kept in `extra` and serialized back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message ("developer", "user", "assistant", ...)
    pub role: String,

    /// The text content
    pub content: String,

    /// Any other fields present on the incoming message
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    /// Create a message with an arbitrary role.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Create a new developer (instruction) message.
    pub fn developer(content: impl Into<String>) -> Self {
        Self::new(DEVELOPER_ROLE, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }

    /// Copy of this message with different content; role and extra fields are kept.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            role: self.role.clone(),
            content: content.into(),
            extra: self.extra.clone(),
        }
    }

    /// Decode one context line, reporting problems against `line` (1-based).
    fn from_line(raw: &str, line: usize) -> Result<Self, ContextError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| ContextError::InvalidJson {
                line,
                reason: e.to_string(),
            })?;

        let serde_json::Value::Object(mut fields) = value else {
            return Err(ContextError::NotAnObject { line });
        };

        let role = take_string(&mut fields, "role", line)?;
        let content = take_string(&mut fields, "content", line)?;

        Ok(Self {
            role,
            content,
            extra: fields,
        })
    }
}

fn take_string(
    fields: &mut serde_json::Map<String, serde_json::Value>,
    field: &'static str,
    line: usize,
) -> Result<String, ContextError> {
    match fields.remove(field) {
        Some(serde_json::Value::String(s)) => Ok(s),
        _ => Err(ContextError::MissingField { line, field }),
    }
}

/// An ordered sequence of messages. The last message is the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    pub messages: Vec<Message>,
}

impl Context {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Parse a newline-delimited JSON context.
    ///
    /// Blank lines are skipped; every other line must be a JSON object with
    /// string `role` and `content` fields.
    pub fn parse(jsonl: &str) -> Result<Self, ContextError> {
        let messages = jsonl
            .split('\n')
            .enumerate()
            .filter(|(_, raw)| !raw.trim().is_empty())
            .map(|(i, raw)| Message::from_line(raw.trim(), i + 1))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { messages })
    }

    /// Serialize back to newline-delimited JSON, one message per line.
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        let lines = self
            .messages
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines.join("\n"))
    }

    /// Content of the last message, or "" for an empty context.
    pub fn query(&self) -> &str {
        self.messages.last().map(|m| m.content.as_str()).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl From<Vec<Message>> for Context {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}
