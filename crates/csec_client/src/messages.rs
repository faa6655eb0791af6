//! Wire types for the streaming chat connection. Client ↔ server JSON.

use serde::{Deserialize, Serialize};

/// Client → server: one chat message. `session_id` is null to ask the
/// server to create a fresh session.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub session_id: Option<i64>,
}

/// Server → client frame; discriminator is the JSON "type" field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Announces the session this connection's messages belong to.
    Session { session_id: i64 },
    /// One streamed chunk of the assistant reply.
    Delta { content: String },
    /// The assistant reply is complete.
    Done,
    /// Server-side failure. The connection stays usable.
    Error { error: String },
}

impl ServerFrame {
    /// Parse one inbound frame. Undecodable text is an error; a
    /// well-formed object with a missing or unknown "type" is `None`
    /// and callers skip it.
    pub fn parse(text: &str) -> Result<Option<ServerFrame>, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        match value.get("type").and_then(|t| t.as_str()) {
            Some("session" | "delta" | "done" | "error") => {
                Ok(Some(serde_json::from_value(value)?))
            }
            _ => Ok(None),
        }
    }
}
