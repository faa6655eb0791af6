//! Conversation state: ordered turns plus an explicit open assistant
//! turn that accumulates streamed deltas until it is sealed.

use serde::{Deserialize, Serialize};

use crate::messages::ServerFrame;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One complete utterance by either side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered turns with at most one open assistant turn at the tail.
///
/// A delta extends the open turn when one exists and starts a new one
/// otherwise; `done` and `error` seal it. Sealed turns are never
/// mutated again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    sealed: Vec<Turn>,
    open: Option<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one inbound frame into the conversation. `session` frames
    /// carry no conversational content and are ignored here.
    pub fn apply(&mut self, frame: &ServerFrame) {
        match frame {
            ServerFrame::Delta { content } => self.append_delta(content),
            ServerFrame::Done | ServerFrame::Error { .. } => self.seal(),
            ServerFrame::Session { .. } => {}
        }
    }

    /// Extend the open assistant turn, or start one.
    pub fn append_delta(&mut self, content: &str) {
        match &mut self.open {
            Some(turn) => turn.content.push_str(content),
            None => self.open = Some(Turn::assistant(content)),
        }
    }

    /// Seal the open assistant turn, if any. Idempotent.
    pub fn seal(&mut self) {
        if let Some(turn) = self.open.take() {
            self.sealed.push(turn);
        }
    }

    /// Append a completed user turn. Any open assistant turn is sealed
    /// first so arrival order is preserved.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.seal();
        self.sealed.push(Turn::user(content));
    }

    /// All turns in order, the open turn last.
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.sealed.iter().chain(self.open.iter())
    }

    pub fn len(&self) -> usize {
        self.sealed.len() + usize::from(self.open.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<&Turn> {
        self.open.as_ref().or_else(|| self.sealed.last())
    }

    /// True while an assistant turn is still accepting deltas.
    pub fn is_accumulating(&self) -> bool {
        self.open.is_some()
    }
}
