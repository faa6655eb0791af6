//! Backend command layer for the terminal frontend. Plain async
//! methods on `App` so integration tests can drive them directly,
//! with String errors at the boundary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use csec_client::chat::{ChatEvent, ConnectionState, Status};
use csec_client::{
    config, ApiClient, ChatClient, ChatSessionDetail, ChatSessionSummary, Config, Document,
    TokenStore,
};
use serde::{Deserialize, Serialize};

/// Connection status reported to the frontend loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionStatus {
    /// "connected", "connecting", or "disconnected".
    pub state: String,
    /// Last non-connected observation, when there was one.
    pub message: Option<String>,
}

/// One completed chat exchange.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    /// Full assembled answer text (all deltas concatenated).
    pub answer: String,
    /// Error reported by the server or the transport, if any.
    pub error: Option<String>,
}

/// Resolve config path from optional override, env, or default.
pub fn resolve_config_path(override_path: Option<&str>) -> Result<PathBuf, String> {
    if let Some(p) = override_path {
        return Ok(PathBuf::from(p));
    }
    if let Ok(val) = std::env::var("CSEC_CONFIG") {
        return Ok(PathBuf::from(val));
    }
    config::default_config_path().ok_or_else(|| "Cannot determine config path".into())
}

/// Frontend state: the config plus the two clients sharing one
/// credential store.
pub struct App {
    config: Config,
    api: ApiClient,
    chat: ChatClient,
}

impl App {
    /// Build the app from a loaded config; the credential store is
    /// opened at `tokens_path` and shared by both clients.
    pub fn new(config: Config, tokens_path: impl Into<PathBuf>) -> Self {
        let store = Arc::new(TokenStore::open(tokens_path));
        let api = ApiClient::new(config.api_base_url(), store.clone());
        let chat = ChatClient::new(config.chat_url(), store);
        Self { config, api, chat }
    }

    /// Load the config at `path` (defaults when the file is missing)
    /// and build the app.
    pub fn from_config_path(path: &Path) -> Result<Self, String> {
        let config = config::load_or_default(path).map_err(|e| e.to_string())?;
        let tokens_path = config.tokens_path(path);
        Ok(Self::new(config, tokens_path))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ── Auth ────────────────────────────────────────────────────────

    pub async fn login(&self, username: &str, password: &str) -> Result<(), String> {
        self.api
            .login(username, password)
            .await
            .map_err(|e| e.to_string())
    }

    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<(), String> {
        self.api
            .register(email, username, password)
            .await
            .map_err(|e| e.to_string())
    }

    pub fn logout(&self) -> Result<(), String> {
        self.api.logout().map_err(|e| e.to_string())
    }

    pub fn is_authenticated(&self) -> bool {
        self.api.is_authenticated()
    }

    // ── Connection ──────────────────────────────────────────────────

    /// Attempt to connect the chat stream. Never an Err; a failed
    /// connect is reported in the returned status.
    pub async fn connect(&mut self) -> ConnectionStatus {
        self.chat.open().await;
        // Drain the queued observations so later exchanges start clean.
        let mut last = None;
        while let Some(event) = self.chat.try_event() {
            if let ChatEvent::Status(status) = event {
                last = Some(status);
            }
        }
        ConnectionStatus {
            state: state_name(self.chat.state()).into(),
            message: last
                .filter(|status| *status != Status::Connected)
                .map(|status| status.to_string()),
        }
    }

    /// Close the chat stream. Safe to call when not connected.
    pub async fn disconnect(&mut self) {
        self.chat.close().await;
        while self.chat.try_event().is_some() {}
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        ConnectionStatus {
            state: state_name(self.chat.state()).into(),
            message: None,
        }
    }

    // ── Chat ────────────────────────────────────────────────────────

    /// Send one message and drive the stream until the reply is
    /// sealed. Returns the assembled reply; server errors and
    /// transport loss land in `ChatReply::error`.
    pub async fn send_message(&mut self, message: &str) -> Result<ChatReply, String> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(ChatReply::default());
        }
        if self.chat.state() != ConnectionState::Open {
            return Err("Not connected".into());
        }
        self.chat.send(message).await;

        let mut reply = ChatReply::default();
        while let Some(event) = self.chat.next_event().await {
            match event {
                ChatEvent::Delta(chunk) => reply.answer.push_str(&chunk),
                ChatEvent::Done => break,
                ChatEvent::Status(Status::StreamError(err)) => {
                    reply.error = Some(err);
                    break;
                }
                ChatEvent::Status(Status::AlreadyStreaming) => {
                    return Err("A reply is already streaming".into());
                }
                ChatEvent::Status(Status::NotConnected) => {
                    return Err("Not connected".into());
                }
                ChatEvent::Status(Status::Disconnected) => {
                    reply.error = Some(Status::Disconnected.to_string());
                    break;
                }
                ChatEvent::Session(_) | ChatEvent::Status(_) => {}
            }
        }
        Ok(reply)
    }

    pub fn session_id(&self) -> Option<i64> {
        self.chat.session_id()
    }

    // ── Documents ───────────────────────────────────────────────────

    pub async fn list_documents(&self) -> Result<Vec<Document>, String> {
        self.api.documents().await.map_err(|e| e.to_string())
    }

    pub async fn upload_document(&self, title: &str, path: &Path) -> Result<Document, String> {
        let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.pdf");
        self.api
            .upload_document(title, file_name, bytes)
            .await
            .map_err(|e| e.to_string())
    }

    pub async fn delete_document(&self, id: i64) -> Result<(), String> {
        self.api.delete_document(id).await.map_err(|e| e.to_string())
    }

    // ── Chat history ────────────────────────────────────────────────

    pub async fn list_sessions(&self) -> Result<Vec<ChatSessionSummary>, String> {
        self.api.chat_sessions().await.map_err(|e| e.to_string())
    }

    pub async fn session_detail(&self, id: i64) -> Result<ChatSessionDetail, String> {
        self.api
            .chat_session_detail(id)
            .await
            .map_err(|e| e.to_string())
    }
}

fn state_name(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Closed => "disconnected",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Open => "connected",
    }
}
