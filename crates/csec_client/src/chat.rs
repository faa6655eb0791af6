//! Streaming chat client: connect, send messages, and fold the inbound
//! frame stream (session, delta, done, error) into a conversation.

use std::collections::VecDeque;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use crate::conversation::Conversation;
use crate::messages::{ChatRequest, ServerFrame};
use crate::store::TokenStore;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connection lifecycle. `Open` is the only state that accepts sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
}

/// Status observations, rendered with the backend's wording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Connected,
    Disconnected,
    /// Transport-level failure; always followed by `Disconnected`.
    Error,
    /// Server-reported stream failure; the connection stays open.
    StreamError(String),
    InvalidMessage,
    NotConnected,
    AlreadyStreaming,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Connected => write!(f, "connected"),
            Status::Disconnected => write!(f, "disconnected"),
            Status::Error => write!(f, "error"),
            Status::StreamError(message) => write!(f, "{}", message),
            Status::InvalidMessage => write!(f, "invalid_message"),
            Status::NotConnected => write!(f, "not_connected"),
            Status::AlreadyStreaming => write!(f, "already_streaming"),
        }
    }
}

/// Events surfaced by [`ChatClient::next_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Connection status changed or a send precondition failed.
    Status(Status),
    /// The server announced the session this connection writes to.
    Session(i64),
    /// The open assistant turn grew by this chunk.
    Delta(String),
    /// The assistant turn was sealed.
    Done,
}

/// Streaming chat connection with client-side turn accumulation.
///
/// All mutation happens through `&mut self` on the owning task, so
/// frames are dispatched strictly in arrival order. Reconnecting after
/// a drop is the caller's job (call `open` again); the conversation
/// and the session handle survive reconnects.
pub struct ChatClient {
    endpoint: String,
    store: Arc<TokenStore>,
    state: ConnectionState,
    socket: Option<WsStream>,
    session_id: Option<i64>,
    streaming: bool,
    conversation: Conversation,
    pending: VecDeque<ChatEvent>,
}

impl ChatClient {
    /// `endpoint` is the full chat URL, e.g. `ws://host/ws/chat/`.
    pub fn new(endpoint: impl Into<String>, store: Arc<TokenStore>) -> Self {
        Self {
            endpoint: endpoint.into(),
            store,
            state: ConnectionState::Closed,
            socket: None,
            session_id: None,
            streaming: false,
            conversation: Conversation::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Session handle announced by the server, once one exists.
    pub fn session_id(&self) -> Option<i64> {
        self.session_id
    }

    /// True between a successful `send` and the sealing done/error.
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The URL `open` dials: the endpoint plus the access token as a
    /// query parameter when one is stored. The handshake has no header
    /// channel for credentials.
    pub fn connect_url(&self) -> String {
        match self.store.access_token() {
            Some(token) => format!("{}?token={}", self.endpoint, urlencoding::encode(&token)),
            None => self.endpoint.clone(),
        }
    }

    /// Establish the connection. No-op while `Connecting` or `Open`.
    /// The outcome is observable through the event queue: `connected`
    /// on success, `error` then `disconnected` on a failed handshake.
    pub async fn open(&mut self) {
        if self.state != ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Connecting;
        let url = self.connect_url();
        match tokio_tungstenite::connect_async(url).await {
            Ok((socket, _)) => {
                info!(endpoint = %self.endpoint, "chat connected");
                self.socket = Some(socket);
                self.state = ConnectionState::Open;
                self.pending.push_back(ChatEvent::Status(Status::Connected));
            }
            Err(err) => {
                warn!(endpoint = %self.endpoint, %err, "chat connect failed");
                self.state = ConnectionState::Closed;
                self.streaming = false;
                self.pending.push_back(ChatEvent::Status(Status::Error));
                self.pending
                    .push_back(ChatEvent::Status(Status::Disconnected));
            }
        }
    }

    /// Queue one user message. Empty input is dropped silently; a send
    /// while a reply is streaming or while disconnected transmits
    /// nothing and only records a status observation.
    pub async fn send(&mut self, message: &str) {
        let message = message.trim();
        if message.is_empty() {
            return;
        }
        if self.streaming {
            self.pending
                .push_back(ChatEvent::Status(Status::AlreadyStreaming));
            return;
        }
        if self.state != ConnectionState::Open || self.socket.is_none() {
            self.pending
                .push_back(ChatEvent::Status(Status::NotConnected));
            return;
        }
        let request = ChatRequest {
            message,
            session_id: self.session_id,
        };
        let text = match serde_json::to_string(&request) {
            Ok(text) => text,
            Err(err) => {
                warn!(%err, "failed to encode chat request");
                self.pending.push_back(ChatEvent::Status(Status::Error));
                return;
            }
        };
        self.conversation.push_user(message);
        self.streaming = true;
        if let Some(socket) = self.socket.as_mut() {
            if let Err(err) = socket.send(Message::Text(text)).await {
                warn!(%err, "chat send failed");
                self.fail_transport();
            }
        }
    }

    /// Next observation or inbound frame effect, in arrival order.
    /// Returns `None` once the connection is closed and every queued
    /// event has been drained.
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            let socket = self.socket.as_mut()?;
            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    if let Some(event) = self.handle_frame(&text) {
                        return Some(event);
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("chat disconnected");
                    self.transition_closed();
                    return Some(ChatEvent::Status(Status::Disconnected));
                }
                Some(Ok(_)) => continue,
                Some(Err(err)) => {
                    warn!(%err, "chat transport error");
                    self.transition_closed();
                    self.pending
                        .push_back(ChatEvent::Status(Status::Disconnected));
                    return Some(ChatEvent::Status(Status::Error));
                }
            }
        }
    }

    /// Pop a queued observation without touching the socket.
    pub fn try_event(&mut self) -> Option<ChatEvent> {
        self.pending.pop_front()
    }

    /// Tear the connection down. Safe to call repeatedly; only an
    /// actual close emits `disconnected`.
    pub async fn close(&mut self) {
        if self.state == ConnectionState::Closed && self.socket.is_none() {
            return;
        }
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None).await;
        }
        self.state = ConnectionState::Closed;
        self.streaming = false;
        self.pending
            .push_back(ChatEvent::Status(Status::Disconnected));
    }

    fn handle_frame(&mut self, text: &str) -> Option<ChatEvent> {
        match ServerFrame::parse(text) {
            Ok(Some(frame)) => {
                self.conversation.apply(&frame);
                match frame {
                    ServerFrame::Session { session_id } => {
                        self.session_id = Some(session_id);
                        Some(ChatEvent::Session(session_id))
                    }
                    ServerFrame::Delta { content } => Some(ChatEvent::Delta(content)),
                    ServerFrame::Done => {
                        self.streaming = false;
                        Some(ChatEvent::Done)
                    }
                    ServerFrame::Error { error } => {
                        self.streaming = false;
                        Some(ChatEvent::Status(Status::StreamError(error)))
                    }
                }
            }
            Ok(None) => {
                debug!(frame = text, "ignoring frame of unknown type");
                None
            }
            Err(err) => {
                warn!(%err, "undecodable chat frame");
                Some(ChatEvent::Status(Status::InvalidMessage))
            }
        }
    }

    fn transition_closed(&mut self) {
        self.socket = None;
        self.state = ConnectionState::Closed;
        self.streaming = false;
    }

    fn fail_transport(&mut self) {
        self.transition_closed();
        self.pending.push_back(ChatEvent::Status(Status::Error));
        self.pending
            .push_back(ChatEvent::Status(Status::Disconnected));
    }
}
