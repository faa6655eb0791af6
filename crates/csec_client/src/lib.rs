//! Shared CSEC assistant client library (credential store, REST client
//! with renew-and-retry, streaming chat). Used by the terminal frontend
//! and the `csec-chat` CLI.

pub mod api;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod messages;
pub mod store;

pub use api::{
    ApiClient, ApiError, ApiRequest, ChatSessionDetail, ChatSessionSummary, Document, FormField,
    MessageRecord, TokenPair,
};
pub use chat::{ChatClient, ChatEvent, ConnectionState, Status};
pub use config::{default_config_path, ApiSection, AuthSection, Config, ConfigError};
pub use conversation::{Conversation, Role, Turn};
pub use messages::{ChatRequest, ServerFrame};
pub use store::{StoreError, TokenStore};
