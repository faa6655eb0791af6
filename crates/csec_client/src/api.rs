//! Authenticated REST client. Attaches the stored access token to
//! every request, renews it through the refresh endpoint on a 401,
//! and retries the original request at most once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{multipart, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::conversation::Role;
use crate::store::{StoreError, TokenStore};

/// REST-path error. Streaming-path conditions are reported as status
/// events on the chat client instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request failed with status {status}: {body}")]
    RequestFailed { status: StatusCode, body: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("token store error: {0}")]
    Store(#[from] StoreError),
}

/// One logical request. A retried attempt is rebuilt from this
/// descriptor with fresh headers, so the body survives the retry.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    payload: Payload,
}

#[derive(Debug, Clone)]
enum Payload {
    Empty,
    Json(Value),
    Form(Vec<FormField>),
}

/// One multipart field, owned so the form can be rebuilt on retry.
#[derive(Debug, Clone)]
pub struct FormField {
    name: String,
    value: FormValue,
}

#[derive(Debug, Clone)]
enum FormValue {
    Text(String),
    File { file_name: String, bytes: Vec<u8> },
}

impl FormField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    pub fn file(name: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File {
                file_name: file_name.into(),
                bytes,
            },
        }
    }
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            payload: Payload::Empty,
        }
    }

    pub fn post_json(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            payload: Payload::Json(body),
        }
    }

    pub fn post_form(path: impl Into<String>, fields: Vec<FormField>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            payload: Payload::Form(fields),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            path: path.into(),
            payload: Payload::Empty,
        }
    }
}

/// Access/refresh pair as issued by the login endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Uploaded document as the backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub file: String,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

/// One persisted chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Chat session as listed, with its most recent message if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSessionSummary {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_message: Option<MessageRecord>,
}

/// Chat session with its full message history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSessionDetail {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<MessageRecord>,
}

/// REST client holding the shared credential store.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<TokenStore>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, store: Arc<TokenStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            store,
        }
    }

    /// Whether an access token is currently stored.
    pub fn is_authenticated(&self) -> bool {
        self.store.access_token().is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── Generic authenticated requests ──────────────────────────────

    /// Issue `request` with the stored access token attached. A 401
    /// response triggers one credential renewal and, when that yields
    /// a fresh access token, exactly one retry of the same request.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.attempt(&request).await?;
        let response = if response.status() == StatusCode::UNAUTHORIZED {
            match self.refresh_access_token().await? {
                Some(_) => self.attempt(&request).await?,
                None => response,
            }
        } else {
            response
        };
        Self::read_body(response).await
    }

    async fn attempt(&self, request: &ApiRequest) -> Result<reqwest::Response, ApiError> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path));
        builder = match &request.payload {
            Payload::Empty => builder.header(CONTENT_TYPE, "application/json"),
            Payload::Json(body) => builder.json(body),
            Payload::Form(fields) => builder.multipart(build_form(fields)),
        };
        if let Some(access) = self.store.access_token() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", access));
        }
        debug!(method = %request.method, path = %request.path, "sending request");
        Ok(builder.send().await?)
    }

    async fn read_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::RequestFailed { status, body });
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    // ── Credential renewal ──────────────────────────────────────────

    /// Exchange the refresh token for a new access token. A rejected
    /// exchange clears the store entirely. The refresh token itself is
    /// never rotated here.
    async fn refresh_access_token(&self) -> Result<Option<String>, ApiError> {
        let Some(refresh) = self.store.refresh_token() else {
            return Ok(None);
        };
        let response = self
            .http
            .post(self.url("/auth/jwt/refresh/"))
            .json(&json!({ "refresh": refresh }))
            .send()
            .await?;
        if !response.status().is_success() {
            warn!(status = %response.status(), "token renewal rejected, clearing credentials");
            self.store.clear()?;
            return Ok(None);
        }
        #[derive(Deserialize)]
        struct Renewed {
            access: Option<String>,
        }
        let renewed: Renewed = response.json().await?;
        match renewed.access {
            Some(access) => {
                self.store.set_tokens(&access, &refresh)?;
                info!("access token renewed");
                Ok(Some(access))
            }
            None => Ok(None),
        }
    }

    // ── Auth endpoints ──────────────────────────────────────────────

    /// Log in and persist the issued credential pair. The request goes
    /// out without an Authorization header and is never retried.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url("/auth/jwt/create/"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        let pair: TokenPair = Self::read_body(response).await?;
        self.store.set_tokens(&pair.access, &pair.refresh)?;
        info!(%username, "logged in");
        Ok(())
    }

    /// Create an account. Does not log in; callers follow up with
    /// [`ApiClient::login`].
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let body = json!({
            "email": email,
            "username": username,
            "password": password,
            "re_password": password,
        });
        let _: Value = self.send(ApiRequest::post_json("/auth/users/", body)).await?;
        Ok(())
    }

    /// Drop both stored credentials.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.store.clear()?;
        Ok(())
    }

    // ── Documents ───────────────────────────────────────────────────

    pub async fn documents(&self) -> Result<Vec<Document>, ApiError> {
        self.send(ApiRequest::get("/api/documents/")).await
    }

    pub async fn upload_document(
        &self,
        title: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Document, ApiError> {
        let fields = vec![
            FormField::text("title", title),
            FormField::file("file", file_name, bytes),
        ];
        self.send(ApiRequest::post_form("/api/documents/", fields))
            .await
    }

    pub async fn delete_document(&self, id: i64) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(format!("/api/documents/{}/", id)))
            .await
    }

    // ── Chat history ────────────────────────────────────────────────

    pub async fn chat_sessions(&self) -> Result<Vec<ChatSessionSummary>, ApiError> {
        self.send(ApiRequest::get("/api/chat/sessions/")).await
    }

    pub async fn chat_session_detail(&self, id: i64) -> Result<ChatSessionDetail, ApiError> {
        self.send(ApiRequest::get(format!("/api/chat/sessions/{}/", id)))
            .await
    }
}

fn build_form(fields: &[FormField]) -> multipart::Form {
    let mut form = multipart::Form::new();
    for field in fields {
        form = match &field.value {
            FormValue::Text(text) => form.text(field.name.clone(), text.clone()),
            FormValue::File { file_name, bytes } => form.part(
                field.name.clone(),
                multipart::Part::bytes(bytes.clone()).file_name(file_name.clone()),
            ),
        };
    }
    form
}
