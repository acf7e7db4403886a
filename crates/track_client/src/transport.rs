//! Transport seam between the orchestrator and the tracks API.
//!
//! The orchestrator only ever sees [`Transport`]; [`HttpTransport`] is the
//! reqwest-backed implementation used outside of tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{error::ErrorBody, protocol::Envelope};
use tracing::debug;

use crate::{config::ClientSettings, error::TrackError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(value: Method) -> Self {
        match value {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Binary { bytes: Vec<u8>, content_type: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path, RequestBody::Empty)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path, RequestBody::Empty)
    }

    pub fn post_json(path: impl Into<String>, body: &impl Serialize) -> Result<Self, TrackError> {
        Ok(Self::new(
            Method::Post,
            path,
            RequestBody::Json(serde_json::to_value(body)?),
        ))
    }

    pub fn put_json(path: impl Into<String>, body: &impl Serialize) -> Result<Self, TrackError> {
        Ok(Self::new(
            Method::Put,
            path,
            RequestBody::Json(serde_json::to_value(body)?),
        ))
    }

    pub fn put_empty(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path, RequestBody::Empty)
    }

    pub fn post_bytes(
        path: impl Into<String>,
        bytes: Vec<u8>,
        content_type: impl Into<String>,
    ) -> Self {
        Self::new(
            Method::Post,
            path,
            RequestBody::Binary {
                bytes,
                content_type: content_type.into(),
            },
        )
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request and returns the parsed body of a 2xx response.
    /// Empty bodies come back as `Value::Null`.
    async fn send(&self, request: ApiRequest) -> Result<Value, TrackError>;
}

/// How an endpoint wraps its body. List and detail endpoints answer with
/// `{"payload": ...}`, several mutation endpoints answer with the bare entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Enveloped,
    Raw,
    /// Unwraps `{"payload": ...}` when present, otherwise takes the body as is.
    Either,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body<T> {
    Enveloped(T),
    Raw(T),
}

impl<T> Body<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Enveloped(inner) | Self::Raw(inner) => inner,
        }
    }
}

impl ResponseShape {
    pub fn decode<T: DeserializeOwned>(self, value: Value) -> Result<Body<T>, TrackError> {
        match self {
            Self::Enveloped => {
                let envelope: Envelope<T> = serde_json::from_value(value).map_err(|err| {
                    TrackError::UnexpectedResponse(format!("expected payload envelope: {err}"))
                })?;
                Ok(Body::Enveloped(envelope.payload))
            }
            Self::Raw => Ok(Body::Raw(serde_json::from_value(value)?)),
            Self::Either => {
                if value.get("payload").is_some() {
                    Self::Enveloped.decode(value)
                } else {
                    Self::Raw.decode(value)
                }
            }
        }
    }
}

pub struct HttpTransport {
    http: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            auth_token: None,
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, TrackError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: settings.server_url.clone(),
            auth_token: settings.auth_token.clone(),
        })
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, TrackError> {
        let url = self.url(&request.path);
        debug!(method = request.method.as_str(), %url, "tracks api request");

        let mut builder = self.http.request(request.method.into(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Binary {
                bytes,
                content_type,
            } => builder.header(header::CONTENT_TYPE, content_type).body(bytes),
        };

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = ErrorBody::from_text(&text).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            return Err(TrackError::server(status.as_u16(), message));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(body) => Ok(body),
            Err(_) => Ok(Value::String(text)),
        }
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
