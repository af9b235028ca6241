//! HTTP plumbing for the Mercury REST API.
//!
//! [`Transport`] is the seam between the client and the network: the blocking
//! `reqwest` implementation lives here, tests plug in stubs. [`Session`] is the
//! cloneable handle that entities keep so they can issue their own requests.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::{debug, trace};

use crate::credentials::ApiKey;
use crate::error::{MercuryError, Result};

/// Issues authenticated requests against paths relative to the API root and
/// returns the decoded JSON body.
pub trait Transport: Send + Sync {
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value>;
    fn post(&self, path: &str, body: &Value) -> Result<Value>;
}

pub struct HttpTransport {
    base_url: Url,
    key: ApiKey,
    client: Client,
}

impl HttpTransport {
    /// `base_url` is the versioned API root, e.g.
    /// `https://backend.mercury.com/api/v1/`.
    pub fn new(base_url: &str, key: ApiKey, timeout: Duration) -> Result<Self> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| MercuryError::InvalidRequest(format!("invalid base URL {base}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(map_transport_error)?;

        Ok(Self {
            base_url,
            key,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| MercuryError::InvalidRequest(format!("invalid path {path}: {e}")))
    }

    fn finish(&self, response: reqwest::blocking::Response) -> Result<Value> {
        let status = response.status();
        let body = response.text().map_err(map_transport_error)?;
        trace!(target: "transport", status = status.as_u16(), bytes = body.len(), "response received");
        decode_body(status, &body)
    }
}

impl Transport for HttpTransport {
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.endpoint(path)?;
        debug!(target: "transport", "GET {}", url);

        let response = self
            .client
            .get(url)
            .basic_auth(self.key.expose(), Some(""))
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .map_err(map_transport_error)?;

        self.finish(response)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.endpoint(path)?;
        debug!(target: "transport", "POST {}", url);

        let response = self
            .client
            .post(url)
            .basic_auth(self.key.expose(), Some(""))
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .map_err(map_transport_error)?;

        self.finish(response)
    }
}

/// Shared handle on an authenticated transport. Two sessions compare equal
/// when they wrap the same transport instance.
#[derive(Clone)]
pub struct Session {
    transport: Arc<dyn Transport>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        self.transport.get(path, query).and_then(check_upstream)
    }

    pub fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.transport.post(path, body).and_then(check_upstream)
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.transport, &other.transport)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

/// Turns an `{"errors": {"message": ...}}` body into [`MercuryError::Upstream`].
pub fn check_upstream(body: Value) -> Result<Value> {
    match body.get("errors") {
        None | Some(Value::Null) => Ok(body),
        Some(errors) => {
            let message = errors
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| errors.to_string());
            Err(MercuryError::Upstream { message })
        }
    }
}

fn decode_body(status: StatusCode, body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return if status.is_success() {
            Ok(Value::Null)
        } else {
            Err(map_status_error(status, body))
        };
    }

    match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            // An error body wins over the status code: it carries the message.
            let value = check_upstream(value)?;
            if status.is_success() {
                Ok(value)
            } else {
                Err(map_status_error(status, body))
            }
        }
        Err(e) if status.is_success() => Err(MercuryError::decode(
            "response",
            format!("invalid JSON: {e}"),
        )),
        Err(_) => Err(map_status_error(status, body)),
    }
}

fn map_transport_error(error: reqwest::Error) -> MercuryError {
    if error.is_timeout() {
        MercuryError::Timeout {
            message: error.to_string(),
        }
    } else {
        MercuryError::Transport {
            message: error.to_string(),
        }
    }
}

fn map_status_error(status: StatusCode, body: &str) -> MercuryError {
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => MercuryError::Timeout {
            message: format!("status {}", status.as_u16()),
        },
        _ => MercuryError::Status {
            status: status.as_u16(),
            body: body_preview(body),
        },
    }
}

fn body_preview(body: &str) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = body.split_whitespace().collect::<Vec<_>>().join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
