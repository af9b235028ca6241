//! Error type shared by the transport, mapping and cache layers.

use thiserror::Error;

pub type Result<T, E = MercuryError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum MercuryError {
    /// The request never produced a response (connection, TLS, body read).
    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// Non-success status whose body carried no `errors.message`.
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// The API answered with an `errors.message` body.
    #[error("Mercury API error: {message}")]
    Upstream { message: String },

    /// A response did not have the shape the mapper expects.
    #[error("malformed {entity} payload: {message}")]
    Decode {
        entity: &'static str,
        message: String,
    },

    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    /// A cache refresh failed. `stale_retained` tells whether the cache
    /// still holds a value from an earlier successful refresh.
    #[error("refreshing {collection} failed (stale value retained: {stale_retained}): {source}")]
    Refresh {
        collection: &'static str,
        stale_retained: bool,
        #[source]
        source: Box<MercuryError>,
    },

    #[error("{kind} '{key}' not found")]
    NotFound { kind: &'static str, key: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("credentials error: {0}")]
    Credentials(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MercuryError {
    pub fn decode(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            entity,
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Unwraps `Refresh` to the error that caused it.
    pub fn root_cause(&self) -> &MercuryError {
        match self {
            Self::Refresh { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
