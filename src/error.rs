//! Failure taxonomy and its mapping onto HTTP responses.
//!
//! Every pipeline stage returns [`Error`]; the `IntoResponse` impl at the
//! bottom of this file is the one place where a failure kind becomes a status
//! code and a JSON body. Infrastructure failures that never reach a client
//! (binding a port, accepting a connection) use [`ServeError`] instead.

use std::time::Duration;

use http::StatusCode;
use http::header::{ALLOW, WWW_AUTHENTICATE};
use serde::Serialize;

use crate::method::Method;
use crate::response::{IntoResponse, Response};

/// A request that could not be served successfully.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The body of a POST/PUT/PATCH is not valid JSON.
    #[error("malformed request body: {0}")]
    Decode(String),

    /// The body decoded but does not have the shape or values the handler needs.
    #[error("{0}")]
    Validation(String),

    #[error("no route for {method} {path}")]
    RouteNotFound { method: String, path: String },

    #[error("method {method} is not allowed for {path}")]
    MethodNotAllowed { method: String, path: String, allowed: Vec<Method> },

    #[error("missing bearer credential")]
    AuthenticationMissing,

    #[error("authentication failed: {0}")]
    AuthenticationInvalid(&'static str),

    /// A collaborator reported that the addressed entity does not exist.
    #[error("{0} not found")]
    ResourceNotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("server is at capacity")]
    Overloaded,

    #[error("request did not complete within {0:?}")]
    Timeout(Duration),

    /// Anything else. The detail is logged, never sent to the client.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::ResourceNotFound(what.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Decode(_) | Self::Validation(_)                     => StatusCode::BAD_REQUEST,
            Self::RouteNotFound { .. } | Self::ResourceNotFound(_)    => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. }                             => StatusCode::METHOD_NOT_ALLOWED,
            Self::AuthenticationMissing | Self::AuthenticationInvalid(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_)                                         => StatusCode::CONFLICT,
            Self::PayloadTooLarge { .. }                              => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Overloaded | Self::Timeout(_)                       => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_)                                         => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable kind placed in the `error` field of the body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_)                => "decode_error",
            Self::Validation(_)            => "validation_error",
            Self::RouteNotFound { .. }     => "not_found",
            Self::ResourceNotFound(_)      => "not_found",
            Self::MethodNotAllowed { .. }  => "method_not_allowed",
            Self::AuthenticationMissing    => "unauthenticated",
            Self::AuthenticationInvalid(_) => "unauthenticated",
            Self::Conflict(_)              => "conflict",
            Self::PayloadTooLarge { .. }   => "payload_too_large",
            Self::Overloaded               => "unavailable",
            Self::Timeout(_)               => "unavailable",
            Self::Internal(_)              => "internal_error",
        }
    }

    /// Whether this failure is the server's fault rather than the client's.
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Internal(_) => "internal server error".to_owned(),
            other => other.to_string(),
        };
        let body = ErrorBody { error: self.kind(), message };
        // Serializing two strings cannot fail.
        let bytes = serde_json::to_vec(&body).unwrap_or_default();

        let mut builder = Response::builder().status(self.status());
        match &self {
            Self::MethodNotAllowed { allowed, .. } => {
                let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
                builder = builder.header(ALLOW, &allow);
            }
            Self::AuthenticationMissing | Self::AuthenticationInvalid(_) => {
                builder = builder.header(WWW_AUTHENTICATE, "Bearer");
            }
            _ => {}
        }
        builder.json(bytes)
    }
}

/// Infrastructure failure while running the server.
///
/// Application-level failures are expressed as [`Error`] and always end as a
/// response. This type surfaces the ones that stop the process: binding to a
/// port or loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}
