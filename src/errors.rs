use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::models::ClientRecord;
use crate::registry::RegistryError;

/// Errors raised while handling a single chat command.
///
/// Every variant is turned into exactly one user-facing reply by the dispatcher;
/// none of them ever reaches the transport as a failure.
#[derive(Debug, Clone)]
pub enum CommandError {
    /// Fewer arguments than the command needs.
    MissingArguments,
    /// The client command could not be split into enough segments.
    InvalidFormat,
    /// A required field was not present after classification.
    MissingField(&'static str),
    /// No positive amount was found in a payment command.
    AmountNotFound,
    /// Nothing in the roster matched the identifier.
    NotFound(String),
    /// More than one record matched; carries the capped candidates and the full count.
    Ambiguous {
        candidates: Vec<ClientRecord>,
        total: usize,
    },
    /// The registry could not be reached.
    Transport(String),
    /// The registry answered with an empty roster.
    EmptyRegistry,
    /// The registry answered without a recognizable success indicator.
    Protocol(String),
    /// The registry refused the operation; the message is shown verbatim.
    RegistryRejected(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::MissingArguments => write!(f, "Missing arguments"),
            CommandError::InvalidFormat => write!(f, "Invalid format"),
            CommandError::MissingField(field) => write!(f, "Missing field: {}", field),
            CommandError::AmountNotFound => write!(f, "Amount not found"),
            CommandError::NotFound(identifier) => write!(f, "Not found: {}", identifier),
            CommandError::Ambiguous { total, .. } => {
                write!(f, "Ambiguous identifier: {} candidates", total)
            }
            CommandError::Transport(msg) => write!(f, "Registry unreachable: {}", msg),
            CommandError::EmptyRegistry => write!(f, "Registry has no clients"),
            CommandError::Protocol(msg) => write!(f, "Registry protocol error: {}", msg),
            CommandError::RegistryRejected(msg) => write!(f, "Registry rejected: {}", msg),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<RegistryError> for CommandError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Transport(msg) => CommandError::Transport(msg),
            RegistryError::Protocol(msg) => CommandError::Protocol(msg),
            RegistryError::Rejected(msg) => CommandError::RegistryRejected(msg),
        }
    }
}

/// Errors surfaced by the HTTP layer (webhook ingress).
#[derive(Debug, Clone)]
pub enum AppError {
    /// Unauthorized access error.
    Unauthorized(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
        }
    }
}

impl IntoResponse for AppError {
    /// Maps each variant to a status code and a JSON body, logging by severity.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized access: {}", msg);
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
