//! Error types shared across crates

use thiserror::Error;

/// Authentication error types
///
/// Also the failure side of bearer token validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Missing token")]
    MissingToken,
}
