//! Unified error model for the session core.
//! One enum covers credential decoding, remote auth calls, dispatch and storage so
//! callers (the orchestrator, interceptors, the CLI) can branch on a stable code.

use thiserror::Error;

/// Message shown to the user for any rejected login, whatever the backend said.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Credential is not a three-part signed token or its payload does not parse.
    #[error("credential could not be decoded: {0}")]
    CredentialDecode(String),
    #[error("credential has expired")]
    CredentialExpired,
    /// Login endpoint rejected the request. Display is deliberately generic.
    #[error("Invalid credentials")]
    RemoteAuthFailure,
    #[error("remote logout failed: {0}")]
    RemoteLogoutFailure(String),
    /// A dispatched request came back 401.
    #[error("request was not authorized")]
    Unauthorized,
    #[error("remote returned HTTP {status}")]
    Http { status: u16 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl AuthError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AuthError::CredentialDecode(_) => "credential_decode",
            AuthError::CredentialExpired => "credential_expired",
            AuthError::RemoteAuthFailure => "invalid_credentials",
            AuthError::RemoteLogoutFailure(_) => "logout_failed",
            AuthError::Unauthorized => "unauthorized",
            AuthError::Http { .. } => "http_error",
            AuthError::Transport(_) => "transport_error",
            AuthError::Storage(_) => "storage_error",
            AuthError::Config(_) => "config_error",
        }
    }

    /// True for the failures that mean "the session cannot be trusted any more".
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            AuthError::CredentialDecode(_) | AuthError::CredentialExpired | AuthError::Unauthorized
        )
    }

    /// Text safe to put in front of a user. Remote detail never leaks through here.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::RemoteAuthFailure => INVALID_CREDENTIALS,
            AuthError::Unauthorized | AuthError::CredentialExpired | AuthError::CredentialDecode(_) => {
                "Your session has ended, please sign in again"
            }
            AuthError::Transport(_) | AuthError::Http { .. } => "The server could not be reached",
            _ => "Something went wrong",
        }
    }

    pub fn storage<E: std::fmt::Display>(err: E) -> Self { AuthError::Storage(err.to_string()) }
    pub fn decode<E: std::fmt::Display>(err: E) -> Self { AuthError::CredentialDecode(err.to_string()) }
    pub fn transport<E: std::fmt::Display>(err: E) -> Self { AuthError::Transport(err.to_string()) }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(s) if s == reqwest::StatusCode::UNAUTHORIZED => AuthError::Unauthorized,
            Some(s) => AuthError::Http { status: s.as_u16() },
            None => AuthError::Transport(err.to_string()),
        }
    }
}

impl From<std::io::Error> for AuthError {
    fn from(err: std::io::Error) -> Self { AuthError::Storage(err.to_string()) }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
