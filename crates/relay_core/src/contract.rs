use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::Action;

/// Error text read by consumers when a failure response carries no error.
pub const UNKNOWN_ERROR: &str = "unknown error";
pub const TARGET_NOT_FOUND_ERROR: &str = "no active tab found";
pub const NOT_READY_ERROR: &str = "page not ready, refresh the page and try again";
pub const RESTRICTED_SURFACE_ERROR: &str = "cannot run on system pages";
pub const UNREACHABLE_ERROR: &str = "unable to connect, refresh and retry";

/// A request crossing a context boundary. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl Request {
    pub fn new(action: Action) -> Self {
        Self { action, data: None }
    }

    pub fn with_data(action: Action, data: Value) -> Self {
        Self {
            action,
            data: Some(data),
        }
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }
}

/// Structured answer to a request.
///
/// A failure response is a delivered answer, not a transport failure; the
/// absence of any response is modelled by the transport's error type instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            data: None,
        }
    }

    pub fn ok_with_data(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            data: Some(data),
        }
    }

    /// Failure response. An empty error is replaced with [`UNKNOWN_ERROR`].
    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            error
        };
        Self {
            success: false,
            message: None,
            error: Some(error),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Error text as a consumer should read it: `None` on success, and
    /// [`UNKNOWN_ERROR`] for a failure that arrived without one.
    pub fn error_text(&self) -> Option<&str> {
        if self.success {
            return None;
        }
        match self.error.as_deref() {
            Some(text) if !text.trim().is_empty() => Some(text),
            _ => Some(UNKNOWN_ERROR),
        }
    }

    /// Checks the producer side of the contract.
    pub fn validate(&self) -> Result<(), ContractViolation> {
        match (self.success, self.error.as_deref()) {
            (true, Some(_)) => Err(ContractViolation::SuccessWithError),
            (false, None) => Err(ContractViolation::FailureWithoutError),
            (false, Some(text)) if text.trim().is_empty() => {
                Err(ContractViolation::FailureWithoutError)
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("successful response carries an error")]
    SuccessWithError,
    #[error("failed response carries no error")]
    FailureWithoutError,
}

/// Terminal protocol failures decided before or around delivery.
///
/// Application failures are not listed here: they arrive as a [`Response`]
/// from the page and are passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    TargetNotFound,
    NotReady,
    RestrictedSurface,
    /// Every attempt ended without a response.
    Unreachable,
}

impl FailureKind {
    pub fn user_message(self) -> &'static str {
        match self {
            FailureKind::TargetNotFound => TARGET_NOT_FOUND_ERROR,
            FailureKind::NotReady => NOT_READY_ERROR,
            FailureKind::RestrictedSurface => RESTRICTED_SURFACE_ERROR,
            FailureKind::Unreachable => UNREACHABLE_ERROR,
        }
    }

    pub fn to_response(self) -> Response {
        Response::failure(self.user_message())
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::TargetNotFound => write!(f, "target not found"),
            FailureKind::NotReady => write!(f, "target not ready"),
            FailureKind::RestrictedSurface => write!(f, "restricted surface"),
            FailureKind::Unreachable => write!(f, "transport failure"),
        }
    }
}
