//! Build orchestration error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum BuildError {
    #[error("a build is already in progress")]
    Busy,

    #[error("{message}")]
    Precondition { message: String },

    #[error("cannot run {transformer} for {fragment}: upstream stage {upstream} has no successful result")]
    StaleUpstream {
        fragment: String,
        transformer: String,
        upstream: String,
    },

    #[error("transformer {transformer} failed: {message}")]
    Transform { transformer: String, message: String },

    #[error("orchestrator is missing component: {component}")]
    MissingComponent { component: String },
}

impl BuildError {
    /// Shorthand for a precondition violation.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }
}

impl UserFacingError for BuildError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Busy => Some("Wait for the current build to finish, or resume it with `next`."),
            Self::StaleUpstream { .. } => {
                Some("Build the fragment first so every earlier stage has a result.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy)
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Busy => "build.busy",
            Self::Precondition { .. } => "build.precondition",
            Self::StaleUpstream { .. } => "build.stale_upstream",
            Self::Transform { .. } => "build.transform_failed",
            Self::MissingComponent { .. } => "build.missing_component",
        };
        Some(code)
    }
}

/// Failure returned by a transformer's `apply`.
///
/// Captured by the sequencer and stored as the stage result; it never
/// escapes a build call as an `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("{message}")]
pub struct TransformFailure {
    pub message: String,
}

impl TransformFailure {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for TransformFailure {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("invalid payload: {err}"))
    }
}
