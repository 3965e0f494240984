//! Project, fragment and transformer lookup errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ProjectError {
    #[error("fragment not found: {id}")]
    UnknownFragment { id: String },

    #[error("fragment already exists: {id}")]
    DuplicateFragment { id: String },

    #[error("transformer not found: {name}")]
    UnknownTransformer { name: String },

    #[error("transformer registered twice: {name}")]
    DuplicateTransformer { name: String },

    #[error("invalid project manifest {path}: {message}")]
    InvalidManifest { path: String, message: String },
}

impl UserFacingError for ProjectError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnknownTransformer { .. } => {
                Some("Run `spark pipeline` to list the transformers in the chain.")
            }
            Self::InvalidManifest { .. } => Some("Fix the project manifest and retry."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::UnknownFragment { .. } => "project.unknown_fragment",
            Self::DuplicateFragment { .. } => "project.duplicate_fragment",
            Self::UnknownTransformer { .. } => "project.unknown_transformer",
            Self::DuplicateTransformer { .. } => "project.duplicate_transformer",
            Self::InvalidManifest { .. } => "project.invalid_manifest",
        };
        Some(code)
    }
}
