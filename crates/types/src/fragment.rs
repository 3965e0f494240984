//! Fragment type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque data flowing between pipeline stages.
pub type Payload = serde_json::Value;

/// Unique identifier of a fragment within a project
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(String);

impl FragmentId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FragmentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FragmentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A unit of project content that can be built independently
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Fragment identity
    pub id: FragmentId,
    /// Raw content fed into the first stage of the chain
    pub content: Payload,
    /// Whether stored results no longer reflect the content
    pub out_of_date: bool,
}

impl Fragment {
    /// Create a fragment that has never been built
    #[must_use]
    pub fn new(id: impl Into<FragmentId>, content: impl Into<Payload>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            out_of_date: true,
        }
    }
}
