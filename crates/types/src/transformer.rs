//! Transformer identity and status

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique name of a transformer in the chain
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformerName(String);

impl TransformerName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransformerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransformerName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TransformerName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Execution status of a transformer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformerStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl TransformerStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransformerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of a registered transformer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformerInfo {
    pub name: TransformerName,
    /// Position in the chain, starting at 0
    pub index: usize,
    pub status: TransformerStatus,
}
