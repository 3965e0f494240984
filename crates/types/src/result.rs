//! Stage result definitions

use crate::{FragmentId, Payload, TransformerName, TransformerStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a single stage produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    Success { payload: Payload },
    Failure { message: String },
}

/// Output of one transformer for one fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub fragment: FragmentId,
    pub transformer: TransformerName,
    pub outcome: StageOutcome,
    pub produced_at: DateTime<Utc>,
}

impl StageResult {
    #[must_use]
    pub fn success(fragment: FragmentId, transformer: TransformerName, payload: Payload) -> Self {
        Self {
            fragment,
            transformer,
            outcome: StageOutcome::Success { payload },
            produced_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn failure(
        fragment: FragmentId,
        transformer: TransformerName,
        message: impl Into<String>,
    ) -> Self {
        Self {
            fragment,
            transformer,
            outcome: StageOutcome::Failure {
                message: message.into(),
            },
            produced_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, StageOutcome::Success { .. })
    }

    /// Payload of a successful stage
    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        match &self.outcome {
            StageOutcome::Success { payload } => Some(payload),
            StageOutcome::Failure { .. } => None,
        }
    }

    /// Status this result renders as
    #[must_use]
    pub fn status(&self) -> TransformerStatus {
        if self.is_success() {
            TransformerStatus::Succeeded
        } else {
            TransformerStatus::Failed
        }
    }
}
