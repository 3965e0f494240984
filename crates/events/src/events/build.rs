use serde::{Deserialize, Serialize};
use spark_types::{FragmentId, TransformerName, TransformerStatus};
use uuid::Uuid;

use super::FailureContext;

/// Which operation opened a build session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildScope {
    /// Every out-of-date fragment
    All,
    /// A single fragment, full chain
    Fragment,
    /// A single stage of a single fragment
    Transformer,
}

/// Build orchestration events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BuildEvent {
    /// A fragment's chain (or single stage) started
    Started {
        session_id: Uuid,
        fragment: FragmentId,
        from_index: usize,
        scope: BuildScope,
    },

    /// A transformer changed status while processing a fragment
    TransformerStatus {
        session_id: Uuid,
        fragment: FragmentId,
        transformer: TransformerName,
        index: usize,
        status: TransformerStatus,
    },

    /// A stage failed; the fragment's chain halts
    Error {
        session_id: Uuid,
        fragment: FragmentId,
        transformer: TransformerName,
        failure: FailureContext,
    },

    /// Debug mode suspended the chain after `index` succeeded
    Paused {
        session_id: Uuid,
        fragment: FragmentId,
        transformer: TransformerName,
        index: usize,
    },

    /// A paused chain was resumed at `index`
    Resumed {
        session_id: Uuid,
        fragment: FragmentId,
        index: usize,
    },

    /// A fragment's chain (or single stage) finished
    Completed {
        session_id: Uuid,
        fragment: FragmentId,
        success: bool,
        stages_run: usize,
    },

    /// Debug mode was switched on or off
    DebugToggled { enabled: bool },
}

impl BuildEvent {
    /// Session the event belongs to, if any
    #[must_use]
    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            Self::Started { session_id, .. }
            | Self::TransformerStatus { session_id, .. }
            | Self::Error { session_id, .. }
            | Self::Paused { session_id, .. }
            | Self::Resumed { session_id, .. }
            | Self::Completed { session_id, .. } => Some(*session_id),
            Self::DebugToggled { .. } => None,
        }
    }
}
