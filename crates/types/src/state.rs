//! Build state and sequence phase tracking

use crate::FragmentId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the build sequence currently holding the build lock.
///
/// `Idle -> Running(i) -> {Running(i+1) | Paused(i) | Failed(i) | Completed}`.
/// `Failed` and `Completed` return to `Idle`, or to `Running(0)` when a
/// multi-fragment build moves on to its next fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SequencePhase {
    #[default]
    Idle,
    Running {
        stage: usize,
    },
    Paused {
        stage: usize,
    },
    Failed {
        stage: usize,
    },
    Completed,
}

impl SequencePhase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running { .. } => "running",
            Self::Paused { .. } => "paused",
            Self::Failed { .. } => "failed",
            Self::Completed => "completed",
        }
    }

    /// Check whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(&self, next: SequencePhase) -> bool {
        match (*self, next) {
            (Self::Idle | Self::Failed { .. } | Self::Completed, Self::Running { .. })
            | (Self::Failed { .. } | Self::Completed, Self::Idle) => true,
            (Self::Running { stage }, Self::Running { stage: next })
            | (Self::Paused { stage }, Self::Running { stage: next }) => next == stage + 1,
            (Self::Running { stage }, Self::Paused { stage: at } | Self::Failed { stage: at }) => {
                at == stage
            }
            (Self::Running { .. }, Self::Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SequencePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { stage } | Self::Paused { stage } | Self::Failed { stage } => {
                write!(f, "{}({stage})", self.as_str())
            }
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Snapshot of the orchestrator's build state.
///
/// `is_building` is the single build lock: while it is set, no other build
/// sequence may start. A paused sequence keeps the lock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildState {
    pub is_building: bool,
    pub debug_enabled: bool,
    pub paused: bool,
    pub current_fragment: Option<FragmentId>,
    pub current_transformer_index: Option<usize>,
    pub phase: SequencePhase,
    /// Fragments still waiting in a multi-fragment build
    pub queued: Vec<FragmentId>,
}

impl BuildState {
    #[must_use]
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            ..Self::default()
        }
    }

    /// Whether a sequence is suspended at a stage boundary
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.is_building && self.paused
    }

    /// Whether a sequence is actively executing stage logic
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.is_building && !self.paused
    }
}
