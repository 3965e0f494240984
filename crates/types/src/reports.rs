//! Report type definitions for build operations

use crate::{FragmentId, TransformerName};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a single fragment's chain ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FragmentOutcome {
    /// Every stage succeeded and the fragment is up to date
    Succeeded,
    /// The chain halted at `transformer`
    Failed {
        transformer: TransformerName,
        message: String,
    },
    /// Suspended in debug mode; `next_index` runs on resume
    Paused { next_index: usize },
}

/// Build report returned by build operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Session id shared by every event of this build
    pub session_id: Uuid,
    /// Fragments processed so far, in processing order
    pub fragments: Vec<(FragmentId, FragmentOutcome)>,
    /// Total stage executions
    pub stages_run: usize,
    /// Duration of the part of the build covered by this report
    pub duration_ms: u64,
}

impl BuildReport {
    #[must_use]
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            fragments: Vec::new(),
            stages_run: 0,
            duration_ms: 0,
        }
    }

    /// Whether the build is suspended waiting for `run_next`
    #[must_use]
    pub fn is_paused(&self) -> bool {
        matches!(
            self.fragments.last(),
            Some((_, FragmentOutcome::Paused { .. }))
        )
    }

    #[must_use]
    pub fn succeeded(&self) -> Vec<&FragmentId> {
        self.fragments
            .iter()
            .filter(|(_, outcome)| *outcome == FragmentOutcome::Succeeded)
            .map(|(id, _)| id)
            .collect()
    }

    #[must_use]
    pub fn failed(&self) -> Vec<&FragmentId> {
        self.fragments
            .iter()
            .filter(|(_, outcome)| matches!(outcome, FragmentOutcome::Failed { .. }))
            .map(|(id, _)| id)
            .collect()
    }

    /// Outcome recorded for a fragment, latest first
    #[must_use]
    pub fn outcome(&self, fragment: &FragmentId) -> Option<&FragmentOutcome> {
        self.fragments
            .iter()
            .rev()
            .find(|(id, _)| id == fragment)
            .map(|(_, outcome)| outcome)
    }

    /// Forget every outcome recorded for a fragment
    pub fn discard(&mut self, fragment: &FragmentId) {
        self.fragments.retain(|(id, _)| id != fragment);
    }

    /// Record an outcome, replacing a previous `Paused` entry for the same fragment
    pub fn record(&mut self, fragment: FragmentId, outcome: FragmentOutcome) {
        if let Some((last, FragmentOutcome::Paused { .. })) = self.fragments.last() {
            if *last == fragment {
                self.fragments.pop();
            }
        }
        self.fragments.push((fragment, outcome));
    }
}
