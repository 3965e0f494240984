//! Shared build state handle

use spark_types::{BuildState, SequencePhase};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Handle to the one `BuildState` an orchestrator mutates
pub type SharedBuildState = Arc<RwLock<BuildState>>;

#[must_use]
pub fn shared_state(debug_enabled: bool) -> SharedBuildState {
    Arc::new(RwLock::new(BuildState::new(debug_enabled)))
}

/// Move the sequence to `next`, logging transitions the state machine forbids
pub(crate) fn advance(state: &mut BuildState, next: SequencePhase) {
    if !state.phase.can_transition_to(next) {
        tracing::warn!(from = %state.phase, to = %next, "unexpected sequence phase transition");
    }
    state.phase = next;
}

/// Return the lock and clear per-sequence fields
pub(crate) fn release(state: &mut BuildState) {
    if state.phase != SequencePhase::Idle {
        advance(state, SequencePhase::Idle);
    }
    state.is_building = false;
    state.paused = false;
    state.current_fragment = None;
    state.current_transformer_index = None;
    state.queued.clear();
}
