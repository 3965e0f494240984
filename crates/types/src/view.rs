//! Read-only snapshots consumed by presentation code

use crate::{FragmentId, StageResult, TransformerName, TransformerStatus};
use serde::{Deserialize, Serialize};

/// Active fragment and transformer chosen by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub active_fragment: Option<FragmentId>,
    pub active_transformer: Option<TransformerName>,
}

/// Which build controls are currently usable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    pub build_all: bool,
    pub build_fragment: bool,
    pub run_transformer: bool,
    pub toggle_debug: bool,
    pub debug_active: bool,
    pub run_next: bool,
}

/// One transformer's result tab for a fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageView {
    pub transformer: TransformerName,
    pub index: usize,
    pub status: TransformerStatus,
    pub result: Option<StageResult>,
}
