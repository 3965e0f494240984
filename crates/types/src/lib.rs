#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for spark
//!
//! This crate provides the plain data model shared by the orchestrator, the
//! event system and the CLI: identifiers, transformer statuses, stage
//! results, the build state snapshot and reports.

pub mod fragment;
pub mod reports;
pub mod result;
pub mod state;
pub mod transformer;
pub mod view;

// Re-export commonly used types
pub use fragment::{Fragment, FragmentId, Payload};
pub use reports::{BuildReport, FragmentOutcome};
pub use result::{StageOutcome, StageResult};
pub use state::{BuildState, SequencePhase};
pub use transformer::{TransformerInfo, TransformerName, TransformerStatus};
pub use uuid::Uuid;
pub use view::{ControlState, Selection, StageView};

use serde::{Deserialize, Serialize};

/// Output format for CLI reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Plain
    }
}

impl clap::ValueEnum for OutputFormat {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Plain, Self::Json]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Plain => clap::builder::PossibleValue::new("plain"),
            Self::Json => clap::builder::PossibleValue::new("json"),
        })
    }
}
