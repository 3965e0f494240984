#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Build orchestration for spark
//!
//! Runs a project's fragments through an ordered chain of transformers.
//! Supports full builds of every out-of-date fragment, single-fragment
//! builds, single-stage runs and a step-through debug mode that suspends
//! the chain after each successful stage until [`Orchestrator::run_next`].
//!
//! All observable changes are published on the [`spark_events::EventBus`]
//! handed to the [`OrchestratorBuilder`].

pub mod builtins;
pub mod manifest;
mod orchestrator;
pub mod project;
pub mod registry;
pub mod reporter;
pub mod results;
pub mod selection;
mod sequencer;
pub mod state;
pub mod transform;

pub use builtins::{builtin, BUILTIN_NAMES};
pub use manifest::ProjectManifest;
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use project::ProjectStore;
pub use registry::TransformerRegistry;
pub use reporter::{CollectingReporter, ErrorReporter, TracingReporter};
pub use results::ResultStore;
pub use selection::SelectionTracker;
pub use state::{shared_state, SharedBuildState};
pub use transform::{from_fn, NamedTransform, Transform};
