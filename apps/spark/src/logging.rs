//! Structured logging integration for events
//!
//! Converts bus messages into tracing records with structured fields. Each
//! domain logs under its own target (`spark::events::<domain>`) at the
//! level carried in the message metadata.

use spark_events::{
    AppEvent, BuildEvent, EventMessage, GeneralEvent, ProjectEvent, RegistryEvent,
    SelectionEvent,
};
use tracing::Level;

/// Emit at a level chosen at runtime under a fixed target
macro_rules! log_at {
    ($level:expr, $target:literal, $($rest:tt)+) => {
        match $level {
            Level::ERROR => tracing::error!(target: $target, $($rest)+),
            Level::WARN => tracing::warn!(target: $target, $($rest)+),
            Level::INFO => tracing::info!(target: $target, $($rest)+),
            Level::DEBUG => tracing::debug!(target: $target, $($rest)+),
            Level::TRACE => tracing::trace!(target: $target, $($rest)+),
        }
    };
}

/// Log an event message using the tracing infrastructure
pub fn log_event_with_tracing(message: &EventMessage) {
    let meta = &message.meta;
    let level = meta.tracing_level();
    let source = meta.source.as_str();
    let correlation = meta.correlation_id.as_deref();

    match &message.event {
        AppEvent::Build(event) => match event {
            BuildEvent::Started {
                fragment,
                from_index,
                scope,
                ..
            } => {
                log_at!(level, "spark::events::build",
                    source, event_id = %meta.event_id, correlation = ?correlation,
                    fragment = %fragment, from_index, scope = ?scope,
                    "build started");
            }
            BuildEvent::TransformerStatus {
                fragment,
                transformer,
                index,
                status,
                ..
            } => {
                log_at!(level, "spark::events::build",
                    source, event_id = %meta.event_id, correlation = ?correlation,
                    fragment = %fragment, transformer = %transformer, index, status = %status,
                    "transformer status");
            }
            BuildEvent::Error {
                fragment,
                transformer,
                failure,
                ..
            } => {
                log_at!(level, "spark::events::build",
                    source, event_id = %meta.event_id, correlation = ?correlation,
                    fragment = %fragment, transformer = %transformer,
                    code = ?failure.code, message = %failure.message, hint = ?failure.hint,
                    retryable = failure.retryable,
                    "stage failed");
            }
            BuildEvent::Paused {
                fragment,
                transformer,
                index,
                ..
            } => {
                log_at!(level, "spark::events::build",
                    source, event_id = %meta.event_id, correlation = ?correlation,
                    fragment = %fragment, transformer = %transformer, index,
                    "build paused");
            }
            BuildEvent::Resumed {
                fragment, index, ..
            } => {
                log_at!(level, "spark::events::build",
                    source, event_id = %meta.event_id, correlation = ?correlation,
                    fragment = %fragment, index,
                    "build resumed");
            }
            BuildEvent::Completed {
                fragment,
                success,
                stages_run,
                ..
            } => {
                log_at!(level, "spark::events::build",
                    source, event_id = %meta.event_id, correlation = ?correlation,
                    fragment = %fragment, success, stages_run,
                    "build completed");
            }
            BuildEvent::DebugToggled { enabled } => {
                log_at!(level, "spark::events::build",
                    source, event_id = %meta.event_id, enabled,
                    "debug mode toggled");
            }
        },

        AppEvent::Project(event) => {
            let (fragment, action) = match event {
                ProjectEvent::FragmentOutOfDate { fragment } => (fragment, "out of date"),
                ProjectEvent::FragmentAdded { fragment } => (fragment, "added"),
                ProjectEvent::FragmentRemoved { fragment } => (fragment, "removed"),
            };
            log_at!(level, "spark::events::project",
                source, event_id = %meta.event_id, fragment = %fragment, action,
                "fragment changed");
        }

        AppEvent::Selection(SelectionEvent::Changed { selection }) => {
            log_at!(level, "spark::events::selection",
                source, event_id = %meta.event_id,
                fragment = ?selection.active_fragment, transformer = ?selection.active_transformer,
                "selection changed");
        }

        AppEvent::Registry(RegistryEvent::TransformersLoaded { transformers }) => {
            log_at!(level, "spark::events::registry",
                source, event_id = %meta.event_id, count = transformers.len(),
                transformers = ?transformers,
                "transformers loaded");
        }

        AppEvent::General(event) => match event {
            GeneralEvent::Warning { message, context } => {
                log_at!(level, "spark::events::general",
                    source, event_id = %meta.event_id, correlation = ?correlation,
                    message = %message, context = ?context,
                    "warning");
            }
            GeneralEvent::Error { message, details } => {
                log_at!(level, "spark::events::general",
                    source, event_id = %meta.event_id, correlation = ?correlation,
                    message = %message, details = ?details,
                    "error");
            }
            GeneralEvent::DebugLog { message, context } => {
                log_at!(level, "spark::events::general",
                    source, event_id = %meta.event_id, correlation = ?correlation,
                    message = %message, context = ?context,
                    "debug log");
            }
        },
    }
}
