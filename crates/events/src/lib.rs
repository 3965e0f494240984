#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in spark
//!
//! Every observable change in the orchestrator (build progress, debug
//! pauses, project and selection edits, registry reloads) is published as
//! an [`AppEvent`] wrapped in an [`EventMessage`]. The CLI subscribes and
//! routes every message to tracing under its domain's log target.
//!
//! ## Architecture
//!
//! - **Domain-driven events**: Events grouped by functional domain (Build, Project, ...)
//! - **Unified `EventEmitter` trait**: Single, consistent API for all event emissions
//! - **Fan-out bus**: [`EventBus`] delivers each event to every matching subscriber

pub mod meta;
pub use meta::{EventLevel, EventMeta, EventSource};

pub mod bus;
pub use bus::{EventBus, Subscription};

pub mod events;
pub use events::{
    AppEvent, BuildEvent, BuildScope, EventKind, FailureContext, GeneralEvent, ProjectEvent,
    RegistryEvent, SelectionEvent,
};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// Event payload paired with its emission metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub meta: EventMeta,
    pub event: AppEvent,
}

impl EventMessage {
    #[must_use]
    pub fn new(meta: EventMeta, event: AppEvent) -> Self {
        Self { meta, event }
    }

    /// Wrap an event with freshly generated metadata
    #[must_use]
    pub fn from_event(event: AppEvent) -> Self {
        let meta = EventMeta::new(event.level(), event.event_source());
        Self { meta, event }
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

/// Type alias for event sender carrying `EventMessage` values
pub type EventSender = UnboundedSender<EventMessage>;

/// Type alias for event receiver carrying `EventMessage` values
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<EventMessage>;

/// Create a new point-to-point event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout spark
///
/// Implementors either expose a raw `EventSender` or override
/// [`EventEmitter::emit_with_meta`] to route messages themselves (the bus
/// does the latter to fan out).
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event with caller-supplied metadata
    fn emit_with_meta(&self, meta: EventMeta, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Receiver gone means nobody is listening
            let _ = sender.send(EventMessage::new(meta, event));
        }
    }

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        let meta = EventMeta::new(event.level(), event.event_source());
        self.emit_with_meta(meta, event);
    }

    /// Emit an event correlated with a build session
    fn emit_correlated(&self, correlation_id: impl Into<String>, event: AppEvent) {
        let meta =
            EventMeta::new(event.level(), event.event_source()).with_correlation_id(correlation_id);
        self.emit_with_meta(meta, event);
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    /// Emit a debug log event with context
    fn emit_debug_with_context(
        &self,
        message: impl Into<String>,
        context: std::collections::HashMap<String, String>,
    ) {
        self.emit(AppEvent::General(GeneralEvent::debug_with_context(
            message, context,
        )));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    /// Emit a warning event with context
    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    /// Emit an error event
    fn emit_error(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error(message)));
    }

    /// Emit an error event with details
    fn emit_error_with_details(&self, message: impl Into<String>, details: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error_with_details(
            message, details,
        )));
    }

    /// Emit a build event tagged with its session id
    fn emit_build(&self, event: BuildEvent) {
        match event.session_id() {
            Some(session_id) => self.emit_correlated(session_id.to_string(), AppEvent::Build(event)),
            None => self.emit(AppEvent::Build(event)),
        }
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
/// This allows `EventSender` to be used directly where `EventEmitter` is expected
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}
