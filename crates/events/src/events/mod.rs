use serde::{Deserialize, Serialize};

use crate::{EventLevel, EventSource};
use spark_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureContext {
    /// Optional stable error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod build;
pub mod general;
pub mod stores;

pub use build::*;
pub use general::*;
pub use stores::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, debug output)
    General(GeneralEvent),

    /// Build orchestration events
    Build(BuildEvent),

    /// Project store events
    Project(ProjectEvent),

    /// Selection tracker events
    Selection(SelectionEvent),

    /// Transformer registry events
    Registry(RegistryEvent),
}

/// Stable event names used for subscription filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    BuildStarted,
    TransformerStatus,
    BuildError,
    BuildPaused,
    BuildResumed,
    BuildCompleted,
    DebugToggled,
    FragmentOutOfDate,
    FragmentAdded,
    FragmentRemoved,
    SelectionChanged,
    TransformersLoaded,
    Warning,
    Error,
    Debug,
}

impl EventKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuildStarted => "build-started",
            Self::TransformerStatus => "transformer-status",
            Self::BuildError => "build-error",
            Self::BuildPaused => "build-paused",
            Self::BuildResumed => "build-resumed",
            Self::BuildCompleted => "build-completed",
            Self::DebugToggled => "debug-toggled",
            Self::FragmentOutOfDate => "fragment-out-of-date",
            Self::FragmentAdded => "fragment-added",
            Self::FragmentRemoved => "fragment-removed",
            Self::SelectionChanged => "selection-changed",
            Self::TransformersLoaded => "transformers-loaded",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Debug => "debug",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AppEvent {
    /// Stable name of this event
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::General(GeneralEvent::Warning { .. }) => EventKind::Warning,
            Self::General(GeneralEvent::Error { .. }) => EventKind::Error,
            Self::General(GeneralEvent::DebugLog { .. }) => EventKind::Debug,
            Self::Build(event) => match event {
                BuildEvent::Started { .. } => EventKind::BuildStarted,
                BuildEvent::TransformerStatus { .. } => EventKind::TransformerStatus,
                BuildEvent::Error { .. } => EventKind::BuildError,
                BuildEvent::Paused { .. } => EventKind::BuildPaused,
                BuildEvent::Resumed { .. } => EventKind::BuildResumed,
                BuildEvent::Completed { .. } => EventKind::BuildCompleted,
                BuildEvent::DebugToggled { .. } => EventKind::DebugToggled,
            },
            Self::Project(event) => match event {
                ProjectEvent::FragmentOutOfDate { .. } => EventKind::FragmentOutOfDate,
                ProjectEvent::FragmentAdded { .. } => EventKind::FragmentAdded,
                ProjectEvent::FragmentRemoved { .. } => EventKind::FragmentRemoved,
            },
            Self::Selection(SelectionEvent::Changed { .. }) => EventKind::SelectionChanged,
            Self::Registry(RegistryEvent::TransformersLoaded { .. }) => {
                EventKind::TransformersLoaded
            }
        }
    }

    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::General,
            Self::Build(_) => EventSource::Build,
            Self::Project(_) => EventSource::Project,
            Self::Selection(_) => EventSource::Selection,
            Self::Registry(_) => EventSource::Registry,
        }
    }

    /// Determine the severity of this event
    #[must_use]
    pub fn level(&self) -> EventLevel {
        match self {
            Self::General(GeneralEvent::Error { .. }) | Self::Build(BuildEvent::Error { .. }) => {
                EventLevel::Error
            }

            Self::General(GeneralEvent::Warning { .. })
            | Self::Build(BuildEvent::Completed { success: false, .. }) => EventLevel::Warn,

            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Build(BuildEvent::TransformerStatus { .. })
            | Self::Selection(_) => EventLevel::Debug,

            _ => EventLevel::Info,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        self.level().into()
    }
}
