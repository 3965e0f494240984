//! Event handling and progress display

use crate::logging::log_event_with_tracing;
use console::Style;
use spark_events::{AppEvent, BuildEvent, EventMessage, GeneralEvent};
use spark_types::TransformerStatus;

/// Routes bus messages to tracing and, in plain mode, to stderr
pub struct EventHandler {
    colors_enabled: bool,
    /// Suppress human-readable progress (JSON output)
    quiet: bool,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, quiet: bool) -> Self {
        Self {
            colors_enabled,
            quiet,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: &EventMessage) {
        log_event_with_tracing(message);
        if self.quiet {
            return;
        }
        if let Some(line) = self.progress_line(&message.event) {
            eprintln!("{line}");
        }
    }

    fn progress_line(&self, event: &AppEvent) -> Option<String> {
        match event {
            AppEvent::Build(BuildEvent::Started {
                fragment,
                from_index,
                ..
            }) => Some(if *from_index == 0 {
                self.bold(&format!("Building {fragment}"))
            } else {
                self.bold(&format!("Building {fragment} from stage {}", from_index + 1))
            }),
            AppEvent::Build(BuildEvent::TransformerStatus {
                transformer,
                status: TransformerStatus::Succeeded,
                ..
            }) => Some(format!("  {} {transformer}", self.green("ok"))),
            AppEvent::Build(BuildEvent::Error {
                transformer,
                failure,
                ..
            }) => Some(format!(
                "  {} {transformer}: {}",
                self.red("failed"),
                failure.message
            )),
            AppEvent::Build(BuildEvent::Paused { transformer, .. }) => Some(format!(
                "  {} after {transformer}",
                self.yellow("paused")
            )),
            AppEvent::Build(BuildEvent::DebugToggled { enabled }) => Some(format!(
                "debug mode {}",
                if *enabled { "on" } else { "off" }
            )),
            AppEvent::General(GeneralEvent::Warning { message, context }) => {
                Some(match context {
                    Some(context) => format!("{} {message} ({context})", self.yellow("warning:")),
                    None => format!("{} {message}", self.yellow("warning:")),
                })
            }
            _ => None,
        }
    }

    fn paint(&self, style: &Style, text: &str) -> String {
        if self.colors_enabled {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(&Style::new().bold(), text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(&Style::new().green(), text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(&Style::new().red().bold(), text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(&Style::new().yellow(), text)
    }
}
