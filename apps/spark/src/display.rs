//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::Style;
use serde::Serialize;
use spark_types::{
    BuildReport, Fragment, FragmentId, FragmentOutcome, OutputFormat, Payload, TransformerInfo,
    TransformerStatus,
};
use std::io;

/// Longest payload preview shown in a table cell
const PREVIEW_CHARS: usize = 48;

/// Result of a CLI command, ready to render
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CommandOutput {
    Build(BuildSummary),
    Pipeline(Vec<TransformerInfo>),
    Fragments(Vec<Fragment>),
}

/// Build report plus the final output of every fragment it touched
#[derive(Debug, Serialize)]
pub struct BuildSummary {
    pub report: BuildReport,
    pub outputs: Vec<FragmentOutput>,
}

#[derive(Debug, Serialize)]
pub struct FragmentOutput {
    pub fragment: FragmentId,
    /// Payload of the last stage, when it succeeded
    pub output: Option<Payload>,
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    format: OutputFormat,
    colors_enabled: bool,
}

impl OutputRenderer {
    pub fn new(format: OutputFormat, colors_enabled: bool) -> Self {
        Self {
            format,
            colors_enabled,
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Render command output
    pub fn render_result(&self, output: &CommandOutput) -> io::Result<()> {
        if self.is_json() {
            let json = serde_json::to_string_pretty(output).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }
        match output {
            CommandOutput::Build(summary) => self.render_build_summary(summary),
            CommandOutput::Pipeline(transformers) => self.render_pipeline(transformers),
            CommandOutput::Fragments(fragments) => self.render_fragments(fragments),
        }
        Ok(())
    }

    fn render_build_summary(&self, summary: &BuildSummary) {
        let report = &summary.report;
        if report.fragments.is_empty() {
            println!("Everything is up to date.");
            return;
        }

        let mut table = self.table(&["Fragment", "Result", "Detail", "Output"]);
        for (id, outcome) in &report.fragments {
            let output = summary
                .outputs
                .iter()
                .find(|o| &o.fragment == id)
                .and_then(|o| o.output.as_ref())
                .map_or_else(|| "-".to_string(), preview);
            let (result, detail) = match outcome {
                FragmentOutcome::Succeeded => {
                    (self.colored("succeeded", Color::Green), String::new())
                }
                FragmentOutcome::Failed {
                    transformer,
                    message,
                } => (
                    self.colored("failed", Color::Red),
                    format!("{transformer}: {message}"),
                ),
                FragmentOutcome::Paused { next_index } => (
                    self.colored("paused", Color::Yellow),
                    format!("resumes at stage {}", next_index + 1),
                ),
            };
            table.add_row(vec![Cell::new(id), result, Cell::new(detail), Cell::new(output)]);
        }
        println!("{table}");

        let succeeded = report.succeeded().len();
        let failed = report.failed().len();
        let line = format!(
            "{succeeded} succeeded, {failed} failed, {} stage(s) in {} ms",
            report.stages_run, report.duration_ms
        );
        if self.colors_enabled {
            let style = if failed == 0 {
                Style::new().green()
            } else {
                Style::new().red()
            };
            println!("{}", style.apply_to(line));
        } else {
            println!("{line}");
        }
    }

    fn render_pipeline(&self, transformers: &[TransformerInfo]) {
        if transformers.is_empty() {
            println!("No transformers loaded.");
            return;
        }
        let mut table = self.table(&["#", "Transformer", "Status"]);
        for info in transformers {
            table.add_row(vec![
                Cell::new(info.index + 1),
                Cell::new(&info.name),
                self.status_cell(info.status),
            ]);
        }
        println!("{table}");
    }

    fn render_fragments(&self, fragments: &[Fragment]) {
        if fragments.is_empty() {
            println!("No fragments in project.");
            return;
        }
        let mut table = self.table(&["Fragment", "State", "Content"]);
        for fragment in fragments {
            let state = if fragment.out_of_date {
                self.colored("out of date", Color::Yellow)
            } else {
                self.colored("up to date", Color::Green)
            };
            table.add_row(vec![
                Cell::new(&fragment.id),
                state,
                Cell::new(preview(&fragment.content)),
            ]);
        }
        println!("{table}");
    }

    fn table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
        table
    }

    fn status_cell(&self, status: TransformerStatus) -> Cell {
        let color = match status {
            TransformerStatus::Idle => return Cell::new(status),
            TransformerStatus::Running => Color::Cyan,
            TransformerStatus::Succeeded => Color::Green,
            TransformerStatus::Failed => Color::Red,
        };
        self.colored(status.as_str(), color)
    }

    fn colored(&self, text: &str, color: Color) -> Cell {
        let cell = Cell::new(text);
        if self.colors_enabled {
            cell.fg(color)
        } else {
            cell
        }
    }
}

/// Single-line, shortened rendering of a payload
fn preview(payload: &Payload) -> String {
    let text = match payload {
        Payload::String(text) => text.clone(),
        other => other.to_string(),
    };
    let text = text.replace('\n', "\\n");
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        text
    }
}
