//! spark - Build orchestrator for fragment transformation pipelines
//!
//! Loads the project manifest into an orchestrator, runs the requested
//! command and renders the result while routing bus events to tracing.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands, GlobalArgs};
use crate::display::{BuildSummary, CommandOutput, FragmentOutput, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use spark_config::Config;
use spark_events::{EventBus, Subscription};
use spark_orchestrator::{Orchestrator, OrchestratorBuilder, ProjectManifest};
use spark_types::{FragmentId, OutputFormat};
use std::process;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.json, cli.global.debug_log);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting spark v{}", env!("CARGO_PKG_VERSION"));

    // Precedence: defaults < file < environment < CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global, &cli.command);

    let bus = EventBus::new();
    let subscription = bus.subscribe();
    let orchestrator = OrchestratorBuilder::standalone(&bus, config.build.debug).build()?;

    let project_path = config.project_path();
    let manifest = ProjectManifest::load(&project_path).await?;
    manifest.apply(&orchestrator).await?;
    info!(project = %project_path.display(), "project loaded");

    let json = config.general.default_output == OutputFormat::Json;
    let colors_enabled = !json && console::Term::stderr().features().colors_supported();
    let renderer = OutputRenderer::new(config.general.default_output, colors_enabled);
    let mut event_handler = EventHandler::new(colors_enabled, json);

    let output = execute_command_with_events(
        cli.command,
        &orchestrator,
        config.build.step_interactively,
        subscription,
        &mut event_handler,
    )
    .await?;

    renderer.render_result(&output)?;

    if let CommandOutput::Build(summary) = &output {
        let failed = summary.report.failed().len();
        if failed > 0 {
            return Err(CliError::BuildFailed { failed });
        }
    }

    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    orchestrator: &Orchestrator,
    step: bool,
    mut subscription: Subscription,
    event_handler: &mut EventHandler,
) -> Result<CommandOutput, CliError> {
    let mut command_future = Box::pin(execute_command(command, orchestrator, step));

    loop {
        select! {
            result = &mut command_future => {
                for message in subscription.drain() {
                    event_handler.handle_event(&message);
                }
                return result;
            }

            Some(message) = subscription.recv() => {
                event_handler.handle_event(&message);
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    orchestrator: &Orchestrator,
    step: bool,
) -> Result<CommandOutput, CliError> {
    match command {
        Commands::Build { fragment, .. } => {
            let summary = build(orchestrator, fragment, step).await?;
            Ok(CommandOutput::Build(summary))
        }
        Commands::Pipeline => Ok(CommandOutput::Pipeline(
            orchestrator.registry().transformers().await,
        )),
        Commands::Fragments => Ok(CommandOutput::Fragments(
            orchestrator.project().fragments().await,
        )),
    }
}

/// Build one fragment or everything out of date, resuming through pauses
async fn build(
    orchestrator: &Orchestrator,
    fragment: Option<String>,
    step: bool,
) -> Result<BuildSummary, CliError> {
    let mut report = match fragment {
        Some(id) => orchestrator.build_fragment(&FragmentId::new(id)).await?,
        None => orchestrator.build_all().await?,
    };

    let mut stdin = step.then(|| BufReader::new(tokio::io::stdin()).lines());
    while report.is_paused() {
        if let Some(lines) = stdin.as_mut() {
            if !wait_for_step(orchestrator, lines).await? {
                // stdin closed; run the rest without prompting
                stdin = None;
            }
        }
        report = orchestrator.run_next().await?;
    }

    let mut outputs = Vec::with_capacity(report.fragments.len());
    for (id, _) in &report.fragments {
        let views = orchestrator.stage_views(id).await?;
        let output = views
            .last()
            .and_then(|view| view.result.as_ref())
            .and_then(|result| result.payload().cloned());
        outputs.push(FragmentOutput {
            fragment: id.clone(),
            output,
        });
    }
    Ok(BuildSummary { report, outputs })
}

/// Prompt at a pause; false once stdin is exhausted
async fn wait_for_step(
    orchestrator: &Orchestrator,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<bool, CliError> {
    let state = orchestrator.state().await;
    let fragment = state
        .current_fragment
        .map(|id| id.to_string())
        .unwrap_or_default();
    let stage = state.current_transformer_index.map_or(0, |index| index + 1);
    eprint!("{fragment}: stage {stage} done, press Enter to run the next one ");
    Ok(lines.next_line().await?.is_some())
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_log: bool) {
    let default_filter = if debug_log { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json_mode {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &GlobalArgs, command: &Commands) {
    if let Some(output) = global.output() {
        config.general.default_output = output;
    }
    if let Some(project) = &global.project {
        config.paths.project = Some(project.clone());
    }
    if let Commands::Build { debug, step, .. } = command {
        if *debug || *step {
            config.build.debug = true;
        }
        if *step {
            config.build.step_interactively = true;
        }
    }
}
