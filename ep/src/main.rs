//! errandplan - maps-grounded errand planner
//!
//! CLI entry point for one-shot planning, offline prompt/parse tools and the
//! interactive session.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use errandplan::cli::{Cli, Command, LocationArgs, OutputFormat, get_log_path};
use errandplan::config::Config;
use errandplan::controller::{CycleOutcome, PlanController, PlanState};
use errandplan::domain::Location;
use errandplan::error::PlanError;
use errandplan::input::{provider_from_config, resolve_location};
use errandplan::llm::{GeminiClient, RawResponse};
use errandplan::parser;
use errandplan::prompts::{PlanMode, PromptLoader, RequestComposer};
use errandplan::render::{render_json, render_plan};
use errandplan::repl;

fn parse_level(level_str: Option<&str>) -> tracing::Level {
    match level_str.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    }
}

fn open_log_file(log_path: &Path) -> Result<fs::File> {
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }
    fs::File::create(log_path).context("Failed to create log file")
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = parse_level(cli_log_level.or(config_log_level));
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());
    let log_path = get_log_path();

    match open_log_file(&log_path) {
        Ok(log_file) => {
            tracing_subscriber::fmt()
                .with_writer(log_file)
                .with_ansi(false)
                .with_env_filter(filter)
                .init();
            info!("Logging initialized (level: {:?}, file: {})", level, log_path.display());
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
            warn!("Logging to stderr, could not open {}: {:#}", log_path.display(), e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref());

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(provider = %config.llm.provider, model = %config.llm.model, "errandplan loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        None => {
            debug!("main: no subcommand, starting repl");
            repl::run_interactive(&config, cli.text, pinned_location(&cli.location)?).await
        }
        Some(Command::Repl { text, location }) => {
            debug!("main: matched Repl command");
            repl::run_interactive(&config, text, pinned_location(&location)?).await
        }
        Some(Command::Plan { text, location, format }) => {
            debug!(?format, "main: matched Plan command");
            cmd_generate(&config, &text, PlanMode::PlanInit, &location, format).await
        }
        Some(Command::Reroute { text, location, format }) => {
            debug!(?format, "main: matched Reroute command");
            cmd_generate(&config, text.as_deref().unwrap_or(""), PlanMode::Reroute, &location, format).await
        }
        Some(Command::Prompt { text, mode, location }) => {
            debug!(?mode, "main: matched Prompt command");
            cmd_prompt(&text, mode.into(), &location)
        }
        Some(Command::Parse { file, location, format }) => {
            debug!(?file, ?format, "main: matched Parse command");
            cmd_parse(file.as_ref(), &location, format)
        }
    }
}

/// Location from `--lat/--lon`, rejected when out of range
fn pinned_location(args: &LocationArgs) -> Result<Option<Location>> {
    match args.location() {
        Some(location) if !location.coordinates.is_valid() => {
            Err(eyre::eyre!("Coordinates out of range: {}", location.coordinates))
        }
        other => Ok(other),
    }
}

/// Location from `--lat/--lon`, or from the configured provider
async fn origin(config: &Config, args: &LocationArgs) -> Result<Location> {
    if let Some(location) = pinned_location(args)? {
        return Ok(location);
    }

    let provider = provider_from_config(&config.location);
    let fix = resolve_location(provider.as_ref(), Duration::from_millis(config.location.timeout_ms)).await;
    if let Some(advisory) = fix.advisory {
        eprintln!("{}", advisory);
    }
    Ok(fix.location)
}

fn print_state(state: &PlanState, location: &Location, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render_plan(state, &location.coordinates)),
        OutputFormat::Json => println!("{}", render_json(state, &location.coordinates)?),
    }
    Ok(())
}

/// Generate a plan once and print it
async fn cmd_generate(
    config: &Config,
    text: &str,
    mode: PlanMode,
    location_args: &LocationArgs,
    format: OutputFormat,
) -> Result<()> {
    debug!(%mode, "cmd_generate: called");
    config.validate()?;

    let controller = PlanController::from_config(config, std::env::current_dir()?)?;
    let location = origin(config, location_args).await?;

    match controller.run_cycle(text, &location, mode).await {
        CycleOutcome::Committed => print_state(&controller.snapshot(), &location, format),
        CycleOutcome::Skipped => Err(eyre::eyre!("Nothing to plan: the request is empty")),
        CycleOutcome::Superseded => Err(eyre::eyre!("Request was superseded")),
        CycleOutcome::Failed(err) => Err(eyre::eyre!("{} ({})", err.user_message(), err)),
    }
}

/// Print the composed prompt without calling the service
fn cmd_prompt(text: &str, mode: PlanMode, location_args: &LocationArgs) -> Result<()> {
    debug!(%mode, "cmd_prompt: called");
    let location = location_args.location().unwrap_or_else(Location::fallback);
    let composer = RequestComposer::new(PromptLoader::new(std::env::current_dir()?));
    let prompt = composer.compose_now(text, &location, mode)?;
    println!("{}", prompt);
    Ok(())
}

/// Parse a saved response and render it
fn cmd_parse(file: Option<&PathBuf>, location_args: &LocationArgs, format: OutputFormat) -> Result<()> {
    debug!(?file, "cmd_parse: called");
    let text = match file {
        Some(path) => fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let raw = parse_saved_response(&text);
    let (plan, links) = parser::ingest(&raw).map_err(|e| {
        let err = PlanError::from(e);
        eyre::eyre!("{} ({})", err.user_message(), err)
    })?;

    let state = PlanState {
        plan: Some(plan),
        links,
        ..Default::default()
    };

    let location = location_args.location().unwrap_or_else(Location::fallback);
    print_state(&state, &location, format)
}

/// A saved response is either the full service JSON or just the reply text
fn parse_saved_response(text: &str) -> RawResponse {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) if value.get("candidates").is_some() => {
            debug!("parse_saved_response: full service response");
            GeminiClient::decode_response(&value).unwrap_or_else(|_| RawResponse::text(text))
        }
        _ => RawResponse::text(text),
    }
}
