//! REPL session management

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::controller::{CycleOutcome, PlanController};
use crate::domain::Location;
use crate::input::{InputCollector, LocationProvider, ToggleResult};
use crate::links::directions_url;
use crate::prompts::PlanMode;
use crate::render::{render_history, render_plan};

/// Interactive planning session
pub struct ReplSession {
    controller: Arc<PlanController>,
    input: InputCollector,
    locator: Box<dyn LocationProvider>,
    locate_timeout: Duration,
    pinned: bool,
}

/// A parsed slash command
#[derive(Debug, Clone, PartialEq, Eq)]
enum SlashCommand {
    Help,
    Quit,
    Plan,
    Reroute(String),
    Voice,
    History,
    Recall(usize),
    Locate,
    Link,
    Clear,
    Show,
}

/// Result of handling a slash command
enum SlashResult {
    Continue,
    Quit,
}

fn parse_slash(input: &str) -> Result<SlashCommand, String> {
    let (cmd, rest) = match input.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (input, ""),
    };

    match cmd {
        "/help" | "/h" => Ok(SlashCommand::Help),
        "/quit" | "/q" | "/exit" => Ok(SlashCommand::Quit),
        "/plan" | "/p" => Ok(SlashCommand::Plan),
        "/reroute" | "/r" => Ok(SlashCommand::Reroute(rest.to_string())),
        "/voice" | "/v" => Ok(SlashCommand::Voice),
        "/history" => Ok(SlashCommand::History),
        "/recall" => match rest.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(SlashCommand::Recall(n)),
            _ => Err("Usage: /recall N (1 is the most recent request)".to_string()),
        },
        "/locate" => Ok(SlashCommand::Locate),
        "/link" => Ok(SlashCommand::Link),
        "/clear" | "/c" => Ok(SlashCommand::Clear),
        "/show" | "/s" => Ok(SlashCommand::Show),
        other => Err(format!("Unknown command: {}", other)),
    }
}

impl ReplSession {
    pub fn new(
        controller: Arc<PlanController>,
        input: InputCollector,
        locator: Box<dyn LocationProvider>,
        locate_timeout: Duration,
    ) -> Self {
        Self {
            controller,
            input,
            locator,
            locate_timeout,
            pinned: false,
        }
    }

    /// Use a fixed origin for the whole session instead of the provider
    pub fn pin_location(&mut self, location: Location) {
        debug!(label = %location.label, "pin_location: called");
        self.input.set_location(location);
        self.pinned = true;
    }

    /// Run the REPL main loop
    pub async fn run(&mut self, initial_text: Option<String>) -> Result<()> {
        self.print_welcome();
        self.locate().await;

        if let Some(text) = initial_text {
            println!("{} {}", ">".bright_green(), text);
            self.input.set_text(text);
            self.generate(PlanMode::PlanInit, None).await;
        }

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            self.apply_voice();

            let readline = rl.readline(&format!("{} ", ">".bright_green()));
            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input).await {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.input.set_text(input);
                        println!("{} {}", "Request:".dimmed(), self.input.text());
                        println!("{}", "Type /plan to generate.".dimmed());
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "errandplan".bright_cyan().bold());
        println!("List your errands, then type {} to plan the route.", "/plan".yellow());
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    async fn handle_slash_command(&mut self, input: &str) -> SlashResult {
        debug!(%input, "handle_slash_command: called");
        let command = match parse_slash(input) {
            Ok(command) => command,
            Err(message) => {
                println!("{} {}", "?".yellow(), message);
                println!("Type {} for available commands", "/help".yellow());
                return SlashResult::Continue;
            }
        };

        match command {
            SlashCommand::Help => self.print_help(),
            SlashCommand::Quit => return SlashResult::Quit,
            SlashCommand::Plan => self.generate(PlanMode::PlanInit, None).await,
            SlashCommand::Reroute(extra) => {
                self.locate().await;
                self.generate(PlanMode::Reroute, Some(extra)).await;
            }
            SlashCommand::Voice => self.toggle_voice(),
            SlashCommand::History => print!("{}", render_history(&self.controller.snapshot().history)),
            SlashCommand::Recall(n) => match self.controller.recall(n - 1) {
                Some(text) => {
                    self.input.set_text(text);
                    println!("{} {}", "Request:".dimmed(), self.input.text());
                }
                None => println!("{}", format!("No request #{} in history.", n).dimmed()),
            },
            SlashCommand::Locate => self.locate().await,
            SlashCommand::Link => self.print_link(),
            SlashCommand::Clear => {
                self.controller.reset();
                self.input.clear_text();
                println!("{}", "Plan and request cleared.".dimmed());
            }
            SlashCommand::Show => {
                if !self.input.text().is_empty() {
                    println!("{} {}", "Request:".dimmed(), self.input.text());
                }
                print!("{}", self.render());
            }
        }
        SlashResult::Continue
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:16} Generate a plan from the current request", "/plan".yellow());
        println!("  {:16} Re-plan from your current location", "/reroute [text]".yellow());
        println!("  {:16} Start or stop dictating errands", "/voice".yellow());
        println!("  {:16} Show recent requests", "/history".yellow());
        println!("  {:16} Reuse a recent request", "/recall N".yellow());
        println!("  {:16} Refresh your location", "/locate".yellow());
        println!("  {:16} Print the directions link", "/link".yellow());
        println!("  {:16} Show the current plan", "/show".yellow());
        println!("  {:16} Discard the plan and request", "/clear".yellow());
        println!("  {:16} Show this help", "/help".yellow());
        println!("  {:16} Exit", "/quit".yellow());
        println!();
        println!("{}", "Any other line replaces the request text.".dimmed());
        println!();
    }

    fn render(&self) -> String {
        render_plan(&self.controller.snapshot(), &self.input.location().coordinates)
    }

    async fn locate(&mut self) {
        if self.pinned {
            println!("{} {} (from --lat/--lon)", "Location:".dimmed(), self.input.location().label);
            return;
        }
        let advisory = self.input.relocate(self.locator.as_ref(), self.locate_timeout).await;
        if let Some(advisory) = advisory {
            println!("{} {}", "!".yellow(), advisory);
        } else {
            println!("{} {}", "Location:".dimmed(), self.input.location().label);
        }
    }

    fn print_link(&self) {
        let state = self.controller.snapshot();
        match state
            .plan
            .as_ref()
            .and_then(|plan| directions_url(&self.input.location().coordinates, &plan.stops))
        {
            Some(url) => println!("{}", url.blue().underline()),
            None => println!("{}", "No route to link yet.".dimmed()),
        }
    }

    /// Start or stop a capture; the transcript is merged by `apply_voice`
    fn toggle_voice(&mut self) {
        match self.input.toggle_voice() {
            ToggleResult::Unsupported => println!("{}", "Voice input is not configured (set voice.command).".dimmed()),
            ToggleResult::Denied(err) => println!("{} {}", "!".yellow(), err.advisory()),
            ToggleResult::Stopped => println!("{}", "Stopped listening.".dimmed()),
            ToggleResult::Started => println!(
                "{}",
                "Listening... keep typing, or /voice again to stop.".bright_green()
            ),
        }
    }

    /// Merge finished captures into the request text
    ///
    /// Returns true when the text changed.
    fn apply_voice(&mut self) -> bool {
        let before = self.input.text().to_string();
        for advisory in self.input.pump_voice() {
            println!("{} {}", "!".yellow(), advisory);
        }
        let changed = self.input.text() != before;
        if changed {
            println!("{} {}", "Request:".dimmed(), self.input.text());
        }
        changed
    }

    /// Run one cycle; Ctrl+C cancels it
    async fn generate(&mut self, mode: PlanMode, extra: Option<String>) {
        let request = match extra {
            Some(extra) => extra,
            None => self.input.text().to_string(),
        };
        debug!(%mode, request_len = request.len(), "generate: called");

        let handle = self
            .controller
            .submit(request, self.input.location().clone(), mode);
        println!("{}", "Planning...".dimmed());

        let outcome = tokio::select! {
            joined = handle => joined.ok(),
            _ = tokio::signal::ctrl_c() => {
                self.controller.cancel();
                None
            }
        };

        match outcome {
            Some(CycleOutcome::Skipped) => println!("{}", "Type your errands first.".dimmed()),
            Some(CycleOutcome::Superseded) => {}
            Some(CycleOutcome::Committed) | Some(CycleOutcome::Failed(_)) => print!("{}", self.render()),
            None => println!("{}", "Cancelled.".dimmed()),
        }
    }
}
