//! CLI command definitions and subcommands

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::{Coordinates, Location};
use crate::prompts::PlanMode;

/// errandplan - maps-grounded errand planner
#[derive(Parser)]
#[command(
    name = "ep",
    about = "Plan a multi-stop errand route with a maps-grounded AI service",
    version,
    args_conflicts_with_subcommands = true,
    after_help = "Logs are written to: ~/.local/share/errandplan/logs/errandplan.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(long, global = true, help = "Log level (overrides config)")]
    pub log_level: Option<String>,

    /// Initial request text for the interactive session
    #[arg(value_name = "TEXT")]
    pub text: Option<String>,

    #[command(flatten)]
    pub location: LocationArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the interactive session (default)
    Repl {
        /// Initial request text
        text: Option<String>,

        #[command(flatten)]
        location: LocationArgs,
    },

    /// Generate a plan once and print it
    Plan {
        /// Errands to plan, e.g. "milk, stamps, drop off dry cleaning"
        text: String,

        #[command(flatten)]
        location: LocationArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Ask for a reroute from the current location
    Reroute {
        /// Extra instructions for the new route
        text: Option<String>,

        #[command(flatten)]
        location: LocationArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the prompt that would be sent, without calling the service
    Prompt {
        /// Request text
        text: String,

        /// Prompt mode
        #[arg(short, long, value_enum, default_value_t = ModeArg::PlanInit)]
        mode: ModeArg,

        #[command(flatten)]
        location: LocationArgs,
    },

    /// Parse a saved service response and render it
    Parse {
        /// Response file (reads stdin when omitted)
        file: Option<PathBuf>,

        #[command(flatten)]
        location: LocationArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Location override shared by commands that need an origin
#[derive(Args, Debug, Clone, Default)]
pub struct LocationArgs {
    /// Latitude of the starting point
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of the starting point
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,
}

impl LocationArgs {
    /// Location given on the command line, if both coordinates were passed
    pub fn location(&self) -> Option<Location> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Location::from_coordinates(Coordinates::new(lat, lon))),
            _ => None,
        }
    }
}

/// Prompt mode on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    PlanInit,
    Reroute,
}

impl From<ModeArg> for PlanMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::PlanInit => PlanMode::PlanInit,
            ModeArg::Reroute => PlanMode::Reroute,
        }
    }
}

/// Output format for plan-printing commands
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("errandplan")
        .join("logs")
        .join("errandplan.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_negative_coordinates() {
        let cli = Cli::try_parse_from(["ep", "plan", "milk", "--lat", "37.7", "--lon", "-122.4"]).unwrap();
        let Some(Command::Plan { location, .. }) = cli.command else {
            panic!("expected plan command");
        };
        let location = location.location().unwrap();
        assert_eq!(location.coordinates, Coordinates::new(37.7, -122.4));
    }

    #[test]
    fn test_lat_requires_lon() {
        assert!(Cli::try_parse_from(["ep", "plan", "milk", "--lat", "37.7"]).is_err());
    }

    #[test]
    fn test_bare_text_starts_repl() {
        let cli = Cli::try_parse_from(["ep", "milk and eggs"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.text.as_deref(), Some("milk and eggs"));
    }

    #[test]
    fn test_repl_accepts_location() {
        let cli = Cli::try_parse_from(["ep", "milk", "--lat", "40.0", "--lon", "-74.0"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.location.location().map(|l| l.coordinates), Some(Coordinates::new(40.0, -74.0)));

        let cli = Cli::try_parse_from(["ep", "repl", "--lat", "51.5", "--lon", "-0.12"]).unwrap();
        let Some(Command::Repl { text, location }) = cli.command else {
            panic!("expected repl command");
        };
        assert!(text.is_none());
        assert!(location.location().is_some());
    }

    #[test]
    fn test_prompt_mode() {
        let cli = Cli::try_parse_from(["ep", "prompt", "milk", "--mode", "reroute"]).unwrap();
        let Some(Command::Prompt { mode, .. }) = cli.command else {
            panic!("expected prompt command");
        };
        assert_eq!(PlanMode::from(mode), PlanMode::Reroute);
    }
}
