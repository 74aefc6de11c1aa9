//! Interactive planning session
//!
//! A rustyline loop where plain lines edit the request text and slash
//! commands drive voice capture, location, generation and history.

mod session;

pub use session::ReplSession;

use std::sync::Arc;
use std::time::Duration;

use eyre::Result;

use crate::config::{Config, VoiceConfig};
use crate::controller::PlanController;
use crate::domain::Location;
use crate::input::{CommandRecognizer, InputCollector, SpeechRecognizer, VoiceCapture, provider_from_config};

/// Voice capture backed by the configured recognizer command, if any
pub fn voice_from_config(config: &VoiceConfig) -> VoiceCapture {
    let recognizer = config
        .command
        .as_ref()
        .map(|program| Arc::new(CommandRecognizer::new(program.clone(), config.args.clone())) as Arc<dyn SpeechRecognizer>);
    VoiceCapture::new(recognizer)
}

/// Run the interactive session
///
/// This is the main entry point for `ep repl`. A `pinned` location replaces
/// the configured provider for the whole session.
pub async fn run_interactive(config: &Config, initial_text: Option<String>, pinned: Option<Location>) -> Result<()> {
    config.validate()?;

    let controller = Arc::new(PlanController::from_config(config, std::env::current_dir()?)?);
    let input = InputCollector::new(voice_from_config(&config.voice));
    let locator = provider_from_config(&config.location);

    let mut session = ReplSession::new(
        controller,
        input,
        locator,
        Duration::from_millis(config.location.timeout_ms),
    );
    if let Some(location) = pinned {
        session.pin_location(location);
    }
    session.run(initial_text).await
}
