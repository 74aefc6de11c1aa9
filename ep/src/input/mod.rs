//! Input collection
//!
//! Request text, voice transcripts and device location. The speech and
//! geolocation capabilities are traits so a host without them degrades to
//! typed input and the fallback location.

mod collector;
pub mod location;
pub mod voice;

pub use collector::InputCollector;
pub use location::{
    FixedLocationProvider, IpLocationProvider, LocationFix, LocationProvider, UnavailableLocationProvider,
    provider_from_config, resolve_location,
};
pub use voice::{
    CommandRecognizer, SpeechRecognizer, ToggleResult, VoiceCapture, VoiceEvent, VoiceState, merge_transcript,
};
