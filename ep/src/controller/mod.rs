//! Plan state controller
//!
//! Orchestrates request cycles end-to-end and owns the session's plan state.
//! Single-flight: a generation counter decides which cycle may commit, and
//! `submit` cancels whatever cycle is still running.

mod core;
mod state;

pub use core::{CycleOutcome, PlanController};
pub use state::PlanState;
