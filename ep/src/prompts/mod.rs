//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for plan requests.
//!
//! Template loading chain:
//! 1. `.errandplan/prompts/{name}.pmt` (user override)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution. One template
//! serves both modes; the mode flag selects the wording.

mod composer;
pub mod embedded;
mod loader;

pub use composer::RequestComposer;
pub use loader::{PlanMode, PromptContext, PromptLoader};
