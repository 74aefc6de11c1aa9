//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;

/// Which kind of plan the service is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlanMode {
    /// Originate a plan from the request text
    PlanInit,
    /// Adjust the plan the user is already following
    Reroute,
}

impl PlanMode {
    /// Wire tag embedded in the prompt
    pub fn tag(&self) -> &'static str {
        match self {
            Self::PlanInit => "PLAN_INIT",
            Self::Reroute => "REROUTE",
        }
    }

    pub fn is_reroute(&self) -> bool {
        matches!(self, Self::Reroute)
    }
}

impl std::fmt::Display for PlanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Context for rendering the plan template
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext {
    /// Raw request text, embedded verbatim
    pub request: String,
    /// Whether `request` has anything besides whitespace
    pub has_request: bool,
    /// Literal "lat, lon" pair
    pub coordinates: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Human-readable location label
    pub location_label: String,
    /// Local wall-clock time string
    pub current_time: String,
    /// `PLAN_INIT` or `REROUTE`
    pub mode: String,
    pub is_reroute: bool,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.errandplan/prompts/`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a new prompt loader rooted at `base`
    ///
    /// Looks for overrides in `{base}/.errandplan/prompts/`.
    pub fn new(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        debug!(?base, "PromptLoader::new: called");
        let user_dir = base.join(".errandplan/prompts");

        let user_dir_exists = user_dir.exists();
        if user_dir_exists {
            debug!(?user_dir, "PromptLoader::new: user override directory found");
        } else {
            debug!(?user_dir, "PromptLoader::new: no user override directory");
        }

        Self {
            hbs: Self::engine(),
            user_dir: if user_dir_exists { Some(user_dir) } else { None },
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
        }
    }

    /// Prompts are plain text, so user input must not be HTML-escaped
    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `.errandplan/prompts/{name}.pmt`
    /// 2. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            } else {
                debug!(?path, "PromptLoader::load_template: not found in user override");
            }
        }

        debug!("PromptLoader::load_template: trying embedded fallback");
        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template_name: &str, context: &PromptContext) -> Result<String> {
        debug!(%template_name, mode = %context.mode, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        info!("Rendering template '{}' (mode: {})", template_name, context.mode);

        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}
