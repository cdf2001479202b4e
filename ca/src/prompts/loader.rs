//! Prompt template lookup and rendering
//!
//! Loads prompt templates from override files or falls back to embedded
//! defaults, then renders them with Handlebars.

use std::path::{Path, PathBuf};

use eyre::{Context, Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Finds prompt templates and renders them without HTML escaping
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    /// Override directories, searched in order
    dirs: Vec<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that checks `.cardadvisor/prompts/` under `root`, then
    /// the configured directory, then the embedded prompts
    pub fn new(root: impl AsRef<Path>, configured: Option<&Path>) -> Self {
        let local = root.as_ref().join(".cardadvisor/prompts");
        let dirs = std::iter::once(local)
            .chain(configured.map(Path::to_path_buf))
            .filter(|d| d.is_dir())
            .collect();
        Self::with_dirs(dirs)
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        Self::with_dirs(Vec::new())
    }

    fn with_dirs(dirs: Vec<PathBuf>) -> Self {
        let mut hbs = Handlebars::new();
        // Prompts are plain text; card data contains `&` and quotes
        hbs.register_escape_fn(handlebars::no_escape);
        Self { hbs, dirs }
    }

    /// Template source for `name`: the first `{name}.pmt` found in the
    /// override directories, else the built-in copy
    pub fn load_template(&self, name: &str) -> Result<String> {
        let file = format!("{name}.pmt");
        if let Some(path) = self.dirs.iter().map(|dir| dir.join(&file)).find(|p| p.is_file()) {
            debug!(path = %path.display(), "load_template: override");
            return std::fs::read_to_string(&path).wrap_err_with(|| format!("Cannot read prompt {}", path.display()));
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("No prompt template named '{name}'"))
    }

    /// Render `name` against `context`
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        debug!(template = name, "render: called");
        let source = self.load_template(name)?;
        self.hbs
            .render_template(&source, context)
            .map_err(|e| eyre!("Prompt '{name}' failed to render: {e}"))
    }
}
