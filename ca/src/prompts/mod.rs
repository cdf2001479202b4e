//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for the advisor.
//!
//! Template loading chain:
//! 1. `.cardadvisor/prompts/{name}.pmt` (local override)
//! 2. `{prompts.dir}/{name}.pmt` (configured directory)
//! 3. Embedded fallback in code
//!
//! Templates use Handlebars syntax with HTML escaping turned off.

pub mod embedded;
mod loader;

pub use loader::PromptLoader;
