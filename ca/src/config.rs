//! cardadvisor configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};

use cardrank::Settings;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Project-local config file name
pub const LOCAL_CONFIG: &str = ".cardadvisor.yml";

/// Everything read from `cardadvisor.yml`; every section is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,

    /// Catalog location and shortlist sizes
    pub catalog: CatalogConfig,

    /// Web fetch limits for card links
    pub fetch: FetchConfig,

    /// Prompt template overrides
    pub prompts: PromptsConfig,
}

impl Config {
    /// Fail fast when the LLM key is missing
    ///
    /// `chat` calls this before collecting a profile so the user is not asked
    /// a dozen questions only to hit a dead provider.
    pub fn validate(&self) -> Result<()> {
        self.llm
            .api_key()
            .map(drop)
            .wrap_err_with(|| format!("No LLM API key: export {} first", self.llm.api_key_env))
    }

    /// Load from `explicit` when given, otherwise from the first readable
    /// candidate file, otherwise defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path).wrap_err_with(|| format!("Unable to use config {}", path.display()));
        }

        for candidate in Self::candidates() {
            if !candidate.is_file() {
                continue;
            }
            match Self::read(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => warn!(path = %candidate.display(), error = %e, "Config::load: skipping unreadable config"),
            }
        }

        debug!("Config::load: no config file, using built-in defaults");
        Ok(Self::default())
    }

    /// Search order: `./.cardadvisor.yml`, then the per-user config dir
    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("cardadvisor").join("cardadvisor.yml"));
        }
        paths
    }

    fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).wrap_err("Cannot read config file")?;
        let config = serde_yaml::from_str(&text).wrap_err("Config file is not valid YAML for cardadvisor")?;
        info!(path = %path.display(), "Config::read: loaded");
        Ok(config)
    }
}

/// Which provider and model answer the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `anthropic` or `openai`
    pub provider: String,

    pub model: String,

    /// Name of the variable holding the key, never the key itself
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Provider endpoint root, without the `/v1/...` path
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Upper bound on any single reply
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    pub temperature: f32,

    /// Per-request timeout
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// API key from the configured variable, trimmed; blank counts as unset
    pub fn api_key(&self) -> Result<String> {
        let raw = std::env::var(&self.api_key_env).wrap_err_with(|| format!("{} is not set", self.api_key_env))?;
        match raw.trim() {
            "" => eyre::bail!("{} is set but blank", self.api_key_env),
            key => Ok(key.to_string()),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 1024,
            temperature: 0.3,
            timeout_ms: 60_000,
        }
    }
}

/// Catalog location and shortlist sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path to the card catalog JSON
    pub path: PathBuf,

    /// Cards substituted when nothing is eligible
    #[serde(rename = "fallback-size")]
    pub fallback_size: usize,

    /// Ranked cards kept as the shortlist
    #[serde(rename = "shortlist-size")]
    pub shortlist_size: usize,

    /// Shortlisted cards sent to the explainer
    #[serde(rename = "explain-top")]
    pub explain_top: usize,
}

impl CatalogConfig {
    pub fn settings(&self) -> Settings {
        Settings {
            fallback_size: self.fallback_size,
            shortlist_size: self.shortlist_size,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/cards.json"),
            fallback_size: cardrank::eligibility::DEFAULT_FALLBACK_SIZE,
            shortlist_size: cardrank::session::DEFAULT_SHORTLIST_SIZE,
            explain_top: 5,
        }
    }
}

/// Web fetch limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Characters kept from a page fetched on request
    #[serde(rename = "max-chars")]
    pub max_chars: usize,

    /// Characters kept per link when answering follow-ups
    #[serde(rename = "link-chars")]
    pub link_chars: usize,

    /// Links fetched per follow-up question
    #[serde(rename = "max-links")]
    pub max_links: usize,

    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_chars: 2000,
            link_chars: 1500,
            max_links: 3,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/120.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// Prompt template overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory holding `{name}.pmt` overrides
    pub dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, "anthropic");
        assert!((config.llm.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.catalog.fallback_size, 20);
        assert_eq!(config.catalog.shortlist_size, 5);
        assert_eq!(config.fetch.timeout_ms, 10_000);
        assert_eq!(config.fetch.max_links, 3);
        assert!(config.prompts.dir.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
llm:
  provider: openai
  model: gpt-4o
  api-key-env: MY_API_KEY
  base-url: https://api.example.com
  max-tokens: 512
  temperature: 0.7
  timeout-ms: 30000

catalog:
  path: /srv/cards.json
  fallback-size: 10
  shortlist-size: 3
  explain-top: 3

fetch:
  max-chars: 4000
  link-chars: 800

prompts:
  dir: /etc/cardadvisor/prompts
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.api_key_env, "MY_API_KEY");
        assert_eq!(config.llm.max_tokens, 512);
        assert_eq!(config.catalog.path, PathBuf::from("/srv/cards.json"));
        assert_eq!(config.catalog.settings().shortlist_size, 3);
        assert_eq!(config.fetch.max_chars, 4000);
        assert_eq!(config.fetch.max_links, 3);
        assert_eq!(config.prompts.dir, Some(PathBuf::from("/etc/cardadvisor/prompts")));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
llm:
  model: claude-haiku
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "claude-haiku");
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.llm.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.catalog.fallback_size, 20);
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.yml");
        fs::write(&path, "catalog:\n  shortlist-size: 2\n").unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.catalog.shortlist_size, 2);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let err = Config::load(Some(Path::new("/definitely/not/here.yml"))).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.yml"));
    }

    #[test]
    #[serial]
    fn test_validate_and_api_key() {
        let mut config = Config::default();
        config.llm.api_key_env = "CARDADVISOR_TEST_KEY".to_string();

        // SAFETY: serialized with other env-mutating tests
        unsafe { std::env::remove_var("CARDADVISOR_TEST_KEY") };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CARDADVISOR_TEST_KEY"));

        unsafe { std::env::set_var("CARDADVISOR_TEST_KEY", "   ") };
        assert!(config.llm.api_key().is_err());

        unsafe { std::env::set_var("CARDADVISOR_TEST_KEY", "  secret  ") };
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.api_key().unwrap(), "secret");

        unsafe { std::env::remove_var("CARDADVISOR_TEST_KEY") };
    }
}
