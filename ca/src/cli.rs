//! CLI command definitions and subcommands

use std::path::PathBuf;

use cardrank::{Employment, Preference, PreferenceError, UserPreferences};
use clap::{Parser, Subcommand};
use tracing::debug;

/// cardadvisor - conversational credit card advisor
#[derive(Debug, Parser)]
#[command(
    name = "ca",
    about = "Find the credit card that fits your profile, then ask about it",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    /// Subcommand to execute (defaults to chat)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect preferences interactively and chat about the recommendation
    Chat {
        /// Card catalog JSON file
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Print the ranked shortlist for a profile given as flags (no LLM)
    Rank(RankArgs),

    /// Check a catalog file and report valid and dropped records
    Validate {
        /// Card catalog JSON file
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

/// Profile flags for `ca rank`
#[derive(Debug, Clone, clap::Args)]
pub struct RankArgs {
    /// Card catalog JSON file
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// salaried or self-employed
    #[arg(short, long)]
    pub employment: String,

    /// Annual income in rupees
    #[arg(short, long)]
    pub income: u64,

    /// Spending category (repeatable)
    #[arg(long = "category", required = true)]
    pub categories: Vec<String>,

    /// Preference such as "lounge access" or no-annual-fee (repeatable)
    #[arg(short, long = "preference", required = true)]
    pub preferences: Vec<String>,

    /// Preferred bank
    #[arg(short, long)]
    pub bank: Option<String>,

    /// Approximate credit score
    #[arg(long)]
    pub credit_score: Option<u32>,

    /// Institution to leave out (repeatable)
    #[arg(short = 'x', long = "exclude")]
    pub exclude: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

impl RankArgs {
    /// Build and validate the preference record from the flags
    pub fn preferences(&self) -> Result<UserPreferences, PreferenceError> {
        debug!(employment = %self.employment, income = self.income, "RankArgs::preferences: called");
        let employment: Employment = self.employment.parse()?;
        let preferences = self
            .preferences
            .iter()
            .map(|p| p.parse::<Preference>())
            .collect::<Result<Vec<_>, _>>()?;

        let mut prefs = UserPreferences::new(employment, self.income)
            .with_categories(self.categories.iter().cloned())
            .with_preferences(preferences);
        if let Some(bank) = &self.bank {
            prefs = prefs.with_bank(bank.clone());
        }
        if let Some(score) = self.credit_score {
            prefs = prefs.with_credit_score(score);
        }
        prefs.validate()?;
        Ok(prefs)
    }
}

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}
