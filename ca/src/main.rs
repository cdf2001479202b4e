//! cardadvisor - conversational credit card advisor
//!
//! CLI entry point.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cardrank::{CatalogReport, Recommender, Shortlist, load_catalog};
use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use serde_json::json;
use tracing::{debug, info};

use cardadvisor::cli::{Cli, Command, OutputFormat, RankArgs};
use cardadvisor::config::Config;
use cardadvisor::{AdvisorOptions, AdvisorSession, PreferenceCollector, PromptLoader, WebFetcher, create_client, present};

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cardadvisor")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let log_file = fs::File::create(log_dir.join("cardadvisor.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    info!(provider = %config.llm.provider, catalog = %config.catalog.path.display(), "cardadvisor loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Chat { catalog }) => cmd_chat(&config, catalog.as_deref()).await,
        Some(Command::Rank(args)) => cmd_rank(&config, &args),
        Some(Command::Validate { catalog }) => cmd_validate(&config, catalog.as_deref()),
        None => cmd_chat(&config, None).await,
    }
}

fn load(config: &Config, catalog: Option<&Path>) -> Result<CatalogReport> {
    let path = catalog.unwrap_or(config.catalog.path.as_path());
    debug!(path = %path.display(), "load: called");
    let report = load_catalog(path).wrap_err_with(|| format!("Failed to load catalog {}", path.display()))?;
    info!(cards = report.cards.len(), dropped = report.dropped, "load: catalog ready");
    Ok(report)
}

async fn cmd_chat(config: &Config, catalog: Option<&Path>) -> Result<()> {
    config.validate()?;
    let report = load(config, catalog)?;
    if report.cards.is_empty() {
        eyre::bail!("The catalog has no usable cards");
    }

    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let fetcher = Arc::new(WebFetcher::from_config(&config.fetch).context("Failed to create web fetcher")?);
    let root = std::env::current_dir().context("Failed to read current directory")?;
    let prompts = PromptLoader::new(root, config.prompts.dir.as_deref());

    let prefs = PreferenceCollector::new()?.collect()?;
    println!("\n{}", "=".repeat(60));
    println!("Thank you! Let me find the best credit card for you...");
    println!("{}\n", "=".repeat(60));

    let recommender = Recommender::with_settings(&report.cards, prefs, config.catalog.settings());
    let mut session = AdvisorSession::new(
        llm,
        fetcher,
        prompts,
        recommender,
        AdvisorOptions::from_config(config),
    );
    session.run().await
}

fn cmd_rank(config: &Config, args: &RankArgs) -> Result<()> {
    let report = load(config, args.catalog.as_deref())?;
    let prefs = args.preferences().context("Invalid profile")?;

    let mut recommender = Recommender::with_settings(&report.cards, prefs, config.catalog.settings());
    for institution in &args.exclude {
        recommender.exclude(institution);
    }
    let shortlist = recommender.recommend();

    match args.format {
        OutputFormat::Json => print_rank_json(&report, &shortlist)?,
        OutputFormat::Text => print_rank_text(&report, &shortlist, recommender.prefs().employment),
    }
    Ok(())
}

fn print_rank_json(report: &CatalogReport, shortlist: &Shortlist<'_>) -> Result<()> {
    let cards: Vec<_> = shortlist
        .cards
        .iter()
        .enumerate()
        .map(|(i, scored)| {
            json!({
                "rank": i + 1,
                "name": scored.card.name,
                "institution": scored.card.institution,
                "score": scored.score,
                "breakdown": scored
                    .breakdown
                    .iter()
                    .map(|(rule, points)| json!({ "rule": rule, "points": points }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    let output = json!({
        "catalog": { "cards": report.cards.len(), "dropped": report.dropped },
        "candidates": shortlist.candidates,
        "fallback_used": shortlist.fallback_used,
        "cards": cards,
    });
    println!("{}", serde_json::to_string_pretty(&output).context("Failed to serialize ranking")?);
    Ok(())
}

fn print_rank_text(report: &CatalogReport, shortlist: &Shortlist<'_>, employment: cardrank::Employment) {
    if report.dropped > 0 {
        present::print_notice(&format!("Skipped {} malformed catalog records", report.dropped));
    }
    if shortlist.fallback_used {
        present::print_fallback_notice();
    }
    if shortlist.is_empty() {
        println!("No cards match this profile.");
        return;
    }

    println!("Found {} eligible cards.", shortlist.candidates);
    present::print_shortlist(&shortlist.cards, None);
    if let Some(top) = shortlist.top() {
        println!("{} {}", "Top pick:".bright_cyan(), top.card.name.bold());
        present::print_breakdown(top);
        present::print_card_details(top.card, employment);
    }
}

fn cmd_validate(config: &Config, catalog: Option<&Path>) -> Result<()> {
    let report = load(config, catalog)?;
    println!("Valid cards: {}", report.cards.len());
    println!("Dropped records: {}", report.dropped);
    println!("Total records: {}", report.total());
    Ok(())
}
