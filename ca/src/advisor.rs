//! Conversational advisor session
//!
//! Drives one advice session on top of a `Recommender`: asks the LLM to pick
//! and explain a card from the shortlist, then answers follow-up questions,
//! acting on `SWITCH_TO:` / `FETCH_LINK:` directives through the core so the
//! LLM can only ever move within the shortlist or read the current card's own
//! links.

use std::sync::Arc;

use cardrank::{Alternative, Card, Command, Recommender, Resolution, parse_command, strip_command};
use colored::Colorize;
use eyre::{Result, eyre};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::fetch::{FetchError, PageFetcher, fetch_card_link, fetch_card_pages, truncate_chars};
use crate::llm::{CompletionRequest, LlmClient};
use crate::present;
use crate::prompts::PromptLoader;

const SYSTEM_PROMPT: &str = "You are a careful credit card advisor. You only discuss cards from the data you are given.";

/// Words in a question that call for current information from the web
pub const WEB_KEYWORDS: [&str; 8] = [
    "latest",
    "current",
    "offers",
    "application",
    "apply",
    "website",
    "official",
    "bank",
];

/// Plain inputs that end the conversation
pub const EXIT_WORDS: [&str; 4] = ["exit", "quit", "bye", "done"];

const CONVERSATION_HISTORY_LINES: usize = 6;
const GOODBYE_HISTORY_LINES: usize = 4;
const LINK_PREVIEW_CHARS: usize = 500;

pub const ERROR_REPLY: &str =
    "I'm having trouble processing that. Could you rephrase your question or ask about specific card features?";
pub const CATALOG_APOLOGY: &str = "I can only provide information from our credit card database. Please ask about specific card features or request alternatives.";
pub const GOODBYE_FALLBACK: &str =
    "Great choice! Use your new credit card responsibly and enjoy the benefits. Have a wonderful day!";
pub const LINK_NOT_OWNED: &str = "This link is not associated with the current card in our database.";
pub const LINK_UNAVAILABLE: &str = "Unable to fetch information from this link at the moment.";
const EMPTY_INPUT_REPLY: &str = "What would you like to know about your card or alternatives?";
const NO_CURRENT_CARD: &str = "There is no card selected right now. Type /list to see the shortlist.";

/// Knobs taken from the config file
#[derive(Debug, Clone)]
pub struct AdvisorOptions {
    pub max_tokens: u32,
    pub explain_top: usize,
    pub max_links: usize,
    pub link_chars: usize,
    pub max_chars: usize,
}

impl AdvisorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_tokens: config.llm.max_tokens,
            explain_top: config.catalog.explain_top,
            max_links: config.fetch.max_links,
            link_chars: config.fetch.link_chars,
            max_chars: config.fetch.max_chars,
        }
    }
}

impl Default for AdvisorOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Outcome of one line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    /// Text to show the user
    Reply(String),
    /// Input was handled and already printed
    Handled,
    /// Closing message; the session is over
    Farewell(String),
}

/// True if the question asks for current information
pub fn needs_web_info(question: &str) -> bool {
    let lower = question.to_lowercase();
    WEB_KEYWORDS.iter().any(|k| lower.contains(k))
}

pub fn is_exit_word(input: &str) -> bool {
    let lower = input.trim().to_lowercase();
    EXIT_WORDS.contains(&lower.as_str())
}

/// Last `n` history lines, or `empty` when there are none
fn recent_history(history: &[String], n: usize, empty: &str) -> String {
    if history.is_empty() {
        return empty.to_string();
    }
    history[history.len().saturating_sub(n)..].join("\n")
}

fn pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| eyre!("Failed to serialize prompt data: {}", e))
}

/// One interactive advice session
pub struct AdvisorSession<'a> {
    llm: Arc<dyn LlmClient>,
    fetcher: Arc<dyn PageFetcher>,
    prompts: PromptLoader,
    recommender: Recommender<'a>,
    options: AdvisorOptions,
    history: Vec<String>,
}

impl<'a> AdvisorSession<'a> {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        fetcher: Arc<dyn PageFetcher>,
        prompts: PromptLoader,
        recommender: Recommender<'a>,
        options: AdvisorOptions,
    ) -> Self {
        Self {
            llm,
            fetcher,
            prompts,
            recommender,
            options,
            history: Vec::new(),
        }
    }

    pub fn recommender(&self) -> &Recommender<'a> {
        &self.recommender
    }

    pub fn current_card(&self) -> Option<&'a Card> {
        self.recommender.state().current_card()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Number of LLM calls made so far
    pub fn llm_calls(&self) -> usize {
        self.recommender.state().llm_calls()
    }

    /// Render a template, send it and return the trimmed reply text
    async fn ask<T: Serialize>(&mut self, template: &str, context: &T) -> Result<String> {
        let prompt = self.prompts.render(template, context)?;
        self.recommender.state_mut().record_llm_call();
        debug!(template, calls = self.llm_calls(), "ask: sending prompt");

        let request = CompletionRequest::single(SYSTEM_PROMPT, prompt, self.options.max_tokens);
        let response = self
            .llm
            .complete(request)
            .await
            .map_err(|e| eyre!("LLM call for {} failed: {}", template, e))?;

        response
            .text_content()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| eyre!("LLM returned an empty reply for {}", template))
    }

    fn profile_json(&self) -> Result<String> {
        pretty(self.recommender.prefs())
    }

    /// Ask the LLM to choose among the top of the shortlist
    ///
    /// Any failure falls back to the top-ranked card. `None` only when the
    /// shortlist is empty.
    pub async fn explain(&mut self) -> Option<Resolution<'a>> {
        let top: Vec<_> = self
            .recommender
            .state()
            .recommended()
            .iter()
            .take(self.options.explain_top)
            .enumerate()
            .map(|(i, scored)| {
                json!({
                    "rank": i + 1,
                    "score": scored.score,
                    "card": scored.card.summary(),
                })
            })
            .collect();
        if top.is_empty() {
            warn!("explain: empty shortlist");
            return None;
        }
        debug!(cards = top.len(), "explain: called");

        let reply = match (self.profile_json(), pretty(&top)) {
            (Ok(profile), Ok(cards)) => {
                let context = json!({
                    "user_profile": profile,
                    "card_count": top.len(),
                    "cards": cards,
                });
                self.ask("recommend", &context).await
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        };

        let reply = match reply {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "explain: explainer failed, using top card");
                None
            }
        };
        self.recommender.resolve_pick(reply.as_deref())
    }

    /// Handle one line of user input
    pub async fn handle_input(&mut self, input: &str) -> Turn {
        let input = input.trim();
        if input.is_empty() {
            return Turn::Reply(EMPTY_INPUT_REPLY.to_string());
        }
        if is_exit_word(input) {
            return Turn::Farewell(self.goodbye().await);
        }
        if input.starts_with('/') {
            return self.handle_slash_command(input).await;
        }

        self.history.push(format!("User: {}", input));
        let reply = match self.current_card() {
            None => NO_CURRENT_CARD.to_string(),
            Some(card) if needs_web_info(input) && !card.links.is_empty() => self.followup_with_web(input, card).await,
            Some(card) => self.converse(input, card).await,
        };
        self.history.push(format!("Assistant: {}", reply));
        Turn::Reply(reply)
    }

    /// General conversation turn; may switch card or fetch one link
    async fn converse(&mut self, question: &str, current: &'a Card) -> String {
        debug!(card = %current.name, "converse: called");
        let reply = match self.conversation_context(question, current) {
            Ok(context) => self.ask("conversation", &context).await,
            Err(e) => Err(e),
        };
        let reply = match reply {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "converse: conversation call failed");
                return ERROR_REPLY.to_string();
            }
        };

        let command = parse_command(&reply);
        let text = strip_command(&reply, &command);
        match command {
            Command::Switch(name) => match self.recommender.switch_to(&name) {
                Some(card) => {
                    info!(from = %current.name, to = %card.name, "converse: switched card");
                    format!("{}\n\n[Switched to {}]", text, card.name)
                }
                None => {
                    debug!(%name, "converse: switch target not in shortlist");
                    text
                }
            },
            Command::FetchLink(url) => {
                match fetch_card_link(self.fetcher.as_ref(), current, &url, self.options.max_chars).await {
                    Ok(content) => format!(
                        "{}\n\nCurrent information from official source: {}...",
                        text,
                        truncate_chars(&content, LINK_PREVIEW_CHARS)
                    ),
                    Err(FetchError::LinkNotOwned(_)) => format!("{}\n\n{}", text, LINK_NOT_OWNED),
                    Err(e) => {
                        warn!(%url, error = %e, "converse: link fetch failed");
                        format!("{}\n\n{}", text, LINK_UNAVAILABLE)
                    }
                }
            }
            Command::None => text,
        }
    }

    fn conversation_context(&self, question: &str, current: &Card) -> Result<serde_json::Value> {
        let alternatives: Vec<_> = self
            .recommender
            .alternatives()
            .into_iter()
            .map(|s| s.card.summary())
            .collect();
        Ok(json!({
            "question": question,
            "current_card": pretty(&current.summary())?,
            "user_profile": self.profile_json()?,
            "alternatives": pretty(&alternatives)?,
            "history": recent_history(&self.history, CONVERSATION_HISTORY_LINES, "No previous conversation"),
        }))
    }

    /// Answer with text from the card's own pages, else from catalog data only
    async fn followup_with_web(&mut self, question: &str, card: &'a Card) -> String {
        present::print_notice("Fetching current information from official sources...");
        let pages = fetch_card_pages(
            self.fetcher.as_ref(),
            card,
            self.options.max_links,
            self.options.link_chars,
        )
        .await;

        if let Some(web_content) = pages {
            let reply = match (self.profile_json(), pretty(&card.summary())) {
                (Ok(profile), Ok(card_json)) => {
                    let context = json!({
                        "question": question,
                        "user_profile": profile,
                        "card": card_json,
                        "web_content": web_content,
                    });
                    self.ask("followup-web", &context).await
                }
                (Err(e), _) | (_, Err(e)) => Err(e),
            };
            match reply {
                Ok(text) => return text,
                Err(e) => warn!(error = %e, "followup_with_web: web answer failed"),
            }
        } else {
            debug!(card = %card.name, "followup_with_web: no page content");
        }

        self.followup_from_catalog(question, card).await
    }

    async fn followup_from_catalog(&mut self, question: &str, card: &'a Card) -> String {
        let reply = match (self.profile_json(), pretty(&card.summary())) {
            (Ok(profile), Ok(card_json)) => {
                let context = json!({
                    "question": question,
                    "user_profile": profile,
                    "card": card_json,
                });
                self.ask("followup-catalog", &context).await
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        };
        reply.unwrap_or_else(|e| {
            warn!(error = %e, "followup_from_catalog: failed");
            CATALOG_APOLOGY.to_string()
        })
    }

    /// Closing message about the final card
    pub async fn goodbye(&mut self) -> String {
        let (card_name, institution) = match self.current_card() {
            Some(card) => (card.name.clone(), card.institution.clone()),
            None => ("your chosen card".to_string(), "your bank".to_string()),
        };
        let context = json!({
            "card_name": card_name,
            "institution": institution,
            "history": recent_history(&self.history, GOODBYE_HISTORY_LINES, "Brief interaction"),
        });
        match self.ask("goodbye", &context).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "goodbye: failed, using fixed message");
                GOODBYE_FALLBACK.to_string()
            }
        }
    }

    async fn handle_slash_command(&mut self, input: &str) -> Turn {
        let cmd = input.split_whitespace().next().unwrap_or_default();
        debug!(%cmd, "handle_slash_command: called");
        let employment = self.recommender.prefs().employment;

        match cmd {
            "/help" | "/h" => {
                print_help();
                Turn::Handled
            }
            "/quit" | "/q" | "/exit" => Turn::Farewell(self.goodbye().await),
            "/details" | "/d" => {
                match self.current_card() {
                    Some(card) => present::print_card_details(card, employment),
                    None => present::print_notice(NO_CURRENT_CARD),
                }
                Turn::Handled
            }
            "/list" | "/l" => {
                let state = self.recommender.state();
                present::print_shortlist(state.recommended(), state.current_card());
                Turn::Handled
            }
            "/why" | "/w" => {
                let state = self.recommender.state();
                let current = state
                    .current_card()
                    .and_then(|card| state.recommended().iter().find(|s| s.card == card));
                match current {
                    Some(scored) => present::print_breakdown(scored),
                    None => present::print_notice(NO_CURRENT_CARD),
                }
                Turn::Handled
            }
            "/alt" | "/a" => self.next_alternative().await,
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
                Turn::Handled
            }
        }
    }

    /// Reject the current card's issuer and recommend from what is left
    pub async fn next_alternative(&mut self) -> Turn {
        match self.recommender.reject_current() {
            Alternative::Next(shortlist) => {
                if shortlist.fallback_used {
                    present::print_fallback_notice();
                }
                match self.explain().await {
                    Some(resolution) => {
                        self.history.push(format!("[Switched to {}]", resolution.card.name));
                        present::print_recommendation(&resolution, "ALTERNATIVE RECOMMENDATION");
                        present::print_card_details(resolution.card, self.recommender.prefs().employment);
                        Turn::Handled
                    }
                    None => Turn::Reply(NO_CURRENT_CARD.to_string()),
                }
            }
            Alternative::Exhausted => Turn::Reply(
                "I've shown you all the available alternatives for your profile. Type /quit to finish.".to_string(),
            ),
        }
    }

    /// Shortlist, explain and print the opening recommendation
    ///
    /// Returns false when no card could be recommended.
    pub async fn open(&mut self) -> bool {
        present::print_profile(self.recommender.prefs());
        let shortlist = self.recommender.recommend();
        if shortlist.fallback_used {
            present::print_fallback_notice();
        }
        present::print_candidate_count(shortlist.candidates);

        let Some(resolution) = self.explain().await else {
            return false;
        };
        present::print_shortlist(&shortlist.cards, Some(resolution.card));
        present::print_recommendation(&resolution, "YOUR RECOMMENDED CREDIT CARD");
        present::print_card_details(resolution.card, self.recommender.prefs().employment);
        true
    }

    /// Run the whole session: opening recommendation, then the question loop
    pub async fn run(&mut self) -> Result<()> {
        if !self.open().await {
            println!("\nCouldn't find suitable recommendations. Please try with different criteria.");
            return Ok(());
        }

        println!("I'm here to answer any questions about your recommended card or help you explore alternatives.");
        println!(
            "Ask about features, fees or benefits. Type {} for commands, {} to finish.\n",
            "/help".yellow(),
            "exit".yellow()
        );

        let mut rl = DefaultEditor::new().map_err(|e| eyre!("Failed to initialize readline: {}", e))?;
        loop {
            match rl.readline(&format!("{} ", "You:".bright_green())) {
                Ok(line) => {
                    let input = line.trim();
                    if !input.is_empty() {
                        let _ = rl.add_history_entry(input);
                    }
                    match self.handle_input(input).await {
                        Turn::Reply(text) => present::print_reply(&text),
                        Turn::Handled => {}
                        Turn::Farewell(text) => {
                            present::print_reply(&text);
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    present::print_reply(&self.goodbye().await);
                    break;
                }
                Err(err) => return Err(eyre!("Readline error: {}", err)),
            }
        }

        info!(llm_calls = self.llm_calls(), "run: session finished");
        Ok(())
    }
}

fn print_help() {
    println!();
    println!("{}", "Available Commands:".bright_cyan());
    println!("  {:14} Show this help", "/help".yellow());
    println!("  {:14} Key details of the current card", "/details".yellow());
    println!("  {:14} Shortlist with scores", "/list".yellow());
    println!("  {:14} Drop the current issuer and pick another card", "/alt".yellow());
    println!("  {:14} Why the current card scored as it did", "/why".yellow());
    println!("  {:14} Finish the session", "/quit".yellow());
    println!();
}
