//! cardrank - deterministic credit card shortlisting
//!
//! Loads a loosely typed card catalog, filters out cards a user cannot get,
//! scores the rest against their preferences and tracks the session state
//! needed to re-rank after a card is rejected.
//!
//! # Pipeline
//!
//! ```text
//! load_catalog -> shortlist_candidates -> rank -> Recommender (select / reject / switch)
//! ```
//!
//! Nothing in this crate does network I/O. Free-text replies from an LLM are
//! parsed by [`command`] and fed back through [`Recommender`].

pub mod card;
pub mod catalog;
pub mod command;
pub mod eligibility;
pub mod prefs;
pub mod scoring;
pub mod session;

pub use card::{ANNUAL_FEE, Card, CardSummary, Descriptor, IncomeThresholds, JOINING_FEE, Link};
pub use catalog::{CatalogLoadError, CatalogReport, MalformedCardRecord, load_catalog, parse_catalog};
pub use command::{Command, Pick, parse_command, parse_pick, strip_command};
pub use eligibility::{Candidates, Ineligible, eligibility, filter, is_eligible, shortlist_candidates};
pub use prefs::{Employment, Preference, PreferenceError, UserPreferences};
pub use scoring::{Rule, ScoredCard, rank, score_card};
pub use session::{Alternative, Recommender, Resolution, SessionState, Settings, Shortlist};
