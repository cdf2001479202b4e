//! Recommendation session
//!
//! `Recommender` runs filter, fallback and scoring against the catalog and owns
//! the mutable `SessionState`: the current card, the last shortlist and the
//! growing set of excluded institutions. Every re-run starts from the full
//! catalog so an excluded issuer can never come back.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::card::Card;
use crate::command::parse_pick;
use crate::eligibility::{Candidates, DEFAULT_FALLBACK_SIZE, filter, shortlist_candidates};
use crate::prefs::UserPreferences;
use crate::scoring::{ScoredCard, rank};

/// Default number of ranked cards kept as the shortlist
pub const DEFAULT_SHORTLIST_SIZE: usize = 5;

/// Tunables for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub fallback_size: usize,
    pub shortlist_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fallback_size: DEFAULT_FALLBACK_SIZE,
            shortlist_size: DEFAULT_SHORTLIST_SIZE,
        }
    }
}

/// Mutable state for one run
#[derive(Debug, Clone, Default)]
pub struct SessionState<'a> {
    excluded_institutions: Vec<String>,
    current: Option<&'a Card>,
    recommended: Vec<ScoredCard<'a>>,
    fallback_used: bool,
    llm_calls: usize,
}

impl<'a> SessionState<'a> {
    pub fn excluded_institutions(&self) -> &[String] {
        &self.excluded_institutions
    }

    pub fn current_card(&self) -> Option<&'a Card> {
        self.current
    }

    pub fn recommended(&self) -> &[ScoredCard<'a>] {
        &self.recommended
    }

    pub fn fallback_used(&self) -> bool {
        self.fallback_used
    }

    pub fn llm_calls(&self) -> usize {
        self.llm_calls
    }

    pub fn record_llm_call(&mut self) {
        self.llm_calls += 1;
    }

    /// Add an institution to the exclusions; returns false if already present
    fn exclude(&mut self, institution: &str) -> bool {
        if self.excluded_institutions.iter().any(|i| i == institution) {
            return false;
        }
        self.excluded_institutions.push(institution.to_string());
        true
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct Shortlist<'a> {
    pub cards: Vec<ScoredCard<'a>>,
    /// Number of candidates that went into scoring
    pub candidates: usize,
    pub fallback_used: bool,
}

impl<'a> Shortlist<'a> {
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn top(&self) -> Option<&ScoredCard<'a>> {
        self.cards.first()
    }
}

/// Outcome of rejecting the current card
#[derive(Debug, Clone)]
pub enum Alternative<'a> {
    Next(Shortlist<'a>),
    Exhausted,
}

/// Card chosen from an explainer reply
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a> {
    pub card: &'a Card,
    pub rationale: String,
    /// True when the reply could not be used and the top card was taken
    pub fallback: bool,
}

/// Rationale used when the explainer gives nothing usable
pub fn generic_rationale(card: &Card) -> String {
    format!(
        "Based on your preferences, I recommend the {} as it best matches your requirements.",
        card.name
    )
}

/// Deterministic recommendation pipeline over a borrowed catalog
#[derive(Debug)]
pub struct Recommender<'a> {
    catalog: &'a [Card],
    prefs: UserPreferences,
    settings: Settings,
    state: SessionState<'a>,
}

impl<'a> Recommender<'a> {
    pub fn new(catalog: &'a [Card], prefs: UserPreferences) -> Self {
        Self::with_settings(catalog, prefs, Settings::default())
    }

    pub fn with_settings(catalog: &'a [Card], prefs: UserPreferences, settings: Settings) -> Self {
        Self {
            catalog,
            prefs,
            settings,
            state: SessionState::default(),
        }
    }

    pub fn prefs(&self) -> &UserPreferences {
        &self.prefs
    }

    pub fn catalog(&self) -> &'a [Card] {
        self.catalog
    }

    pub fn state(&self) -> &SessionState<'a> {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState<'a> {
        &mut self.state
    }

    /// Exclude an institution (e.g. from the command line)
    ///
    /// Its cards leave the stored shortlist at once, and the current card is
    /// cleared if it belongs to it.
    pub fn exclude(&mut self, institution: &str) {
        if self.state.exclude(institution) {
            debug!(%institution, "exclude: added");
        }
        self.state.recommended.retain(|s| s.card.institution != institution);
        if self.state.current.is_some_and(|c| c.institution == institution) {
            self.state.current = None;
        }
    }

    /// Shortlisted cards whose institution is not excluded
    fn shortlisted(&self) -> impl Iterator<Item = &'a Card> + '_ {
        let excluded = &self.state.excluded_institutions;
        self.state
            .recommended
            .iter()
            .map(|s| s.card)
            .filter(move |c| !excluded.contains(&c.institution))
    }

    /// Filter, widen if needed, score and keep the top N
    ///
    /// The shortlist is stored in the session; the current card is left alone.
    pub fn recommend(&mut self) -> Shortlist<'a> {
        self.run(true)
    }

    /// One pipeline pass; `widen` allows the catalog-head fallback when
    /// nothing is eligible
    fn run(&mut self, widen: bool) -> Shortlist<'a> {
        debug!(excluded = ?self.state.excluded_institutions, widen, "run: called");
        let excluded = &self.state.excluded_institutions;
        let candidates = if widen {
            shortlist_candidates(self.catalog, &self.prefs, excluded, self.settings.fallback_size)
        } else {
            Candidates {
                cards: filter(self.catalog, &self.prefs, excluded),
                fallback_used: false,
            }
        };

        let mut ranked = rank(&candidates.cards, &self.prefs);
        if ranked.is_empty() && !candidates.cards.is_empty() {
            warn!("recommend: nothing scored, using eligible cards unscored");
            ranked = candidates.cards.iter().map(|&c| ScoredCard::unscored(c)).collect();
        }
        ranked.truncate(self.settings.shortlist_size);

        info!(
            candidates = candidates.cards.len(),
            shortlist = ranked.len(),
            fallback = candidates.fallback_used,
            "recommend: shortlist ready"
        );

        self.state.recommended = ranked.clone();
        self.state.fallback_used = candidates.fallback_used;

        Shortlist {
            cards: ranked,
            candidates: candidates.cards.len(),
            fallback_used: candidates.fallback_used,
        }
    }

    /// Make `card` current if it is in the shortlist and not excluded
    pub fn select(&mut self, card: &'a Card) -> bool {
        let listed = self.state.recommended.iter().any(|s| s.card == card);
        let excluded = self.state.excluded_institutions.contains(&card.institution);
        if !listed || excluded {
            debug!(card = %card.name, listed, excluded, "select: refused");
            return false;
        }
        self.state.current = Some(card);
        true
    }

    /// Exclude the current card's issuer and re-run from the full catalog
    ///
    /// The current card is cleared either way. With no current card this is a
    /// plain re-run. The re-run only widens to the catalog head when the
    /// session was already widened; otherwise running out of eligible cards
    /// is `Exhausted`.
    pub fn reject_current(&mut self) -> Alternative<'a> {
        if let Some(card) = self.state.current.take() {
            info!(card = %card.name, institution = %card.institution, "reject_current: excluding");
            self.state.exclude(&card.institution);
        }

        let widen = self.state.fallback_used;
        let shortlist = self.run(widen);
        if shortlist.is_empty() {
            warn!("reject_current: no alternatives left");
            Alternative::Exhausted
        } else {
            Alternative::Next(shortlist)
        }
    }

    /// Switch to the first shortlisted card whose name contains `name`
    pub fn switch_to(&mut self, name: &str) -> Option<&'a Card> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        let card = self.shortlisted().find(|c| c.name.to_lowercase().contains(&wanted))?;
        debug!(card = %card.name, "switch_to: switched");
        self.state.current = Some(card);
        Some(card)
    }

    /// Shortlisted cards other than the current one
    pub fn alternatives(&self) -> Vec<&ScoredCard<'a>> {
        self.state
            .recommended
            .iter()
            .filter(|s| self.state.current != Some(s.card))
            .filter(|s| !self.state.excluded_institutions.contains(&s.card.institution))
            .collect()
    }

    /// Turn an explainer reply into the current card
    ///
    /// A reply that is missing, unparseable or names no shortlisted card falls
    /// back to the top card with a generic rationale. Returns `None` only when
    /// the shortlist is empty.
    pub fn resolve_pick(&mut self, response: Option<&str>) -> Option<Resolution<'a>> {
        let top = self.shortlisted().next()?;

        let picked = response.and_then(parse_pick).and_then(|pick| {
            let wanted = pick.name.to_lowercase();
            self.shortlisted()
                .find(|c| c.name.to_lowercase().contains(&wanted))
                .map(|card| (card, pick.rationale))
        });

        let resolution = match picked {
            Some((card, rationale)) => Resolution {
                card,
                rationale: rationale.unwrap_or_else(|| generic_rationale(card)),
                fallback: false,
            },
            None => {
                warn!(card = %top.name, "resolve_pick: unusable reply, using top card");
                Resolution {
                    card: top,
                    rationale: generic_rationale(top),
                    fallback: true,
                }
            }
        };

        self.state.current = Some(resolution.card);
        Some(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Descriptor, IncomeThresholds};
    use crate::prefs::{Employment, Preference};

    fn card(name: &str, institution: &str, badges: &[&str]) -> Card {
        let mut c = Card::new(name, institution);
        c.badges = badges.iter().map(|b| b.to_string()).collect();
        c
    }

    fn prefs() -> UserPreferences {
        UserPreferences::new(Employment::Salaried, 300_000)
            .with_categories(["Travel"])
            .with_preferences([Preference::Cashback])
    }

    fn catalog() -> Vec<Card> {
        let mut gamma = card("Gamma Travel", "Gamma Bank", &["Travel", "Lifestyle"]);
        gamma.rewards = vec![Descriptor::text("2% cashback on all spends")];
        vec![
            card("Alpha Travel", "Alpha Bank", &["Travel"]),
            card("Beta Basic", "Beta Bank", &[]),
            card("Alpha Shop", "Alpha Bank", &["Shopping"]),
            gamma,
        ]
    }

    #[test]
    fn test_recommend_orders_and_stores() {
        let cards = catalog();
        let mut rec = Recommender::new(&cards, prefs());
        let shortlist = rec.recommend();

        let names: Vec<_> = shortlist.cards.iter().map(|s| s.card.name.as_str()).collect();
        // Gamma: 15 + 18 cashback, Alpha Travel: 15, rest 0 in catalog order
        assert_eq!(names, vec!["Gamma Travel", "Alpha Travel", "Beta Basic", "Alpha Shop"]);
        assert_eq!(rec.state().recommended().len(), 4);
        assert!(!shortlist.fallback_used);
        assert!(rec.state().current_card().is_none());
    }

    #[test]
    fn test_shortlist_size_is_respected() {
        let cards = catalog();
        let settings = Settings {
            fallback_size: 20,
            shortlist_size: 2,
        };
        let mut rec = Recommender::with_settings(&cards, prefs(), settings);
        assert_eq!(rec.recommend().len(), 2);
    }

    #[test]
    fn test_reject_current_excludes_institution() {
        let cards = catalog();
        let mut rec = Recommender::new(&cards, prefs());
        rec.recommend();
        assert!(rec.select(&cards[0]));

        match rec.reject_current() {
            Alternative::Next(shortlist) => {
                assert!(shortlist.cards.iter().all(|s| s.card.institution != "Alpha Bank"));
                assert_eq!(shortlist.len(), 2);
            }
            Alternative::Exhausted => panic!("expected alternatives"),
        }
        assert_eq!(rec.state().excluded_institutions(), ["Alpha Bank".to_string()]);
        assert!(rec.state().current_card().is_none());
    }

    #[test]
    fn test_reject_until_exhausted() {
        let cards = vec![card("Only", "Solo Bank", &[])];
        let mut rec = Recommender::new(&cards, prefs());
        rec.recommend();
        assert!(rec.resolve_pick(None).is_some());

        assert!(matches!(rec.reject_current(), Alternative::Exhausted));
        assert!(rec.state().current_card().is_none());
        assert!(rec.state().recommended().is_empty());

        // Rejecting again stays exhausted without panicking
        assert!(matches!(rec.reject_current(), Alternative::Exhausted));
    }

    #[test]
    fn test_exclusions_are_deduplicated() {
        let cards = catalog();
        let mut rec = Recommender::new(&cards, prefs());
        rec.exclude("Beta Bank");
        rec.exclude("Beta Bank");
        assert_eq!(rec.state().excluded_institutions().len(), 1);
    }

    #[test]
    fn test_select_refuses_cards_outside_shortlist() {
        let cards = catalog();
        let stranger = card("Stranger", "Other Bank", &[]);
        let mut rec = Recommender::new(&cards, prefs());
        rec.recommend();
        assert!(!rec.select(&stranger));
        assert!(rec.state().current_card().is_none());
    }

    #[test]
    fn test_switch_to_by_substring() {
        let cards = catalog();
        let mut rec = Recommender::new(&cards, prefs());
        rec.recommend();

        let switched = rec.switch_to("gamma").unwrap();
        assert_eq!(switched.name, "Gamma Travel");
        assert_eq!(rec.state().current_card().map(|c| c.name.as_str()), Some("Gamma Travel"));

        assert!(rec.switch_to("Platinum Elite").is_none());
        assert_eq!(rec.state().current_card().map(|c| c.name.as_str()), Some("Gamma Travel"));
    }

    #[test]
    fn test_alternatives_exclude_current() {
        let cards = catalog();
        let mut rec = Recommender::new(&cards, prefs());
        rec.recommend();
        rec.switch_to("Beta");
        let names: Vec<_> = rec.alternatives().iter().map(|s| s.card.name.as_str()).collect();
        assert_eq!(names, vec!["Gamma Travel", "Alpha Travel", "Alpha Shop"]);
    }

    #[test]
    fn test_resolve_pick_uses_reply() {
        let cards = catalog();
        let mut rec = Recommender::new(&cards, prefs());
        rec.recommend();

        let reply = "RECOMMENDED CARD: Alpha Travel\nEXPLANATION: Great for trips.";
        let resolution = rec.resolve_pick(Some(reply)).unwrap();
        assert_eq!(resolution.card.name, "Alpha Travel");
        assert_eq!(resolution.rationale, "Great for trips.");
        assert!(!resolution.fallback);
    }

    #[test]
    fn test_resolve_pick_falls_back_to_top() {
        let cards = catalog();
        let mut rec = Recommender::new(&cards, prefs());
        rec.recommend();

        for reply in [None, Some(""), Some("no idea"), Some("RECOMMENDED CARD: Unknown Card")] {
            let resolution = rec.resolve_pick(reply).unwrap();
            assert_eq!(resolution.card.name, "Gamma Travel");
            assert!(resolution.fallback);
            assert_eq!(
                resolution.rationale,
                "Based on your preferences, I recommend the Gamma Travel as it best matches your requirements."
            );
        }
    }

    #[test]
    fn test_resolve_pick_on_empty_shortlist() {
        let cards: Vec<Card> = Vec::new();
        let mut rec = Recommender::new(&cards, prefs());
        assert!(rec.recommend().is_empty());
        assert!(rec.resolve_pick(Some("RECOMMENDED CARD: Anything")).is_none());
    }

    #[test]
    fn test_exclude_drops_cards_from_shortlist() {
        let cards = catalog();
        let mut rec = Recommender::new(&cards, prefs());
        rec.recommend();
        rec.exclude("Alpha Bank");

        assert!(rec.state().recommended().iter().all(|s| s.card.institution != "Alpha Bank"));
        assert!(rec.switch_to("alpha").is_none());
        assert!(rec.state().current_card().is_none());
        assert!(rec.alternatives().iter().all(|s| s.card.institution != "Alpha Bank"));
    }

    #[test]
    fn test_resolve_pick_skips_excluded_institution() {
        let cards = catalog();
        let mut rec = Recommender::new(&cards, prefs());
        rec.recommend();
        rec.exclude("Gamma Bank");

        let fallback = rec.resolve_pick(None).unwrap();
        assert_eq!(fallback.card.name, "Alpha Travel");

        let named = rec.resolve_pick(Some("RECOMMENDED CARD: Gamma Travel")).unwrap();
        assert_eq!(named.card.name, "Alpha Travel");
        assert!(named.fallback);
    }

    #[test]
    fn test_reject_does_not_widen_past_last_eligible_card() {
        let mut rich = card("Rich", "Rich Bank", &[]);
        rich.income_min = IncomeThresholds {
            salaried: Some(10_000_000),
            ..Default::default()
        };
        let cards = vec![card("Only", "Solo Bank", &[]), rich];
        let mut rec = Recommender::new(&cards, prefs());

        let shortlist = rec.recommend();
        assert!(!shortlist.fallback_used);
        assert_eq!(shortlist.len(), 1);
        assert!(rec.resolve_pick(None).is_some());

        assert!(matches!(rec.reject_current(), Alternative::Exhausted));
        assert!(rec.state().recommended().is_empty());
        assert!(!rec.state().fallback_used());
    }

    #[test]
    fn test_reject_inside_fallback_keeps_widening() {
        let mut a = card("Rich A", "A Bank", &[]);
        let mut b = card("Rich B", "B Bank", &[]);
        for c in [&mut a, &mut b] {
            c.income_min = IncomeThresholds {
                salaried: Some(10_000_000),
                ..Default::default()
            };
        }
        let cards = vec![a, b];
        let mut rec = Recommender::new(&cards, prefs());
        assert!(rec.recommend().fallback_used);
        rec.switch_to("Rich A");

        match rec.reject_current() {
            Alternative::Next(shortlist) => {
                assert!(shortlist.fallback_used);
                let names: Vec<_> = shortlist.cards.iter().map(|s| s.card.name.as_str()).collect();
                assert_eq!(names, vec!["Rich B"]);
            }
            Alternative::Exhausted => panic!("expected the other widened card"),
        }
    }

    #[test]
    fn test_fallback_flag_recorded() {
        let mut rich = card("Rich", "Rich Bank", &[]);
        rich.income_min = IncomeThresholds {
            salaried: Some(10_000_000),
            ..Default::default()
        };
        let cards = vec![rich];
        let mut rec = Recommender::new(&cards, prefs());
        let shortlist = rec.recommend();
        assert!(shortlist.fallback_used);
        assert!(rec.state().fallback_used());
        assert_eq!(shortlist.len(), 1);
    }
}
