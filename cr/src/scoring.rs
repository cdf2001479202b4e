//! Preference scorer
//!
//! Additive, rule-based scoring of eligible cards. Every rule fires
//! independently; the result is sorted by descending score with ties kept in
//! eligibility order.

use serde::Serialize;
use tracing::debug;

use crate::card::{ANNUAL_FEE, Card, JOINING_FEE};
use crate::prefs::{Preference, UserPreferences};

pub const EXACT_CATEGORY_POINTS: u32 = 15;
pub const PARTIAL_CATEGORY_POINTS: u32 = 8;
pub const BOTH_FEES_WAIVED_POINTS: u32 = 20;
pub const ANNUAL_FEE_WAIVED_POINTS: u32 = 15;
pub const JOINING_FEE_WAIVED_POINTS: u32 = 10;
pub const PREFERRED_BANK_POINTS: u32 = 25;
pub const PREMIUM_TIER_POINTS: u32 = 10;
pub const MID_TIER_POINTS: u32 = 5;

/// Income at or above which premium cards get a bonus
pub const PREMIUM_INCOME: u64 = 1_000_000;

/// Income at or above which lifestyle/rewards/travel cards get a bonus
pub const MID_INCOME: u64 = 500_000;

const JOINING_WAIVER_KEYWORDS: &[&str] = &["nil", "waived", "free"];
const ANNUAL_WAIVER_KEYWORDS: &[&str] = &["nil", "waived", "free", "lifetime"];
const MID_TIER_BADGES: &[&str] = &["lifestyle", "rewards", "travel"];

/// Where a feature rule looks for its keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Rewards,
    RewardsAndFees,
}

/// A preference satisfied by a keyword in the card's reward (or fee) text
struct FeatureRule {
    preference: Preference,
    source: Source,
    keywords: &'static [&'static str],
    points: u32,
}

const FEATURE_RULES: &[FeatureRule] = &[
    FeatureRule {
        preference: Preference::LoungeAccess,
        source: Source::Rewards,
        keywords: &["lounge"],
        points: 18,
    },
    FeatureRule {
        preference: Preference::FuelSurchargeWaiver,
        source: Source::RewardsAndFees,
        keywords: &["fuel"],
        points: 15,
    },
    FeatureRule {
        preference: Preference::Cashback,
        source: Source::Rewards,
        keywords: &["cashback"],
        points: 18,
    },
    FeatureRule {
        preference: Preference::TravelRewards,
        source: Source::Rewards,
        keywords: &["travel", "miles", "points", "air"],
        points: 16,
    },
    FeatureRule {
        preference: Preference::MovieBenefits,
        source: Source::Rewards,
        keywords: &["movie", "pvr"],
        points: 12,
    },
    FeatureRule {
        preference: Preference::DiningDiscounts,
        source: Source::Rewards,
        keywords: &["dining", "restaurant"],
        points: 12,
    },
    FeatureRule {
        preference: Preference::RailwayBenefits,
        source: Source::Rewards,
        keywords: &["railway", "irctc"],
        points: 12,
    },
    FeatureRule {
        preference: Preference::WelcomeBenefits,
        source: Source::Rewards,
        keywords: &["welcome"],
        points: 8,
    },
    FeatureRule {
        preference: Preference::MilestoneRewards,
        source: Source::Rewards,
        keywords: &["milestone"],
        points: 10,
    },
    FeatureRule {
        preference: Preference::InsuranceCoverage,
        source: Source::Rewards,
        keywords: &["insurance", "cover"],
        points: 8,
    },
];

/// Scoring rule that contributed points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", content = "preference", rename_all = "kebab-case")]
pub enum Rule {
    ExactCategory,
    PartialCategory,
    FeeWaiver,
    Feature(Preference),
    PreferredBank,
    IncomeTier,
}

impl Rule {
    pub fn label(&self) -> String {
        match self {
            Self::ExactCategory => "category match".to_string(),
            Self::PartialCategory => "partial category match".to_string(),
            Self::FeeWaiver => "fee waiver".to_string(),
            Self::Feature(p) => p.label().to_string(),
            Self::PreferredBank => "preferred bank".to_string(),
            Self::IncomeTier => "income tier".to_string(),
        }
    }
}

/// A card with its score and the rules that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCard<'a> {
    pub card: &'a Card,
    pub score: u32,
    pub breakdown: Vec<(Rule, u32)>,
}

impl<'a> ScoredCard<'a> {
    /// A card carried through without scoring
    pub fn unscored(card: &'a Card) -> Self {
        Self {
            card,
            score: 0,
            breakdown: Vec::new(),
        }
    }

    fn add(&mut self, rule: Rule, points: u32) {
        if points > 0 {
            self.score += points;
            self.breakdown.push((rule, points));
        }
    }
}

/// Score a single card against the user's preferences
pub fn score_card<'a>(card: &'a Card, prefs: &UserPreferences) -> ScoredCard<'a> {
    let mut scored = ScoredCard::unscored(card);
    let badges = card.badges_lower();
    let categories = prefs.categories_lower();

    let (exact, partial) = category_matches(&categories, &badges);
    scored.add(Rule::ExactCategory, exact * EXACT_CATEGORY_POINTS);
    scored.add(Rule::PartialCategory, partial * PARTIAL_CATEGORY_POINTS);

    if prefs.wants_fee_waiver() {
        scored.add(Rule::FeeWaiver, fee_waiver_points(card));
    }

    for rule in FEATURE_RULES {
        if prefs.wants(rule.preference) && feature_present(card, rule) {
            scored.add(Rule::Feature(rule.preference), rule.points);
        }
    }

    if prefs.banks_with(&card.institution) {
        scored.add(Rule::PreferredBank, PREFERRED_BANK_POINTS);
    }

    scored.add(Rule::IncomeTier, income_tier_points(card, &badges, prefs.income));

    scored
}

/// Score and order cards, highest first; equal scores keep input order
pub fn rank<'a>(cards: &[&'a Card], prefs: &UserPreferences) -> Vec<ScoredCard<'a>> {
    debug!(cards = cards.len(), "rank: called");
    let mut scored: Vec<ScoredCard<'a>> = cards.iter().map(|&card| score_card(card, prefs)).collect();
    // sort_by is stable
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Count exact and partial category matches
///
/// A category matched exactly is never also counted as partial.
fn category_matches(categories: &[String], badges: &[String]) -> (u32, u32) {
    let mut exact = 0;
    let mut partial = 0;
    for category in categories {
        if badges.contains(category) {
            exact += 1;
        } else if badges
            .iter()
            .any(|badge| badge.contains(category.as_str()) || category.contains(badge.as_str()))
        {
            partial += 1;
        }
    }
    (exact, partial)
}

fn fee_waiver_points(card: &Card) -> u32 {
    let waived = |kind: &str, keywords: &[&str]| {
        card.fees_of_kind(kind).any(|fee| {
            let details = fee.details_text();
            keywords.iter().any(|k| details.contains(k)) || states_zero_amount(&details)
        })
    };
    let joining = waived(JOINING_FEE, JOINING_WAIVER_KEYWORDS);
    let annual = waived(ANNUAL_FEE, ANNUAL_WAIVER_KEYWORDS);

    match (joining, annual) {
        (true, true) => BOTH_FEES_WAIVED_POINTS,
        (_, true) => ANNUAL_FEE_WAIVED_POINTS,
        (true, false) => JOINING_FEE_WAIVED_POINTS,
        (false, false) => 0,
    }
}

/// True if any token is a zero amount such as `0`, `₹0` or `Rs.0.00`
fn states_zero_amount(details: &str) -> bool {
    details.split_whitespace().any(|token| {
        let amount = token.trim_matches(|c: char| !c.is_ascii_digit());
        !amount.is_empty()
            && amount.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
            && amount.replace(',', "").parse::<f64>().is_ok_and(|v| v == 0.0)
    })
}

fn feature_present(card: &Card, rule: &FeatureRule) -> bool {
    let hit = |text: &str| rule.keywords.iter().any(|k| text.contains(k));
    let in_rewards = card.rewards.iter().any(|r| hit(r.search_text()));
    match rule.source {
        Source::Rewards => in_rewards,
        Source::RewardsAndFees => in_rewards || card.fees.iter().any(|f| hit(f.search_text())),
    }
}

fn income_tier_points(card: &Card, badges: &[String], income: u64) -> u32 {
    if income >= PREMIUM_INCOME {
        let premium = badges.iter().any(|b| b == "premium") || card.name.to_lowercase().contains("signature");
        if premium { PREMIUM_TIER_POINTS } else { 0 }
    } else if income >= MID_INCOME {
        let mid = badges.iter().any(|b| MID_TIER_BADGES.contains(&b.as_str()));
        if mid { MID_TIER_POINTS } else { 0 }
    } else {
        0
    }
}
