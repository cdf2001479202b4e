//! Card records and the normalized shapes the rest of the crate works with
//!
//! Catalog files are loosely typed: `rewards` and `fee_breakdown` show up either
//! as a list or as an object wrapping the list, descriptors are either free text
//! or structured objects, and numeric fields are sometimes strings. Everything
//! is normalized here once so eligibility and scoring never see raw JSON.

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Fee type tag for joining fees
pub const JOINING_FEE: &str = "joining_fee";

/// Fee type tag for annual fees
pub const ANNUAL_FEE: &str = "annual_fee";

/// A reward or fee descriptor, kept as raw JSON plus a lowercase search text
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// `type` of a structured descriptor, `None` for free text
    pub kind: Option<String>,
    /// `details` of a structured descriptor
    pub details: Vec<String>,
    text: String,
    raw: Value,
}

impl Descriptor {
    /// Build a descriptor from a catalog value
    ///
    /// Strings become free-text descriptors; objects become structured ones.
    /// Anything else (numbers, nulls, nested arrays) is rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::text(s.clone())),
            Value::Object(map) => {
                let kind = map.get("type").and_then(Value::as_str).map(str::to_string);
                let details = match map.get("details") {
                    Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
                    Some(other) => scalar_text(other).into_iter().collect(),
                    None => Vec::new(),
                };

                // Only `type` and `details` are searched; side fields such as a
                // co-brand partner name must not trigger keyword rules
                let text = kind
                    .iter()
                    .chain(details.iter())
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(" ")
                    .to_lowercase();

                Some(Self {
                    kind,
                    details,
                    text,
                    raw: value.clone(),
                })
            }
            _ => None,
        }
    }

    /// Free-text descriptor
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            kind: None,
            details: Vec::new(),
            text: text.to_lowercase(),
            raw: Value::String(text),
        }
    }

    /// Structured descriptor with a type and details
    pub fn structured(kind: impl Into<String>, details: &[&str]) -> Self {
        let kind = kind.into();
        let raw = serde_json::json!({ "type": kind, "details": details });
        Self::from_value(&raw).unwrap_or_else(|| Self::text(kind))
    }

    /// Lowercase text used for keyword matching
    pub fn search_text(&self) -> &str {
        &self.text
    }

    /// True if the normalized text contains `keyword` (already lowercase)
    pub fn mentions(&self, keyword: &str) -> bool {
        self.text.contains(keyword)
    }

    /// Details joined with spaces, lowercased
    pub fn details_text(&self) -> String {
        self.details.join(" ").to_lowercase()
    }

    /// Short human label: the type for structured entries, the text otherwise
    pub fn label(&self) -> String {
        match (&self.kind, &self.raw) {
            (Some(kind), _) => kind.clone(),
            (None, Value::String(s)) => s.clone(),
            (None, _) => self.text.clone(),
        }
    }

    /// The value as it appeared in the catalog
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }
}

impl Serialize for Descriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Minimum annual income by employment type
///
/// A threshold of zero counts as unspecified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IncomeThresholds {
    pub salaried: Option<u64>,
    pub self_employed: Option<u64>,
    pub any: Option<u64>,
}

/// External reference link attached to a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub title: String,
    pub uri: String,
}

/// Immutable catalog record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub name: String,
    pub institution: String,
    pub badges: Vec<String>,
    pub income_min: IncomeThresholds,
    pub minimum_credit_score: Option<u32>,
    pub bank_customer_only: bool,
    pub rewards: Vec<Descriptor>,
    pub fees: Vec<Descriptor>,
    pub interest_rate: Option<String>,
    pub links: Vec<Link>,
}

impl Card {
    /// Minimal card with only the required fields set
    pub fn new(name: impl Into<String>, institution: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            institution: institution.into(),
            badges: Vec::new(),
            income_min: IncomeThresholds::default(),
            minimum_credit_score: None,
            bank_customer_only: false,
            rewards: Vec::new(),
            fees: Vec::new(),
            interest_rate: None,
            links: Vec::new(),
        }
    }

    /// Badges lowercased for case-insensitive matching
    pub fn badges_lower(&self) -> Vec<String> {
        self.badges.iter().map(|b| b.to_lowercase()).collect()
    }

    /// Fee entries of the given type (`joining_fee`, `annual_fee`, ...)
    pub fn fees_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Descriptor> + 'a {
        self.fees.iter().filter(move |f| f.is_kind(kind))
    }

    /// Human readable fee details for a fee type, if the card lists one
    pub fn fee_summary(&self, kind: &str) -> Option<String> {
        let mut summaries = self.fees_of_kind(kind).map(|f| f.details.join(", "));
        summaries.next().filter(|s| !s.is_empty())
    }

    /// Up to five short features used when summarizing a card for an LLM
    pub fn key_features(&self) -> Vec<String> {
        let mut features: Vec<String> = Vec::new();

        for reward in &self.rewards {
            if features.len() >= 5 {
                break;
            }
            let label = match &reward.kind {
                Some(kind) if !kind.is_empty() => kind.clone(),
                Some(_) => continue,
                None => reward.label().chars().take(50).collect(),
            };
            features.push(label);
        }

        let no_joining_fee = self.fees_of_kind(JOINING_FEE).any(|f| {
            let details = f.details_text();
            details.contains("nil") || details.contains("waived")
        });
        if no_joining_fee {
            features.push("No joining fee".to_string());
        }

        features.extend(self.badges.iter().take(3).cloned());
        features.truncate(5);
        features
    }

    /// True if `url` is one of this card's own links
    pub fn owns_link(&self, url: &str) -> bool {
        self.links.iter().any(|l| l.uri == url)
    }

    /// Links ordered with the issuer's official pages first
    ///
    /// A link counts as official when its title mentions "bank" together with
    /// the institution's first word, "bank.com" or ".com".
    pub fn links_by_priority(&self) -> Vec<&Link> {
        let bank_word = self
            .institution
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase();

        let (official, other): (Vec<&Link>, Vec<&Link>) = self.links.iter().partition(|link| {
            let title = link.title.to_lowercase();
            let names_bank = (!bank_word.is_empty() && title.contains(&bank_word))
                || title.contains("bank.com")
                || title.contains(".com");
            names_bank && title.contains("bank")
        });

        official.into_iter().chain(other).collect()
    }

    /// Compact view of the card for prompt context
    pub fn summary(&self) -> CardSummary<'_> {
        CardSummary {
            name: &self.name,
            institution: &self.institution,
            categories: &self.badges,
            key_features: self.key_features(),
            rewards: &self.rewards,
            fees: &self.fees,
            eligibility: &self.income_min,
            interest_rate: self.interest_rate.as_deref(),
            bank_requirement: self.bank_customer_only,
        }
    }
}

/// Serializable digest of a card
#[derive(Debug, Serialize)]
pub struct CardSummary<'a> {
    pub name: &'a str,
    pub institution: &'a str,
    pub categories: &'a [String],
    pub key_features: Vec<String>,
    pub rewards: &'a [Descriptor],
    pub fees: &'a [Descriptor],
    pub eligibility: &'a IncomeThresholds,
    pub interest_rate: Option<&'a str>,
    pub bank_requirement: bool,
}
