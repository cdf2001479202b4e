//! Catalog loading and validation
//!
//! A catalog is a JSON array of card records. Records missing a name or an
//! issuing institution are dropped (and counted); a file that cannot be read or
//! is not a JSON array fails the whole load.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::card::{Card, Descriptor, IncomeThresholds, Link};

/// Fatal catalog failure; the session cannot start without a catalog
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Catalog must be a JSON array of cards, found {0}")]
    NotAnArray(&'static str),
}

/// Why a single record was dropped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedCardRecord {
    #[error("record is not an object")]
    NotAnObject,

    #[error("missing card name")]
    MissingName,

    #[error("missing issuing institution")]
    MissingInstitution,

    #[error("unreadable record: {0}")]
    Unreadable(String),
}

/// Result of loading a catalog
#[derive(Debug, Clone, Default)]
pub struct CatalogReport {
    /// Valid cards, in input order
    pub cards: Vec<Card>,
    /// Number of records dropped as malformed
    pub dropped: usize,
}

impl CatalogReport {
    /// Number of records seen
    pub fn total(&self) -> usize {
        self.cards.len() + self.dropped
    }
}

/// Load and validate a catalog file
pub fn load_catalog(path: impl AsRef<Path>) -> Result<CatalogReport, CatalogLoadError> {
    let path = path.as_ref();
    debug!(?path, "load_catalog: called");
    let content = std::fs::read_to_string(path).map_err(|source| CatalogLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&content)
}

/// Parse and validate catalog JSON text
pub fn parse_catalog(content: &str) -> Result<CatalogReport, CatalogLoadError> {
    let value: Value = serde_json::from_str(content)?;
    match value {
        Value::Array(records) => Ok(catalog_from_values(records)),
        Value::Object(_) => Err(CatalogLoadError::NotAnArray("an object")),
        Value::String(_) => Err(CatalogLoadError::NotAnArray("a string")),
        Value::Number(_) => Err(CatalogLoadError::NotAnArray("a number")),
        Value::Bool(_) => Err(CatalogLoadError::NotAnArray("a boolean")),
        Value::Null => Err(CatalogLoadError::NotAnArray("null")),
    }
}

/// Validate already-parsed records, keeping input order
pub fn catalog_from_values(records: Vec<Value>) -> CatalogReport {
    let mut report = CatalogReport::default();

    for (index, record) in records.into_iter().enumerate() {
        match card_from_value(record) {
            Ok(card) => report.cards.push(card),
            Err(reason) => {
                debug!(index, %reason, "catalog_from_values: dropping record");
                report.dropped += 1;
            }
        }
    }

    info!(
        "Loaded {} valid cards from {} total cards",
        report.cards.len(),
        report.total()
    );
    report
}

/// Field-name mapping for one raw record
///
/// Every loosely typed field stays a `Value` so a bad shape in one optional
/// field cannot reject the record.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCard {
    name: Value,
    #[serde(alias = "Institution")]
    institution: Value,
    #[serde(alias = "badge")]
    badges: Value,
    #[serde(rename = "eligibilityIncomeMin", alias = "eligibility_income_min")]
    eligibility_income_min: Value,
    #[serde(rename = "minimumCreditScore", alias = "minimum_credit_score")]
    minimum_credit_score: Value,
    #[serde(rename = "isBankCustomerOnly", alias = "is_bank_customer_only")]
    is_bank_customer_only: Value,
    rewards: Value,
    #[serde(rename = "feeBreakdown", alias = "fee_breakdown")]
    fee_breakdown: Value,
    #[serde(rename = "interestRate", alias = "interest_rate")]
    interest_rate: Value,
    links: Value,
}

/// Validate and normalize one record
pub fn card_from_value(record: Value) -> Result<Card, MalformedCardRecord> {
    if !record.is_object() {
        return Err(MalformedCardRecord::NotAnObject);
    }
    let raw: RawCard = serde_json::from_value(record).map_err(|e| MalformedCardRecord::Unreadable(e.to_string()))?;

    let name = non_empty_string(&raw.name).ok_or(MalformedCardRecord::MissingName)?;
    let institution = non_empty_string(&raw.institution)
        .filter(|i| i != "None")
        .ok_or(MalformedCardRecord::MissingInstitution)?;

    let income = &raw.eligibility_income_min;
    Ok(Card {
        name,
        institution,
        badges: string_list(&raw.badges),
        income_min: IncomeThresholds {
            salaried: threshold(income, &["salaried"]),
            self_employed: threshold(income, &["self_employed", "selfEmployed", "self-employed"]),
            any: threshold(income, &["Any", "any"]),
        },
        minimum_credit_score: as_u64(&raw.minimum_credit_score)
            .filter(|s| *s > 0)
            .and_then(|s| u32::try_from(s).ok()),
        bank_customer_only: as_bool(&raw.is_bank_customer_only),
        rewards: descriptors(&raw.rewards, "rewards"),
        fees: descriptors(&raw.fee_breakdown, "fee_breakdown"),
        interest_rate: non_empty_string(&raw.interest_rate),
        links: links(&raw.links),
    })
}

fn non_empty_string(value: &Value) -> Option<String> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(non_empty_string).collect(),
        Value::String(_) => non_empty_string(value).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Non-negative integer from a number or a numeric string
fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let digits: String = s.chars().filter(|c| !matches!(c, ',' | '_' | ' ')).collect();
            digits.parse::<u64>().ok()
        }
        _ => None,
    }
}

fn as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "y" | "1"),
        Value::Number(n) => n.as_u64().is_some_and(|n| n != 0),
        _ => false,
    }
}

fn threshold(income: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .find_map(|k| income.get(*k).and_then(as_u64))
        .filter(|v| *v > 0)
}

/// Unwrap the list-or-wrapper shape used by `rewards` and `fee_breakdown`
fn descriptors(value: &Value, wrapper_key: &str) -> Vec<Descriptor> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get(wrapper_key) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };
    items.iter().filter_map(Descriptor::from_value).collect()
}

fn links(value: &Value) -> Vec<Link> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let uri = non_empty_string(item.get("uri")?)?;
            let title = item.get("title").and_then(non_empty_string).unwrap_or_default();
            Some(Link { title, uri })
        })
        .collect()
}
