//! User preference record consumed by the filter and the scorer

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors building a preference record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreferenceError {
    #[error("Unknown employment type '{0}'. Expected salaried or self-employed")]
    UnknownEmployment(String),

    #[error("Unknown preference '{0}'")]
    UnknownPreference(String),

    #[error("At least one spending category is required")]
    NoCategories,

    #[error("At least one preference is required")]
    NoPreferences,
}

/// Employment type, which selects the applicable income threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Employment {
    Salaried,
    SelfEmployed,
}

impl Employment {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Salaried => "salaried",
            Self::SelfEmployed => "self-employed",
        }
    }
}

impl fmt::Display for Employment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Employment {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', ' '], "-").as_str() {
            "salaried" => Ok(Self::Salaried),
            "self-employed" | "selfemployed" => Ok(Self::SelfEmployed),
            _ => Err(PreferenceError::UnknownEmployment(s.to_string())),
        }
    }
}

/// Controlled vocabulary of card features a user can prioritize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum Preference {
    Cashback,
    TravelRewards,
    LowFees,
    LoungeAccess,
    FuelSurchargeWaiver,
    MovieBenefits,
    DiningDiscounts,
    RailwayBenefits,
    InsuranceCoverage,
    MilestoneRewards,
    WelcomeBenefits,
    NoAnnualFee,
}

impl Preference {
    /// Menu order used by the interactive collector
    pub const ALL: [Preference; 12] = [
        Self::Cashback,
        Self::TravelRewards,
        Self::LowFees,
        Self::LoungeAccess,
        Self::FuelSurchargeWaiver,
        Self::MovieBenefits,
        Self::DiningDiscounts,
        Self::RailwayBenefits,
        Self::InsuranceCoverage,
        Self::MilestoneRewards,
        Self::WelcomeBenefits,
        Self::NoAnnualFee,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cashback => "cashback",
            Self::TravelRewards => "travel rewards",
            Self::LowFees => "low fees",
            Self::LoungeAccess => "lounge access",
            Self::FuelSurchargeWaiver => "fuel surcharge waiver",
            Self::MovieBenefits => "movie benefits",
            Self::DiningDiscounts => "dining discounts",
            Self::RailwayBenefits => "railway benefits",
            Self::InsuranceCoverage => "insurance coverage",
            Self::MilestoneRewards => "milestone rewards",
            Self::WelcomeBenefits => "welcome benefits",
            Self::NoAnnualFee => "no annual fee",
        }
    }
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Preference {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['_', '-'], " ");
        Self::ALL
            .into_iter()
            .find(|p| p.label() == wanted)
            .ok_or_else(|| PreferenceError::UnknownPreference(s.to_string()))
    }
}

impl From<Preference> for &'static str {
    fn from(p: Preference) -> Self {
        p.label()
    }
}

impl TryFrom<String> for Preference {
    type Error = PreferenceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Structured preferences collected once per session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub employment: Employment,
    /// Annual income in absolute currency units
    pub income: u64,
    pub categories: Vec<String>,
    pub preferences: Vec<Preference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_bank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_score: Option<u32>,
}

impl UserPreferences {
    pub fn new(employment: Employment, income: u64) -> Self {
        Self {
            employment,
            income,
            categories: Vec::new(),
            preferences: Vec::new(),
            preferred_bank: None,
            credit_score: None,
        }
    }

    /// Set spending categories; duplicates (ignoring case) and blanks are dropped
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.clear();
        for category in categories {
            let category = category.into().trim().to_string();
            if !category.is_empty() && !self.categories.iter().any(|c| c.eq_ignore_ascii_case(&category)) {
                self.categories.push(category);
            }
        }
        self
    }

    /// Set prioritized features; duplicates are dropped
    pub fn with_preferences(mut self, preferences: impl IntoIterator<Item = Preference>) -> Self {
        self.preferences.clear();
        for preference in preferences {
            if !self.preferences.contains(&preference) {
                self.preferences.push(preference);
            }
        }
        self
    }

    pub fn with_bank(mut self, bank: impl Into<String>) -> Self {
        let bank = bank.into().trim().to_string();
        self.preferred_bank = if bank.is_empty() { None } else { Some(bank) };
        self
    }

    pub fn with_credit_score(mut self, score: u32) -> Self {
        self.credit_score = Some(score);
        self
    }

    /// Check the record has what the scorer needs
    pub fn validate(&self) -> Result<(), PreferenceError> {
        if self.categories.is_empty() {
            return Err(PreferenceError::NoCategories);
        }
        if self.preferences.is_empty() {
            return Err(PreferenceError::NoPreferences);
        }
        Ok(())
    }

    pub fn wants(&self, preference: Preference) -> bool {
        self.preferences.contains(&preference)
    }

    /// True if the user asked for low or waived fees
    pub fn wants_fee_waiver(&self) -> bool {
        self.wants(Preference::LowFees) || self.wants(Preference::NoAnnualFee)
    }

    /// True if the preferred bank is a case-insensitive substring of `institution`
    pub fn banks_with(&self, institution: &str) -> bool {
        self.preferred_bank
            .as_deref()
            .is_some_and(|bank| institution.to_uppercase().contains(&bank.to_uppercase()))
    }

    /// Categories lowercased for matching
    pub fn categories_lower(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.to_lowercase()).collect()
    }
}
