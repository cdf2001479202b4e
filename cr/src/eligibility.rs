//! Eligibility filter
//!
//! Removes cards the user cannot obtain (income, credit score, bank-customer
//! gate) or has excluded by institution. Catalog order is preserved.

use thiserror::Error;
use tracing::{debug, warn};

use crate::card::Card;
use crate::prefs::{Employment, UserPreferences};

/// Number of catalog cards substituted when nothing is eligible
pub const DEFAULT_FALLBACK_SIZE: usize = 20;

/// Which income threshold a card's requirement was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomeBasis {
    Salaried,
    SelfEmployed,
    Any,
}

impl IncomeBasis {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Salaried => "Salaried",
            Self::SelfEmployed => "Self-employed",
            Self::Any => "Any",
        }
    }
}

/// Reason a card was filtered out
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ineligible {
    #[error("institution {0} is excluded")]
    ExcludedInstitution(String),

    #[error("income below the {} minimum of {required}", .basis.label())]
    IncomeBelow { required: u64, basis: IncomeBasis },

    #[error("credit score below the minimum of {required}")]
    CreditScoreBelow { required: u32 },

    #[error("card is only offered to existing bank customers")]
    BankCustomerOnly,
}

/// The single income threshold that applies to this user
///
/// Employment-specific thresholds take precedence over the `any` threshold;
/// `None` means the card states no applicable minimum.
pub fn income_requirement(card: &Card, employment: Employment) -> Option<(IncomeBasis, u64)> {
    let thresholds = &card.income_min;
    match (employment, thresholds.salaried, thresholds.self_employed) {
        (Employment::Salaried, Some(min), _) => Some((IncomeBasis::Salaried, min)),
        (Employment::SelfEmployed, _, Some(min)) => Some((IncomeBasis::SelfEmployed, min)),
        _ => thresholds.any.map(|min| (IncomeBasis::Any, min)),
    }
}

/// Check one card, reporting the first failed rule
pub fn eligibility(card: &Card, prefs: &UserPreferences, excluded: &[String]) -> Result<(), Ineligible> {
    if excluded.iter().any(|i| *i == card.institution) {
        return Err(Ineligible::ExcludedInstitution(card.institution.clone()));
    }

    if let Some((basis, required)) = income_requirement(card, prefs.employment)
        && prefs.income < required
    {
        return Err(Ineligible::IncomeBelow { required, basis });
    }

    if let (Some(score), Some(required)) = (prefs.credit_score, card.minimum_credit_score)
        && score < required
    {
        return Err(Ineligible::CreditScoreBelow { required });
    }

    if card.bank_customer_only && !prefs.banks_with(&card.institution) {
        return Err(Ineligible::BankCustomerOnly);
    }

    Ok(())
}

pub fn is_eligible(card: &Card, prefs: &UserPreferences, excluded: &[String]) -> bool {
    eligibility(card, prefs, excluded).is_ok()
}

/// Eligible cards, in catalog order
pub fn filter<'a>(catalog: &'a [Card], prefs: &UserPreferences, excluded: &[String]) -> Vec<&'a Card> {
    debug!(catalog = catalog.len(), excluded = excluded.len(), "filter: called");
    catalog
        .iter()
        .filter(|card| match eligibility(card, prefs, excluded) {
            Ok(()) => true,
            Err(reason) => {
                debug!(card = %card.name, %reason, "filter: ineligible");
                false
            }
        })
        .collect()
}

/// Cards handed to the scorer, with a flag for the widened fallback
#[derive(Debug, Clone)]
pub struct Candidates<'a> {
    pub cards: Vec<&'a Card>,
    /// True when nothing was eligible and the catalog head was used instead
    pub fallback_used: bool,
}

/// Filter the catalog, widening to the first `fallback_size` cards when empty
///
/// The fallback ignores income, credit score and the bank gate but still
/// honours excluded institutions, so a rejected issuer never comes back.
pub fn shortlist_candidates<'a>(
    catalog: &'a [Card],
    prefs: &UserPreferences,
    excluded: &[String],
    fallback_size: usize,
) -> Candidates<'a> {
    let cards = filter(catalog, prefs, excluded);
    if !cards.is_empty() {
        return Candidates {
            cards,
            fallback_used: false,
        };
    }

    let cards: Vec<&Card> = catalog
        .iter()
        .filter(|card| !excluded.contains(&card.institution))
        .take(fallback_size)
        .collect();
    warn!(fallback = cards.len(), "shortlist_candidates: no eligible cards, widening");
    Candidates {
        cards,
        fallback_used: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::IncomeThresholds;

    fn card(name: &str, institution: &str) -> Card {
        Card::new(name, institution)
    }

    fn with_income(mut c: Card, salaried: Option<u64>, self_employed: Option<u64>, any: Option<u64>) -> Card {
        c.income_min = IncomeThresholds {
            salaried,
            self_employed,
            any,
        };
        c
    }

    fn salaried(income: u64) -> UserPreferences {
        UserPreferences::new(Employment::Salaried, income)
    }

    #[test]
    fn test_income_boundary_is_inclusive() {
        let c = with_income(card("A", "X Bank"), Some(300_000), None, None);
        assert!(is_eligible(&c, &salaried(300_000), &[]));
        assert_eq!(
            eligibility(&c, &salaried(299_999), &[]),
            Err(Ineligible::IncomeBelow {
                required: 300_000,
                basis: IncomeBasis::Salaried
            })
        );
    }

    #[test]
    fn test_employment_threshold_takes_precedence_over_any() {
        let c = with_income(card("A", "X Bank"), Some(200_000), Some(900_000), Some(500_000));

        // Salaried uses the lower salaried threshold, not "any"
        assert!(is_eligible(&c, &salaried(250_000), &[]));

        // Self-employed uses its own, higher threshold
        let se = UserPreferences::new(Employment::SelfEmployed, 600_000);
        assert!(!is_eligible(&c, &se, &[]));
    }

    #[test]
    fn test_any_threshold_when_no_specific_one() {
        let c = with_income(card("A", "X Bank"), Some(200_000), None, Some(500_000));
        let se = UserPreferences::new(Employment::SelfEmployed, 400_000);
        assert_eq!(income_requirement(&c, Employment::SelfEmployed), Some((IncomeBasis::Any, 500_000)));
        assert!(!is_eligible(&c, &se, &[]));
    }

    #[test]
    fn test_no_threshold_is_eligible() {
        assert!(is_eligible(&card("A", "X Bank"), &salaried(0), &[]));
    }

    #[test]
    fn test_credit_score() {
        let mut c = card("A", "X Bank");
        c.minimum_credit_score = Some(750);

        assert!(is_eligible(&c, &salaried(0), &[]), "unknown user score is eligible");
        assert!(is_eligible(&c, &salaried(0).with_credit_score(750), &[]));
        assert_eq!(
            eligibility(&c, &salaried(0).with_credit_score(700), &[]),
            Err(Ineligible::CreditScoreBelow { required: 750 })
        );
    }

    #[test]
    fn test_bank_customer_only() {
        let mut c = card("A", "HDFC Bank");
        c.bank_customer_only = true;

        assert_eq!(eligibility(&c, &salaried(10_000_000), &[]), Err(Ineligible::BankCustomerOnly));
        assert!(is_eligible(&c, &salaried(0).with_bank("hdfc"), &[]));
        assert!(!is_eligible(&c, &salaried(0).with_bank("icici"), &[]));
    }

    #[test]
    fn test_excluded_institution() {
        let catalog = vec![card("A", "HDFC Bank"), card("B", "SBI Card"), card("C", "HDFC Bank")];
        let excluded = vec!["HDFC Bank".to_string()];
        let result = filter(&catalog, &salaried(0), &excluded);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "B");
    }

    #[test]
    fn test_filter_preserves_catalog_order() {
        let catalog = vec![card("C", "X"), card("A", "Y"), card("B", "Z")];
        let names: Vec<_> = filter(&catalog, &salaried(0), &[]).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_fallback_when_nothing_eligible() {
        let catalog: Vec<Card> = (0..30)
            .map(|i| with_income(card(&format!("Card {i}"), &format!("Bank {}", i % 3)), Some(10_000_000), None, None))
            .collect();

        let candidates = shortlist_candidates(&catalog, &salaried(100), &[], DEFAULT_FALLBACK_SIZE);
        assert!(candidates.fallback_used);
        assert_eq!(candidates.cards.len(), 20);
        assert_eq!(candidates.cards[0].name, "Card 0");

        let excluded = vec!["Bank 0".to_string()];
        let candidates = shortlist_candidates(&catalog, &salaried(100), &excluded, DEFAULT_FALLBACK_SIZE);
        assert!(candidates.cards.iter().all(|c| c.institution != "Bank 0"));
    }

    #[test]
    fn test_no_fallback_when_something_eligible() {
        let catalog = vec![card("A", "X Bank")];
        let candidates = shortlist_candidates(&catalog, &salaried(0), &[], DEFAULT_FALLBACK_SIZE);
        assert!(!candidates.fallback_used);
        assert_eq!(candidates.cards.len(), 1);
    }
}
