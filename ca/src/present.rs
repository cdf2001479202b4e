//! Console presentation
//!
//! Formatting is kept in plain `String`-returning functions so it can be
//! tested; the `print_*` wrappers add colour and write to stdout.

use cardrank::eligibility::{IncomeBasis, income_requirement};
use cardrank::{ANNUAL_FEE, Card, Employment, JOINING_FEE, Resolution, ScoredCard, UserPreferences};
use colored::Colorize;

const NOT_SPECIFIED: &str = "Not specified";

/// Group digits in threes: 1200000 -> 1,200,000
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

pub fn rupees(amount: u64) -> String {
    format!("₹{}", format_amount(amount))
}

/// Profile summary lines
pub fn profile_lines(prefs: &UserPreferences) -> Vec<String> {
    let mut lines = vec![
        format!("Your Profile: {} with {} income", prefs.employment, rupees(prefs.income)),
        format!("Preferred Categories: {}", prefs.categories.join(", ")),
        format!(
            "Priority: {}",
            prefs.preferences.iter().map(|p| p.label()).collect::<Vec<_>>().join(", ")
        ),
    ];
    if let Some(bank) = &prefs.preferred_bank {
        lines.push(format!("Preferred Bank: {}", bank));
    }
    if let Some(score) = prefs.credit_score {
        lines.push(format!("Credit Score: {}", score));
    }
    lines
}

/// Label/value pairs for the key details block
pub fn detail_rows(card: &Card, employment: Employment) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        (
            "Joining Fee",
            card.fee_summary(JOINING_FEE).unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        ),
        (
            "Annual Fee",
            card.fee_summary(ANNUAL_FEE).unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        ),
    ];

    if let Some(rate) = card.interest_rate.as_deref().filter(|r| !r.trim().is_empty()) {
        rows.push(("Interest Rate", rate.to_string()));
    }

    if let Some((basis, min)) = income_requirement(card, employment) {
        let value = match basis {
            IncomeBasis::Any => rupees(min),
            other => format!("{} ({})", rupees(min), other.label()),
        };
        rows.push(("Min Income", value));
    }

    let bank = if card.bank_customer_only {
        format!("Required ({} customer)", card.institution)
    } else {
        "Not required".to_string()
    };
    rows.push(("Bank Account", bank));
    rows
}

/// One line per shortlisted card: rank, name, issuer and score
pub fn shortlist_lines(cards: &[ScoredCard<'_>], current: Option<&Card>) -> Vec<String> {
    let name_width = cards.iter().map(|s| s.card.name.chars().count()).max().unwrap_or(0);
    cards
        .iter()
        .enumerate()
        .map(|(i, scored)| {
            let marker = if current == Some(scored.card) { "*" } else { " " };
            format!(
                "{marker}{:>2}. {:<name_width$}  {:<20} {:>3} pts",
                i + 1,
                scored.card.name,
                scored.card.institution,
                scored.score,
            )
        })
        .collect()
}

/// Rule-by-rule explanation of a score
pub fn breakdown_lines(scored: &ScoredCard<'_>) -> Vec<String> {
    if scored.breakdown.is_empty() {
        return vec!["No scoring rules matched; shown because nothing else was available.".to_string()];
    }
    let mut lines: Vec<String> = scored
        .breakdown
        .iter()
        .map(|(rule, points)| format!("  +{:<3} {}", points, rule.label()))
        .collect();
    lines.push(format!("  = {} total", scored.score));
    lines
}

pub fn print_profile(prefs: &UserPreferences) {
    println!("{}", "Analyzing credit cards for your profile...".dimmed());
    for line in profile_lines(prefs) {
        println!("{}", line);
    }
}

pub fn print_fallback_notice() {
    println!("\n{}", "No exact matches found. Expanding search criteria...".yellow());
}

pub fn print_candidate_count(count: usize) {
    println!("\nFound {} eligible cards.", count);
    println!("{}", "Ranking cards based on your preferences...".dimmed());
}

pub fn print_shortlist(cards: &[ScoredCard<'_>], current: Option<&Card>) {
    println!();
    println!("{}", "Shortlist:".bright_cyan());
    for line in shortlist_lines(cards, current) {
        println!("{}", line);
    }
    println!();
}

pub fn print_recommendation(resolution: &Resolution<'_>, heading: &str) {
    let rule = "=".repeat(50);
    println!("\n{}", rule);
    println!("{}", heading.bright_cyan().bold());
    println!("{}", rule);
    println!("\nCard: {}", resolution.card.name.bold());
    println!("Issuer: {}", resolution.card.institution);
    println!("\n{}\n", resolution.rationale);
}

pub fn print_card_details(card: &Card, employment: Employment) {
    println!("{}", "KEY DETAILS:".bold());
    println!("{}", "-".repeat(25));
    for (label, value) in detail_rows(card, employment) {
        println!("{}: {}", label, value);
    }
    println!();
}

pub fn print_breakdown(scored: &ScoredCard<'_>) {
    println!("\n{} {}", "Why".bright_cyan(), scored.card.name.bold());
    for line in breakdown_lines(scored) {
        println!("{}", line);
    }
    println!();
}

pub fn print_reply(text: &str) {
    println!("\n{}\n", text);
}

pub fn print_notice(text: &str) {
    println!("{}", text.dimmed());
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardrank::{Descriptor, Preference, Rule};

    fn sample_card() -> Card {
        let mut card = Card::new("Regalia", "HDFC Bank");
        card.fees = vec![
            Descriptor::structured(JOINING_FEE, &["₹2,500", "plus GST"]),
            Descriptor::structured(ANNUAL_FEE, &["Waived on spends of ₹3 lakh"]),
        ];
        card.interest_rate = Some("3.6% per month".to_string());
        card.income_min.salaried = Some(1_200_000);
        card.income_min.any = Some(1_500_000);
        card
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(1000), "1,000");
        assert_eq!(format_amount(1_200_000), "1,200,000");
        assert_eq!(rupees(450_000), "₹450,000");
    }

    #[test]
    fn test_detail_rows_salaried_branch() {
        let rows = detail_rows(&sample_card(), Employment::Salaried);
        assert_eq!(rows[0], ("Joining Fee", "₹2,500, plus GST".to_string()));
        assert_eq!(rows[1], ("Annual Fee", "Waived on spends of ₹3 lakh".to_string()));
        assert_eq!(rows[2], ("Interest Rate", "3.6% per month".to_string()));
        assert_eq!(rows[3], ("Min Income", "₹1,200,000 (Salaried)".to_string()));
        assert_eq!(rows[4], ("Bank Account", "Not required".to_string()));
    }

    #[test]
    fn test_detail_rows_falls_back_to_any_threshold() {
        let mut card = sample_card();
        card.bank_customer_only = true;
        card.fees.clear();
        card.interest_rate = None;

        let rows = detail_rows(&card, Employment::SelfEmployed);
        assert_eq!(rows[0].1, NOT_SPECIFIED);
        assert_eq!(rows[1].1, NOT_SPECIFIED);
        assert_eq!(rows[2], ("Min Income", "₹1,500,000".to_string()));
        assert_eq!(rows[3], ("Bank Account", "Required (HDFC Bank customer)".to_string()));
    }

    #[test]
    fn test_profile_lines() {
        let prefs = UserPreferences::new(Employment::SelfEmployed, 800_000)
            .with_categories(["Travel", "Dining"])
            .with_preferences([Preference::LoungeAccess, Preference::NoAnnualFee])
            .with_bank("Axis Bank");

        let lines = profile_lines(&prefs);
        assert_eq!(lines[0], "Your Profile: self-employed with ₹800,000 income");
        assert_eq!(lines[1], "Preferred Categories: Travel, Dining");
        assert_eq!(lines[2], "Priority: lounge access, no annual fee");
        assert_eq!(lines[3], "Preferred Bank: Axis Bank");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_shortlist_lines_mark_current() {
        let a = Card::new("Alpha", "Bank A");
        let b = Card::new("Beta Long Name", "Bank B");
        let scored = vec![
            ScoredCard {
                card: &a,
                score: 40,
                breakdown: vec![],
            },
            ScoredCard {
                card: &b,
                score: 15,
                breakdown: vec![],
            },
        ];

        let lines = shortlist_lines(&scored, Some(&b));
        assert!(lines[0].starts_with("  1. Alpha"));
        assert!(lines[0].ends_with(" 40 pts"));
        assert!(lines[1].starts_with("* 2. Beta Long Name"));
    }

    #[test]
    fn test_breakdown_lines() {
        let card = Card::new("Alpha", "Bank A");
        let scored = ScoredCard {
            card: &card,
            score: 33,
            breakdown: vec![(Rule::ExactCategory, 15), (Rule::Feature(Preference::LoungeAccess), 18)],
        };
        let lines = breakdown_lines(&scored);
        assert_eq!(lines[0], "  +15  category match");
        assert_eq!(lines[1], "  +18  lounge access");
        assert_eq!(lines[2], "  = 33 total");

        let unscored = ScoredCard::unscored(&card);
        assert_eq!(breakdown_lines(&unscored).len(), 1);
    }
}
