//! Interactive preference collection
//!
//! The parsers here are pure; `PreferenceCollector` wires them to rustyline
//! prompts and re-asks until each required answer is usable.

use cardrank::{Employment, Preference, UserPreferences};
use colored::Colorize;
use eyre::{Result, eyre};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, info};

/// Spending categories offered in the menu, matched against card badges
pub const CATEGORIES: [&str; 16] = [
    "Travel",
    "Shopping",
    "Dining",
    "Fuel",
    "Entertainment",
    "Online",
    "Premium",
    "Rewards",
    "Lifestyle",
    "Co-branded",
    "Movies",
    "Business",
    "Secured",
    "Cashback",
    "Lounge Access",
    "Railway",
];

/// Rupees per lakh
pub const LAKH: f64 = 100_000.0;

const CATEGORY_COLUMNS: usize = 4;
const CATEGORY_WIDTH: usize = 15;
const PREFERENCE_COLUMNS: usize = 3;
const PREFERENCE_WIDTH: usize = 21;

/// Parse `salaried` or `self-employed`
pub fn parse_employment(input: &str) -> Option<Employment> {
    input.parse().ok()
}

/// Parse an annual income given in lakhs into rupees
///
/// Fractions are allowed (`7.5` is 750,000); negative or non-numeric input is
/// rejected.
pub fn parse_income_lakhs(input: &str) -> Option<u64> {
    let lakhs: f64 = input.trim().parse().ok()?;
    if !lakhs.is_finite() || lakhs < 0.0 {
        return None;
    }
    Some((lakhs * LAKH) as u64)
}

/// Pick menu entries from a comma-separated list of 1-based numbers
///
/// Unknown numbers and junk are ignored; duplicates are kept once, in the
/// order first given.
pub fn parse_selection<T: Copy + PartialEq>(input: &str, options: &[T]) -> Vec<T> {
    let mut selected = Vec::new();
    for item in input.split(',') {
        let Ok(n) = item.trim().parse::<usize>() else {
            continue;
        };
        if let Some(&option) = n.checked_sub(1).and_then(|i| options.get(i))
            && !selected.contains(&option)
        {
            selected.push(option);
        }
    }
    selected
}

/// Optional credit score; blank or unparseable input is skipped
pub fn parse_credit_score(input: &str) -> Option<u32> {
    input.trim().parse().ok()
}

/// Optional free-text answer; blank means none
pub fn parse_optional(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

/// `travel rewards` -> `Travel Rewards`
pub fn title_case(label: &str) -> String {
    label
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Numbered menu drawn as a box table, `columns` entries per row
pub fn menu_table(heading: &str, items: &[String], columns: usize, width: usize) -> String {
    let border = |left: &str, mid: &str, right: &str| {
        let cell = format!("{}{}{}", "─".repeat(5), mid, "─".repeat(width + 2));
        let cells = vec![cell; columns].join(mid);
        format!("{left}{cells}{right}")
    };

    let mut lines = vec![border("┌", "┬", "┐")];

    let header = format!("│ No. │ {heading:^width$} │");
    lines.push(format!("│{}", header[3..].repeat(columns)));
    lines.push(border("├", "┼", "┤"));

    for (row_idx, row) in items.chunks(columns).enumerate() {
        let mut line = String::from("│");
        for col in 0..columns {
            match row.get(col) {
                Some(item) => {
                    let number = row_idx * columns + col + 1;
                    line.push_str(&format!(" {number:>2}. │ {item:<width$} │"));
                }
                None => line.push_str(&format!("     │ {:width$} │", "")),
            }
        }
        lines.push(line);
    }

    lines.push(border("└", "┴", "┘"));
    lines.join("\n")
}

pub fn category_menu() -> String {
    let items: Vec<String> = CATEGORIES.iter().map(|c| c.to_string()).collect();
    menu_table("Category", &items, CATEGORY_COLUMNS, CATEGORY_WIDTH)
}

pub fn preference_menu() -> String {
    let items: Vec<String> = Preference::ALL.iter().map(|p| title_case(p.label())).collect();
    menu_table("Preference", &items, PREFERENCE_COLUMNS, PREFERENCE_WIDTH)
}

/// Asks the intake questions on the terminal
pub struct PreferenceCollector {
    rl: DefaultEditor,
}

impl PreferenceCollector {
    pub fn new() -> Result<Self> {
        let rl = DefaultEditor::new().map_err(|e| eyre!("Failed to initialize readline: {}", e))?;
        Ok(Self { rl })
    }

    /// Run the full questionnaire
    pub fn collect(&mut self) -> Result<UserPreferences> {
        debug!("collect: called");
        println!("{}\n", "CREDIT CARD ADVISOR - FIND YOUR PERFECT CREDIT CARD".bright_cyan().bold());
        println!("Let me ask you a few quick questions to find your perfect credit card.\n");

        let employment = self.ask_until(
            "Are you salaried or self-employed? (salaried/self-employed): ",
            "Please enter 'salaried' or 'self-employed'",
            parse_employment,
        )?;

        let income = self.ask_until(
            "What's your annual income in lakhs? (e.g., 5, 10, 15): ",
            "Please enter a valid number (e.g., 5 for 5 lakhs)",
            parse_income_lakhs,
        )?;

        println!("\nWhat are your main spending categories? (Select multiple by entering numbers separated by commas)\n");
        println!("{}", category_menu());
        let categories = self.ask_until(
            "Enter your choices (e.g., 1,3,4): ",
            "Please select at least one valid category",
            |input| non_empty(parse_selection(input, &CATEGORIES)),
        )?;

        println!("\nWhat's most important to you? (Select multiple by entering numbers separated by commas)\n");
        println!("{}", preference_menu());
        let preferences = self.ask_until(
            "Enter your choices (e.g., 1,3,5): ",
            "Please select at least one valid preference",
            |input| non_empty(parse_selection(input, &Preference::ALL)),
        )?;

        let mut prefs = UserPreferences::new(employment, income)
            .with_categories(categories)
            .with_preferences(preferences);

        if let Some(bank) = parse_optional(&self.ask("\nDo you have a preferred bank? (optional, press Enter to skip): ")?) {
            prefs = prefs.with_bank(bank);
        }
        if let Some(score) =
            parse_credit_score(&self.ask("What's your approximate credit score? (optional, press Enter to skip): ")?)
        {
            prefs = prefs.with_credit_score(score);
        }

        info!(employment = %prefs.employment, income = prefs.income, "collect: preferences collected");
        Ok(prefs)
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        match self.rl.readline(prompt) {
            Ok(line) => Ok(line),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Err(eyre!("Preference collection cancelled")),
            Err(err) => Err(eyre!("Readline error: {}", err)),
        }
    }

    fn ask_until<T>(&mut self, prompt: &str, retry: &str, parse: impl Fn(&str) -> Option<T>) -> Result<T> {
        loop {
            let line = self.ask(prompt)?;
            if let Some(value) = parse(&line) {
                return Ok(value);
            }
            println!("{}", retry.yellow());
        }
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}
