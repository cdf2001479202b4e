//! Parsers for free-text collaborator replies
//!
//! The explainer answers with `RECOMMENDED CARD:` / `EXPLANATION:` lines and the
//! conversation service may embed a single `SWITCH_TO:` or `FETCH_LINK:`
//! directive. Anything that does not match is ignored.

const NAME_MARKERS: &[&str] = &["RECOMMENDED CARD:", "RECOMMENDED_CARD:", "ALTERNATIVE CARD:"];
const RATIONALE_MARKERS: &[&str] = &["EXPLANATION:", "PRESENTATION:", "WHY THIS IS BETTER:"];

const SWITCH_MARKER: &str = "SWITCH_TO:";
const FETCH_MARKER: &str = "FETCH_LINK:";

/// Card named by the explainer, with its rationale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pick {
    pub name: String,
    pub rationale: Option<String>,
}

/// Read the picked card name and rationale from an explainer reply
///
/// Returns `None` when no non-empty card name line is present. The last
/// occurrence of each marker wins.
pub fn parse_pick(text: &str) -> Option<Pick> {
    let mut name = None;
    let mut rationale = None;

    for line in text.lines().map(str::trim) {
        if let Some(value) = strip_any(line, NAME_MARKERS) {
            name = Some(value);
        } else if let Some(value) = strip_any(line, RATIONALE_MARKERS) {
            rationale = Some(value);
        }
    }

    let name = name.filter(|n| !n.is_empty())?;
    Some(Pick {
        name,
        rationale: rationale.filter(|r| !r.is_empty()),
    })
}

fn strip_any(line: &str, markers: &[&str]) -> Option<String> {
    markers
        .iter()
        .find_map(|m| line.strip_prefix(m))
        .map(|rest| clean_argument(rest).to_string())
}

/// Directive embedded in a conversation reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Switch(String),
    FetchLink(String),
    None,
}

impl Command {
    fn marker(&self) -> Option<&'static str> {
        match self {
            Self::Switch(_) => Some(SWITCH_MARKER),
            Self::FetchLink(_) => Some(FETCH_MARKER),
            Self::None => None,
        }
    }
}

/// Find the directive in a conversation reply
///
/// `SWITCH_TO:` is checked before `FETCH_LINK:`. The argument runs to the end
/// of the line and is trimmed of brackets and quotes; an empty argument means
/// no command.
pub fn parse_command(text: &str) -> Command {
    if let Some(arg) = argument_after(text, SWITCH_MARKER) {
        return Command::Switch(arg);
    }
    if let Some(arg) = argument_after(text, FETCH_MARKER) {
        return Command::FetchLink(arg);
    }
    Command::None
}

fn argument_after(text: &str, marker: &str) -> Option<String> {
    let (_, rest) = text.split_once(marker)?;
    let line = rest.lines().next().unwrap_or_default();
    let arg = clean_argument(line);
    if arg.is_empty() { None } else { Some(arg.to_string()) }
}

fn clean_argument(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c: char| matches!(c, '[' | ']' | '"' | '\'' | '`' | '<' | '>'))
        .trim()
}

/// Remove the line carrying `command` from `text`
///
/// Other lines are kept as-is; surrounding blank space is trimmed.
pub fn strip_command(text: &str, command: &Command) -> String {
    let Some(marker) = command.marker() else {
        return text.trim().to_string();
    };

    let mut removed = false;
    let kept: Vec<&str> = text
        .lines()
        .filter_map(|line| {
            if removed {
                return Some(line);
            }
            match line.find(marker) {
                Some(idx) => {
                    removed = true;
                    let before = line[..idx].trim_end();
                    if before.is_empty() { None } else { Some(before) }
                }
                None => Some(line),
            }
        })
        .collect();

    kept.join("\n").trim().to_string()
}
