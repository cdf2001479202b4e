//! Embedded fallback prompts
//!
//! Compiled into the binary and used when no override file is found.

pub const RECOMMEND: &str = include_str!("../../prompts/recommend.pmt");

pub const CONVERSATION: &str = include_str!("../../prompts/conversation.pmt");

/// Follow-up answer with fetched page text
pub const FOLLOWUP_WEB: &str = include_str!("../../prompts/followup-web.pmt");

/// Follow-up answer from catalog data only
pub const FOLLOWUP_CATALOG: &str = include_str!("../../prompts/followup-catalog.pmt");

pub const GOODBYE: &str = include_str!("../../prompts/goodbye.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    match name {
        "recommend" => Some(RECOMMEND),
        "conversation" => Some(CONVERSATION),
        "followup-web" => Some(FOLLOWUP_WEB),
        "followup-catalog" => Some(FOLLOWUP_CATALOG),
        "goodbye" => Some(GOODBYE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_prompts_embedded() {
        for name in ["recommend", "conversation", "followup-web", "followup-catalog", "goodbye"] {
            let content = get_embedded(name);
            assert!(content.is_some_and(|c| !c.trim().is_empty()), "Missing embedded prompt: {}", name);
        }
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }

    #[test]
    fn test_reply_formats_documented() {
        assert!(RECOMMEND.contains("RECOMMENDED CARD:"));
        assert!(RECOMMEND.contains("EXPLANATION:"));
        assert!(CONVERSATION.contains("SWITCH_TO:"));
        assert!(CONVERSATION.contains("FETCH_LINK:"));
    }
}
