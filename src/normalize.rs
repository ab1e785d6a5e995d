//! Shared normalization helpers for heterogeneous source payloads.
//!
//! All "missing segment" and "missing key" defaulting lives here so the
//! discovery and enrichment engines only ever see cleaned values.

use crate::models::{DiscoveryStrategy, LeadRecord, UNKNOWN};
use regex::Regex;
use std::sync::OnceLock;

/// Topic used when the role reduces to something too short to search on.
pub const DEFAULT_TOPIC: &str = "Toxicity";
/// Topics with fewer characters than this fall back to [`DEFAULT_TOPIC`].
/// Three-letter leftovers such as "CEO" or "R&D" fall back too.
pub const MIN_TOPIC_CHARS: usize = 4;
/// Keyword paired with a lead's name when probing for recent papers.
pub const DEFAULT_INTENT_KEYWORD: &str = "toxicity";
/// Title tag carried by every lead produced by the academic fallback.
pub const LEAD_RESEARCHER: &str = "Lead Researcher";

const ROLE_NOISE: [&str; 3] = ["Director of ", "Head of ", "Scientist"];

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

fn location_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\blocation:\s*([^·|\n]+)").expect("location pattern is valid"))
}

fn funding_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)million|raised").expect("funding pattern is valid"))
}

/// Trims and collapses internal whitespace runs to a single space.
pub fn clean(value: &str) -> String {
    whitespace_re().replace_all(value.trim(), " ").into_owned()
}

/// Cleans an optional value, mapping blanks to `None`.
pub fn clean_opt(value: Option<&str>) -> Option<String> {
    value.map(clean).filter(|v| !v.is_empty())
}

/// Drops everything from the first `|` on ("Acme | LinkedIn" -> "Acme").
fn before_pipe(segment: &str) -> String {
    clean(segment.split('|').next().unwrap_or_default())
}

/// Lead fields parsed from a search-result title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedProfile {
    pub name: String,
    pub title: String,
    pub company: String,
}

/// Parses a `"Name - Title - Company | extra"` result title.
///
/// Missing segments degrade to the query role (title) or `"Unknown"`
/// (company). Returns `None` when no usable name remains.
pub fn parse_composite_title(raw: &str, role: &str) -> Option<ParsedProfile> {
    let parts: Vec<&str> = raw.split(" - ").collect();

    let (name, title, company) = match parts.as_slice() {
        [name, title, company, ..] => (clean(name), clean(title), before_pipe(company)),
        [name, title] => (clean(name), before_pipe(title), UNKNOWN.to_string()),
        [name] => (before_pipe(name), clean(role), UNKNOWN.to_string()),
        [] => return None,
    };

    if name.is_empty() {
        return None;
    }

    Some(ParsedProfile {
        name,
        title: if title.is_empty() { clean(role) } else { title },
        company: if company.is_empty() {
            UNKNOWN.to_string()
        } else {
            company
        },
    })
}

/// Parses a `"Name - Title"` result title; the company is never resolved.
pub fn parse_simple_title(raw: &str, role: &str) -> Option<ParsedProfile> {
    let mut parts = raw.split(" - ");
    let name = before_pipe(parts.next().unwrap_or_default());
    if name.is_empty() {
        return None;
    }
    let title = parts
        .next()
        .map(before_pipe)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| clean(role));

    Some(ParsedProfile {
        name,
        title,
        company: UNKNOWN.to_string(),
    })
}

impl ParsedProfile {
    pub fn into_lead(self, location: &str, strategy: DiscoveryStrategy) -> LeadRecord {
        let mut lead = LeadRecord::new(self.name, self.company)
            .with_title(self.title)
            .with_strategy(strategy);
        lead.location = clean_opt(Some(location));
        lead
    }
}

/// Reduces a job role to a searchable research topic.
///
/// Strips every `"Director of "`, `"Head of "` and `"Scientist"`, trims, and
/// falls back to [`DEFAULT_TOPIC`] when too little is left.
pub fn derive_topic(role: &str) -> String {
    let mut topic = role.to_string();
    for noise in ROLE_NOISE {
        topic = topic.replace(noise, "");
    }
    let topic = clean(&topic);
    if topic.chars().count() < MIN_TOPIC_CHARS {
        DEFAULT_TOPIC.to_string()
    } else {
        topic
    }
}

/// Title given to every academic-fallback lead.
pub fn researcher_title(topic: &str) -> String {
    format!("{} ({})", LEAD_RESEARCHER, topic)
}

/// Keyword paired with a lead's name for the scientific-intent query.
pub fn intent_keyword(role: Option<&str>) -> String {
    match role.map(clean).filter(|r| !r.is_empty()) {
        Some(role) if !role.to_lowercase().contains(DEFAULT_INTENT_KEYWORD) => role,
        _ => DEFAULT_INTENT_KEYWORD.to_string(),
    }
}

/// Pulls the `Location: ...` fragment profile search snippets carry.
pub fn extract_location(snippet: &str) -> Option<String> {
    location_re()
        .captures(snippet)
        .and_then(|caps| caps.get(1))
        .map(|m| clean(m.as_str()))
        .filter(|loc| !loc.is_empty())
}

/// Whether a news snippet reports a funding round.
pub fn mentions_funding(snippet: &str) -> bool {
    funding_re().is_match(snippet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_segment_title() {
        let parsed =
            parse_composite_title("Jane Doe - Director of Toxicology - Acme Bio | LinkedIn", "x")
                .unwrap();
        assert_eq!(parsed.name, "Jane Doe");
        assert_eq!(parsed.title, "Director of Toxicology");
        assert_eq!(parsed.company, "Acme Bio");
    }

    #[test]
    fn test_two_segment_title() {
        let parsed = parse_composite_title("Jane Doe - Safety Lead | LinkedIn", "x").unwrap();
        assert_eq!(parsed.title, "Safety Lead");
        assert_eq!(parsed.company, UNKNOWN);
    }

    #[test]
    fn test_single_segment_uses_role() {
        let parsed = parse_composite_title("Jane Doe | LinkedIn", "Head of Safety").unwrap();
        assert_eq!(parsed.name, "Jane Doe");
        assert_eq!(parsed.title, "Head of Safety");
        assert_eq!(parsed.company, UNKNOWN);
    }

    #[test]
    fn test_extra_segments_ignored() {
        let parsed = parse_composite_title("A - B - C - D", "x").unwrap();
        assert_eq!(parsed.company, "C");
    }

    #[test]
    fn test_blank_name_skipped() {
        assert_eq!(parse_composite_title("   - Title - Co", "x"), None);
        assert_eq!(parse_composite_title("", "x"), None);
        assert_eq!(parse_simple_title(" | LinkedIn", "x"), None);
    }

    #[test]
    fn test_simple_title() {
        let parsed = parse_simple_title("John Smith - Preclinical Scientist - Foo", "r").unwrap();
        assert_eq!(parsed.title, "Preclinical Scientist");
        assert_eq!(parsed.company, UNKNOWN);

        let parsed = parse_simple_title("John Smith", "Toxicologist").unwrap();
        assert_eq!(parsed.title, "Toxicologist");
    }

    #[test]
    fn test_clean_collapses_whitespace() {
        assert_eq!(clean("  Jane \t  Doe \n"), "Jane Doe");
        assert_eq!(clean_opt(Some("   ")), None);
    }

    #[test]
    fn test_derive_topic() {
        assert_eq!(derive_topic("Director of Toxicology"), "Toxicology");
        assert_eq!(derive_topic("Head of Research"), "Research");
        assert_eq!(derive_topic("CEO"), DEFAULT_TOPIC);
        assert_eq!(derive_topic("R&D"), DEFAULT_TOPIC);
        assert_eq!(derive_topic("Head of R&D Tox"), "R&D Tox");
        assert_eq!(derive_topic("Scientist"), DEFAULT_TOPIC);
        assert_eq!(derive_topic("Senior Scientist"), "Senior");
        assert_eq!(derive_topic(""), DEFAULT_TOPIC);
    }

    #[test]
    fn test_researcher_title() {
        assert_eq!(researcher_title("Toxicology"), "Lead Researcher (Toxicology)");
    }

    #[test]
    fn test_intent_keyword() {
        assert_eq!(intent_keyword(None), "toxicity");
        assert_eq!(intent_keyword(Some("  ")), "toxicity");
        assert_eq!(intent_keyword(Some("Head of Toxicity Testing")), "toxicity");
        assert_eq!(intent_keyword(Some("Director of Safety")), "Director of Safety");
    }

    #[test]
    fn test_extract_location() {
        assert_eq!(
            extract_location("Director at Acme · Experience: Acme · Location: Greater Boston · 500+"),
            Some("Greater Boston".to_string())
        );
        assert_eq!(extract_location("No location here"), None);
    }

    #[test]
    fn test_mentions_funding() {
        assert!(mentions_funding("Acme raised $40M in Series B"));
        assert!(mentions_funding("A 12 MILLION round"));
        assert!(!mentions_funding("Acme opens new lab"));
    }
}
