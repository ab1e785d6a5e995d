use crate::models::LeadRecord;

pub const RECENT_PAPER_WEIGHT: u8 = 40;
pub const TITLE_MATCH_WEIGHT: u8 = 30;
pub const RECENT_FUNDING_WEIGHT: u8 = 20;
pub const HUB_LOCATION_WEIGHT: u8 = 10;

pub const MAX_SCORE: u8 = 100;
/// Leads at or above this score are surfaced as hot.
pub const HOT_LEAD_THRESHOLD: u8 = 60;

const TITLE_KEYWORDS: [&str; 6] = ["toxicology", "safety", "hepatic", "preclinical", "vitro", "3d"];
const HUB_CITIES: [&str; 7] = [
    "cambridge",
    "boston",
    "san francisco",
    "bay area",
    "basel",
    "london",
    "oxford",
];

fn contains_any(value: Option<&str>, needles: &[&str]) -> bool {
    value
        .map(str::to_lowercase)
        .is_some_and(|v| needles.iter().any(|n| v.contains(n)))
}

/// Propensity score in `0..=100` for an enriched lead.
///
/// Pure function of the record's fields; missing values score nothing.
pub fn score(record: &LeadRecord) -> u8 {
    let mut total: u16 = 0;

    if record.has_recent_paper == Some(true) {
        total += u16::from(RECENT_PAPER_WEIGHT);
    }
    if contains_any(record.title.as_deref(), &TITLE_KEYWORDS) {
        total += u16::from(TITLE_MATCH_WEIGHT);
    }
    if record.recent_funding == Some(true) {
        total += u16::from(RECENT_FUNDING_WEIGHT);
    }
    if contains_any(record.location.as_deref(), &HUB_CITIES) {
        total += u16::from(HUB_LOCATION_WEIGHT);
    }

    total.min(u16::from(MAX_SCORE)) as u8
}

pub fn is_hot_lead(score: u8) -> bool {
    score >= HOT_LEAD_THRESHOLD
}
