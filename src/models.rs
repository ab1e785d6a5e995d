use serde::{Deserialize, Serialize};

/// Company value used when the employer cannot be resolved.
pub const UNKNOWN: &str = "Unknown";
/// Placeholder a profile lookup reports when it found nothing.
pub const NOT_FOUND: &str = "Not Found";

// ============ Lead Records ============

/// Which path produced a lead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStrategy {
    /// Paid people-search (SerpApi).
    PaidSearch,
    /// Free people-search (DuckDuckGo).
    FreeSearch,
    /// Authors of recent works on the role's topic (OpenAlex).
    AcademicFallback,
    /// Supplied by the caller rather than discovered.
    #[default]
    Uploaded,
}

impl DiscoveryStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryStrategy::PaidSearch => "paid_search",
            DiscoveryStrategy::FreeSearch => "free_search",
            DiscoveryStrategy::AcademicFallback => "academic_fallback",
            DiscoveryStrategy::Uploaded => "uploaded",
        }
    }
}

/// A person flowing through discovery, enrichment and scoring.
///
/// Enrichment fields stay `None` until the enrichment engine has run, so
/// "not yet enriched" is never confused with "enriched, signal negative".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub name: String,
    #[serde(default = "unknown_company")]
    pub company: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub has_recent_paper: Option<bool>,
    #[serde(default)]
    pub paper_count: Option<u32>,
    #[serde(default)]
    pub recent_paper_titles: Vec<String>,
    #[serde(default)]
    pub recent_funding: Option<bool>,
    #[serde(default)]
    pub funding_note: Option<String>,

    /// Propensity score, set once every enrichment field is populated.
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub discovery_strategy: DiscoveryStrategy,
}

fn unknown_company() -> String {
    UNKNOWN.to_string()
}

impl LeadRecord {
    pub fn new(name: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            company: company.into(),
            title: None,
            location: None,
            has_recent_paper: None,
            paper_count: None,
            recent_paper_titles: Vec::new(),
            recent_funding: None,
            funding_note: None,
            score: None,
            discovery_strategy: DiscoveryStrategy::Uploaded,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_strategy(mut self, strategy: DiscoveryStrategy) -> Self {
        self.discovery_strategy = strategy;
        self
    }

    /// All three enrichment signals have been set.
    pub fn is_enriched(&self) -> bool {
        self.has_recent_paper.is_some() && self.paper_count.is_some() && self.recent_funding.is_some()
    }

    /// Clears enrichment output and score ahead of a full re-run.
    pub fn reset_enrichment(&mut self) {
        self.has_recent_paper = None;
        self.paper_count = None;
        self.recent_paper_titles.clear();
        self.recent_funding = None;
        self.funding_note = None;
        self.score = None;
    }
}

/// Whether a descriptive value is absent or one of the placeholder sentinels.
pub fn is_sentinel(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None => true,
        Some(v) => v.is_empty() || v.eq_ignore_ascii_case(UNKNOWN) || v.eq_ignore_ascii_case(NOT_FOUND),
    }
}

// ============ Adapter Outputs ============

/// Title of one organic result entry from a people-search engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
}

/// One recent work, reduced to its first author and first institution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSummary {
    pub title: Option<String>,
    pub first_author: Option<String>,
    pub institution: Option<String>,
    pub country_code: Option<String>,
}

/// Normalized academic-metadata answer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AcademicSummary {
    /// Total number of matching works reported by the source.
    pub count: u32,
    /// Titles of at most the first three works.
    pub titles: Vec<String>,
    pub works: Vec<WorkSummary>,
}

/// Normalized funding-news answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingSignal {
    pub found: bool,
    pub note: String,
}

impl FundingSignal {
    pub fn none() -> Self {
        Self {
            found: false,
            note: "No recent funding found".to_string(),
        }
    }
}

/// Richer descriptive values found for an uploaded lead.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileHint {
    pub title: Option<String>,
    pub location: Option<String>,
}

// ============ API Models ============

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverRequest {
    pub role: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoverResponse {
    pub leads: Vec<LeadRecord>,
    pub used_fallback: bool,
    pub strategy: Option<DiscoveryStrategy>,
    pub notice: String,
}

/// Body of `POST /api/v1/leads/process`.
///
/// With `leads` the records are processed as uploaded; otherwise `role` and
/// `location` seed discovery.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub leads: Option<Vec<LeadInput>>,
}

/// A caller-supplied lead, before any enrichment.
#[derive(Debug, Clone, Deserialize)]
pub struct LeadInput {
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl From<LeadInput> for LeadRecord {
    fn from(input: LeadInput) -> Self {
        let company = input
            .company
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(unknown_company);
        LeadRecord {
            title: input.title.filter(|t| !t.trim().is_empty()),
            location: input.location.filter(|l| !l.trim().is_empty()),
            ..LeadRecord::new(input.name.trim(), company.trim())
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadParams {
    #[serde(default)]
    pub role: Option<String>,
}

/// Dashboard-style metrics over a ranked batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    /// Leads scoring at or above the hot-lead threshold.
    pub hot_leads: usize,
    /// Leads with recent publications.
    pub researchers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResponse {
    pub run_id: uuid::Uuid,
    pub used_fallback: bool,
    pub notice: String,
    pub summary: BatchSummary,
    pub leads: Vec<LeadRecord>,
}
