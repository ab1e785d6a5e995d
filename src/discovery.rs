//! Lead discovery: ordered fallback across people-search sources
//!
//! Strategies are tried strictly in priority order:
//! 1. Paid people-search (SerpApi)
//! 2. Free people-search (DuckDuckGo)
//! 3. Authors of recent works on the role's topic (OpenAlex)
//!
//! The first strategy that returns a non-empty lead list wins and no
//! lower-priority strategy is consulted.

use crate::errors::SourceOutcome;
use crate::models::{DiscoveryStrategy, LeadRecord};
use crate::normalize::{clean_opt, derive_topic, researcher_title, LEAD_RESEARCHER};
use crate::services::{AcademicSource, LeadSource};
use async_trait::async_trait;
use std::sync::Arc;

/// Leads requested from each strategy.
pub const DISCOVERY_LIMIT: usize = 5;
/// Company given to academic leads without an affiliation.
pub const RESEARCH_INSTITUTION: &str = "Research Institution";
/// Location given to academic leads without an institution country.
pub const GLOBAL: &str = "Global";

/// Result of a discovery run.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryOutcome {
    pub leads: Vec<LeadRecord>,
    /// True iff the first lead's title carries the "Lead Researcher" tag.
    pub used_fallback: bool,
    /// Strategy that produced `leads`, `None` when nothing was found.
    pub strategy: Option<DiscoveryStrategy>,
}

impl DiscoveryOutcome {
    pub fn none() -> Self {
        Self {
            leads: Vec::new(),
            used_fallback: false,
            strategy: None,
        }
    }

    /// No strategy produced a lead.
    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    /// User-facing message describing how the leads were found.
    pub fn notice(&self, role: &str) -> String {
        if self.is_empty() {
            "No leads found. Please try a broader query (e.g., 'Scientist' instead of 'Senior Scientist').".to_string()
        } else if self.used_fallback {
            format!(
                "Web search returned no profiles. Switched to science-first discovery (OpenAlex) to find active researchers publishing on '{}'.",
                role
            )
        } else {
            format!("Found {} leads via web search.", self.leads.len())
        }
    }
}

/// Whether a lead list came from the academic fallback, judged by its first title.
pub fn is_science_fallback(leads: &[LeadRecord]) -> bool {
    leads
        .first()
        .and_then(|lead| lead.title.as_deref())
        .is_some_and(|title| title.contains(LEAD_RESEARCHER))
}

/// Discovery strategy backed by academic metadata: the first authors of
/// recent works on the role's topic.
pub struct AcademicFallbackSource {
    academic: Arc<dyn AcademicSource>,
}

impl AcademicFallbackSource {
    pub fn new(academic: Arc<dyn AcademicSource>) -> Self {
        Self { academic }
    }
}

#[async_trait]
impl LeadSource for AcademicFallbackSource {
    fn strategy(&self) -> DiscoveryStrategy {
        DiscoveryStrategy::AcademicFallback
    }

    async fn find_leads(
        &self,
        role: &str,
        _location: &str,
        limit: usize,
    ) -> SourceOutcome<Vec<LeadRecord>> {
        let topic = derive_topic(role);
        tracing::info!("Academic fallback discovery on topic '{}'", topic);

        let summary = match self.academic.search_works(&topic, limit).await {
            SourceOutcome::Found(summary) => summary,
            SourceOutcome::Empty => return SourceOutcome::Empty,
            SourceOutcome::Unavailable(reason) => return SourceOutcome::Unavailable(reason),
        };

        let leads: Vec<LeadRecord> = summary
            .works
            .into_iter()
            .filter_map(|work| {
                let name = clean_opt(work.first_author.as_deref())?;
                let company = work
                    .institution
                    .unwrap_or_else(|| RESEARCH_INSTITUTION.to_string());
                let location = work.country_code.unwrap_or_else(|| GLOBAL.to_string());
                Some(
                    LeadRecord::new(name, company)
                        .with_title(researcher_title(&topic))
                        .with_location(location)
                        .with_strategy(DiscoveryStrategy::AcademicFallback),
                )
            })
            .take(limit)
            .collect();

        if leads.is_empty() {
            SourceOutcome::Empty
        } else {
            SourceOutcome::Found(leads)
        }
    }
}

/// Runs discovery strategies in priority order.
pub struct DiscoveryEngine {
    strategies: Vec<Arc<dyn LeadSource>>,
    limit: usize,
}

impl DiscoveryEngine {
    /// Strategies are consulted in the order given.
    pub fn new(strategies: Vec<Arc<dyn LeadSource>>) -> Self {
        Self {
            strategies,
            limit: DISCOVERY_LIMIT,
        }
    }

    pub fn strategies(&self) -> impl Iterator<Item = DiscoveryStrategy> + '_ {
        self.strategies.iter().map(|s| s.strategy())
    }

    pub async fn discover(&self, role: &str, location: &str) -> DiscoveryOutcome {
        for source in &self.strategies {
            let strategy = source.strategy();
            match source.find_leads(role, location, self.limit).await {
                SourceOutcome::Found(mut leads) if !leads.is_empty() => {
                    leads.truncate(self.limit);
                    tracing::info!(
                        "Discovery found {} leads via {}",
                        leads.len(),
                        strategy.as_str()
                    );
                    let used_fallback = is_science_fallback(&leads);
                    return DiscoveryOutcome {
                        leads,
                        used_fallback,
                        strategy: Some(strategy),
                    };
                }
                SourceOutcome::Found(_) | SourceOutcome::Empty => {
                    tracing::info!("{} returned no leads, falling back", strategy.as_str());
                }
                SourceOutcome::Unavailable(reason) => {
                    tracing::warn!(
                        "{} unavailable ({}), falling back",
                        strategy.as_str(),
                        reason
                    );
                }
            }
        }

        tracing::warn!("No leads found for '{}' in '{}'", role, location);
        DiscoveryOutcome::none()
    }
}
