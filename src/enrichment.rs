//! Per-lead enrichment shared by the batch orchestrator and HTTP handlers
//!
//! For each lead:
//! 1. Scientific intent: recent works matching "<name> <keyword>"
//! 2. Funding signal: recent funding-round news for the company
//! 3. Profile resolution (uploaded leads only): fill placeholder title/location
//!
//! A failing source leaves its fields at the negative default and never
//! stops the remaining steps.

use crate::errors::SourceOutcome;
use crate::models::{is_sentinel, DiscoveryStrategy, FundingSignal, LeadRecord};
use crate::normalize::intent_keyword;
use crate::services::{AcademicSource, FundingSource, ProfileSource, MAX_PAPER_TITLES};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Batch-wide inputs to enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentContext {
    /// Paired with each lead's name in the scientific-intent query.
    pub keyword: String,
}

impl EnrichmentContext {
    /// Context for a batch seeded by `role` (absent for bare uploads).
    pub fn for_role(role: Option<&str>) -> Self {
        Self {
            keyword: intent_keyword(role),
        }
    }
}

impl Default for EnrichmentContext {
    fn default() -> Self {
        Self::for_role(None)
    }
}

pub struct EnrichmentEngine {
    academic: Arc<dyn AcademicSource>,
    funding: Arc<dyn FundingSource>,
    profiles: Option<Arc<dyn ProfileSource>>,
    /// Company (lower-cased) -> funding answer. Unavailable answers are not cached.
    funding_cache: Cache<String, FundingSignal>,
}

impl EnrichmentEngine {
    pub fn new(
        academic: Arc<dyn AcademicSource>,
        funding: Arc<dyn FundingSource>,
        profiles: Option<Arc<dyn ProfileSource>>,
    ) -> Self {
        let funding_cache = Cache::builder()
            .time_to_live(Duration::from_secs(3600))
            .max_capacity(10_000)
            .build();

        Self {
            academic,
            funding,
            profiles,
            funding_cache,
        }
    }

    /// Enriches one lead, returning it with every enrichment field set.
    ///
    /// Output of any earlier run, score included, is cleared first; the
    /// caller rescores afterwards.
    pub async fn enrich(&self, mut record: LeadRecord, context: &EnrichmentContext) -> LeadRecord {
        record.reset_enrichment();

        self.apply_scientific_intent(&mut record, &context.keyword)
            .await;
        self.apply_funding_signal(&mut record).await;

        if record.discovery_strategy == DiscoveryStrategy::Uploaded {
            self.apply_profile(&mut record).await;
        }

        record
    }

    async fn apply_scientific_intent(&self, record: &mut LeadRecord, keyword: &str) {
        let query = format!("{} {}", record.name, keyword);

        match self.academic.search_works(&query, MAX_PAPER_TITLES).await {
            SourceOutcome::Found(summary) if summary.count > 0 => {
                record.has_recent_paper = Some(true);
                record.paper_count = Some(summary.count);
                record.recent_paper_titles =
                    summary.titles.into_iter().take(MAX_PAPER_TITLES).collect();
            }
            outcome => {
                if let SourceOutcome::Unavailable(reason) = outcome {
                    tracing::warn!(
                        "Scientific intent check failed for '{}': {}",
                        record.name,
                        reason
                    );
                }
                record.has_recent_paper = Some(false);
                record.paper_count = Some(0);
                record.recent_paper_titles.clear();
            }
        }
    }

    /// Placeholder companies ("Unknown", blank) are never searched for news;
    /// such leads always get `recent_funding = Some(false)`.
    async fn apply_funding_signal(&self, record: &mut LeadRecord) {
        if is_sentinel(Some(&record.company)) {
            record.recent_funding = Some(false);
            return;
        }

        let signal = self.funding_for(&record.company).await;
        record.recent_funding = Some(signal.found);
        record.funding_note = Some(signal.note);
    }

    async fn funding_for(&self, company: &str) -> FundingSignal {
        let cache_key = company.trim().to_lowercase();
        if let Some(cached) = self.funding_cache.get(&cache_key).await {
            tracing::debug!("Funding cache hit for '{}'", company);
            return cached;
        }

        match self.funding.funding_signal(company).await {
            SourceOutcome::Found(signal) => {
                self.funding_cache.insert(cache_key, signal.clone()).await;
                signal
            }
            SourceOutcome::Empty => {
                let signal = FundingSignal::none();
                self.funding_cache.insert(cache_key, signal.clone()).await;
                signal
            }
            SourceOutcome::Unavailable(reason) => FundingSignal {
                found: false,
                note: reason,
            },
        }
    }

    /// Fills placeholder title/location from a profile lookup; real values are kept.
    async fn apply_profile(&self, record: &mut LeadRecord) {
        let Some(profiles) = self.profiles.as_ref() else {
            return;
        };
        let needs_title = is_sentinel(record.title.as_deref());
        let needs_location = is_sentinel(record.location.as_deref());
        if !needs_title && !needs_location {
            return;
        }

        let hint = match profiles.resolve_profile(&record.name, &record.company).await {
            SourceOutcome::Found(hint) => hint,
            SourceOutcome::Empty => return,
            SourceOutcome::Unavailable(reason) => {
                tracing::debug!("Profile lookup skipped for '{}': {}", record.name, reason);
                return;
            }
        };

        if needs_title {
            if let Some(title) = hint.title.filter(|t| !is_sentinel(Some(t.as_str()))) {
                record.title = Some(title);
            }
        }
        if needs_location {
            if let Some(location) = hint.location.filter(|l| !is_sentinel(Some(l.as_str()))) {
                record.location = Some(location);
            }
        }
    }
}
