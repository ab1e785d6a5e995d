//! Batch orchestration: discovery or upload seeds a batch, every record is
//! enriched then scored, and the table is ranked by score.

use crate::config::Config;
use crate::discovery::{AcademicFallbackSource, DiscoveryEngine, DiscoveryOutcome};
use crate::enrichment::{EnrichmentContext, EnrichmentEngine};
use crate::errors::AppError;
use crate::models::{BatchSummary, LeadRecord};
use crate::scoring::{is_hot_lead, score};
use crate::services::{
    AcademicSource, DuckDuckGoService, FundingSource, LeadSource, OpenAlexService, ProfileSource,
    SerpApiService,
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

pub const MAX_CONCURRENCY: usize = 16;

pub struct BatchOrchestrator {
    discovery: DiscoveryEngine,
    enrichment: EnrichmentEngine,
    concurrency: usize,
}

impl BatchOrchestrator {
    pub fn new(discovery: DiscoveryEngine, enrichment: EnrichmentEngine, concurrency: usize) -> Self {
        Self {
            discovery,
            enrichment,
            concurrency: concurrency.clamp(1, MAX_CONCURRENCY),
        }
    }

    /// Wires the live adapters: paid search, free search, then the academic
    /// fallback for discovery; OpenAlex and SerpApi news for enrichment.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let serpapi = Arc::new(SerpApiService::new(config)?);
        let duckduckgo = Arc::new(DuckDuckGoService::new(config)?);
        let openalex: Arc<dyn AcademicSource> = Arc::new(OpenAlexService::new(config)?);

        if !serpapi.is_available() {
            tracing::warn!("SERPAPI_KEY not set: paid search, funding news and profile lookup disabled");
        }

        let strategies: Vec<Arc<dyn LeadSource>> = vec![
            serpapi.clone() as Arc<dyn LeadSource>,
            duckduckgo as Arc<dyn LeadSource>,
            Arc::new(AcademicFallbackSource::new(openalex.clone())) as Arc<dyn LeadSource>,
        ];
        let profiles = serpapi
            .is_available()
            .then(|| serpapi.clone() as Arc<dyn ProfileSource>);
        let funding: Arc<dyn FundingSource> = serpapi;

        let discovery = DiscoveryEngine::new(strategies);
        tracing::info!(
            "Discovery order: {}",
            discovery
                .strategies()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        Ok(Self::new(
            discovery,
            EnrichmentEngine::new(openalex, funding, profiles),
            config.enrichment_concurrency,
        ))
    }

    pub async fn discover(&self, role: &str, location: &str) -> DiscoveryOutcome {
        self.discovery.discover(role, location).await
    }

    /// Enriches and scores one record.
    pub async fn process_record(&self, record: LeadRecord, context: &EnrichmentContext) -> LeadRecord {
        let mut record = self.enrichment.enrich(record, context).await;
        record.score = Some(score(&record));
        record
    }

    /// Runs the whole batch and returns it ranked by score, highest first.
    ///
    /// `on_progress(done, total, record)` is called once per record in input
    /// order. A failing source never drops a record.
    pub async fn run<F>(
        &self,
        records: Vec<LeadRecord>,
        context: &EnrichmentContext,
        mut on_progress: F,
    ) -> Vec<LeadRecord>
    where
        F: FnMut(usize, usize, &LeadRecord),
    {
        let total = records.len();
        tracing::info!(
            "Processing batch of {} leads (concurrency {})",
            total,
            self.concurrency
        );

        let mut processed = stream::iter(records.into_iter().enumerate().map(|(i, record)| async move {
            tracing::info!(
                "Enriching lead {}/{}: {} @ {}",
                i + 1,
                total,
                record.name,
                record.company
            );
            self.process_record(record, context).await
        }))
        .buffered(self.concurrency);

        let mut ranked = Vec::with_capacity(total);
        while let Some(record) = processed.next().await {
            on_progress(ranked.len() + 1, total, &record);
            ranked.push(record);
        }

        rank(&mut ranked);
        ranked
    }
}

/// Stable sort by score descending; unscored records sink to the bottom.
pub fn rank(records: &mut [LeadRecord]) {
    records.sort_by(|a, b| b.score.cmp(&a.score));
}

pub fn summarize(records: &[LeadRecord]) -> BatchSummary {
    BatchSummary {
        total: records.len(),
        hot_leads: records
            .iter()
            .filter(|r| r.score.is_some_and(is_hot_lead))
            .count(),
        researchers: records
            .iter()
            .filter(|r| r.has_recent_paper == Some(true))
            .count(),
    }
}
