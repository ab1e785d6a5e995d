//! External source adapters.
//!
//! Each adapter wraps one third-party data source, converts its raw payload
//! into normalized crate types and reports failures as
//! [`SourceOutcome::Unavailable`] rather than returning errors. Nothing in
//! this module propagates a transport or parsing failure to its caller.

use crate::circuit_breaker::{create_source_circuit_breaker, retry_delays, SourceBreaker};
use crate::config::Config;
use crate::errors::{AppError, SourceError, SourceOutcome};
use crate::models::*;
use crate::normalize::{
    clean_opt, extract_location, mentions_funding, parse_composite_title, parse_simple_title,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use failsafe::futures::CircuitBreaker;
use scraper::{Html, Selector};
use serde_json::Value;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("rust-lead-hunter/", env!("CARGO_PKG_VERSION"));
/// Browser-like agent; the DuckDuckGo HTML endpoint rejects bare clients.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
/// Funding-round phrasing appended to the company name for news searches.
const FUNDING_QUERY_SUFFIX: &str = "raises funding OR Series A OR Series B";
const FUNDING_NEWS_LIMIT: usize = 3;
/// Titles kept from a scientific-intent lookup.
pub const MAX_PAPER_TITLES: usize = 3;

// ============ Source Seams ============

/// A discovery strategy: turns a (role, location) query into candidate leads.
#[async_trait]
pub trait LeadSource: Send + Sync {
    fn strategy(&self) -> DiscoveryStrategy;

    async fn find_leads(
        &self,
        role: &str,
        location: &str,
        limit: usize,
    ) -> SourceOutcome<Vec<LeadRecord>>;
}

/// Academic-metadata search over works published since the recency cutoff.
#[async_trait]
pub trait AcademicSource: Send + Sync {
    async fn search_works(&self, query: &str, per_page: usize) -> SourceOutcome<AcademicSummary>;
}

/// Funding-news search for a company.
#[async_trait]
pub trait FundingSource: Send + Sync {
    async fn funding_signal(&self, company: &str) -> SourceOutcome<FundingSignal>;
}

/// Profile lookup used to fill placeholder titles/locations on uploaded leads.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn resolve_profile(&self, name: &str, company: &str) -> SourceOutcome<ProfileHint>;
}

// ============ Shared HTTP Plumbing ============

/// HTTP client shared by one adapter: timeout, retry policy and circuit breaker.
#[derive(Clone)]
pub struct SourceClient {
    name: &'static str,
    client: reqwest::Client,
    breaker: SourceBreaker,
    max_retries: u32,
}

impl SourceClient {
    pub fn new(
        name: &'static str,
        config: &Config,
        user_agent: &str,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.source_timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create {} client: {}", name, e))
            })?;

        Ok(Self {
            name,
            client,
            breaker: create_source_circuit_breaker(),
            max_retries: config.source_max_retries,
        })
    }

    /// GET returning the body text, retrying transient failures with backoff.
    pub async fn get_text(&self, url: &Url) -> Result<String, SourceError> {
        tracing::debug!("{} GET {}", self.name, redact(url));

        let mut delays = retry_delays();
        let mut attempt = 0;
        loop {
            match self.attempt(url).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = delays.next().unwrap_or(Duration::from_secs(1));
                    tracing::warn!(
                        "{} request failed ({}), retry {}/{} in {:?}",
                        self.name,
                        err,
                        attempt,
                        self.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub async fn get_json(&self, url: &Url) -> Result<Value, SourceError> {
        let body = self.get_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn attempt(&self, url: &Url) -> Result<String, SourceError> {
        let request = async {
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(SourceError::Status(status.as_u16()));
            }
            Ok::<String, SourceError>(response.text().await?)
        };

        match self.breaker.call(request).await {
            Ok(body) => Ok(body),
            Err(failsafe::Error::Inner(err)) => Err(err),
            Err(failsafe::Error::Rejected) => Err(SourceError::CircuitOpen),
        }
    }
}

/// Copy of `url` safe for logs: credential query values are masked.
pub fn redact(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if k == "api_key" || k == "token" {
                "[REDACTED]".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    if !pairs.is_empty() {
        redacted.query_pairs_mut().clear().extend_pairs(pairs);
    }
    redacted.to_string()
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

// ============ SerpApi (paid people-search, funding news, profiles) ============

/// Client for the SerpApi Google engine.
///
/// Serves three roles: paid people-search for discovery, news search for
/// the funding signal, and profile lookup for uploaded leads. Without a
/// `SERPAPI_KEY` every call reports the source as unavailable.
pub struct SerpApiService {
    http: SourceClient,
    base_url: String,
    api_key: Option<String>,
}

impl SerpApiService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            http: SourceClient::new("SerpApi", config, USER_AGENT)?,
            base_url: config.serpapi_base_url.clone(),
            api_key: config.serpapi_key.clone(),
        })
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, params: &[(&str, &str)]) -> Result<Value, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SourceError::MissingCredential("SERPAPI_KEY"))?;

        let mut query: Vec<(&str, &str)> = vec![("engine", "google")];
        query.extend_from_slice(params);
        query.push(("api_key", api_key));

        let url = Url::parse_with_params(&format!("{}/search.json", self.base_url), &query)
            .map_err(|e| SourceError::Parse(format!("Failed to build URL: {}", e)))?;

        self.http.get_json(&url).await
    }
}

/// Normalizes SerpApi organic results into paid-search leads.
pub fn normalize_serp_people(
    payload: &Value,
    role: &str,
    location: &str,
    limit: usize,
) -> Vec<LeadRecord> {
    payload
        .get("organic_results")
        .and_then(|v| v.as_array())
        .map(|results| {
            results
                .iter()
                .filter_map(|result| str_field(result, "title"))
                .filter_map(|title| parse_composite_title(title, role))
                .map(|parsed| parsed.into_lead(location, DiscoveryStrategy::PaidSearch))
                .take(limit)
                .collect()
        })
        .unwrap_or_default()
}

/// Finds the first news entry reporting a funding round.
pub fn normalize_serp_news(payload: &Value) -> Option<FundingSignal> {
    let news = payload.get("news_results")?.as_array()?;
    news.iter()
        .find(|entry| str_field(entry, "snippet").is_some_and(mentions_funding))
        .map(|entry| FundingSignal {
            found: true,
            note: format!(
                "{}: {}",
                str_field(entry, "date").unwrap_or("Recent"),
                str_field(entry, "title").unwrap_or_default()
            ),
        })
}

/// Reads a title and location hint from the first profile result.
pub fn normalize_serp_profile(payload: &Value) -> Option<ProfileHint> {
    let first = payload.get("organic_results")?.as_array()?.first()?;

    let title = str_field(first, "title")
        .and_then(|raw| parse_composite_title(raw, NOT_FOUND))
        .map(|parsed| parsed.title)
        .filter(|t| !is_sentinel(Some(t.as_str())));
    let location = str_field(first, "snippet").and_then(extract_location);

    if title.is_none() && location.is_none() {
        return None;
    }
    Some(ProfileHint { title, location })
}

#[async_trait]
impl LeadSource for SerpApiService {
    fn strategy(&self) -> DiscoveryStrategy {
        DiscoveryStrategy::PaidSearch
    }

    async fn find_leads(
        &self,
        role: &str,
        location: &str,
        limit: usize,
    ) -> SourceOutcome<Vec<LeadRecord>> {
        let query = format!("site:linkedin.com/in/ \"{}\" \"{}\"", role, location);
        let num = limit.to_string();
        tracing::info!("SerpApi people search: {}", query);

        match self.search(&[("q", query.as_str()), ("num", num.as_str())]).await {
            Ok(payload) => {
                let leads = normalize_serp_people(&payload, role, location, limit);
                if leads.is_empty() {
                    if let Some(err) = str_field(&payload, "error") {
                        tracing::debug!("SerpApi reported: {}", err);
                    }
                    SourceOutcome::Empty
                } else {
                    SourceOutcome::Found(leads)
                }
            }
            Err(e) => {
                tracing::warn!("SerpApi people search unavailable: {}", e);
                e.into()
            }
        }
    }
}

#[async_trait]
impl FundingSource for SerpApiService {
    async fn funding_signal(&self, company: &str) -> SourceOutcome<FundingSignal> {
        let query = format!("{} {}", company, FUNDING_QUERY_SUFFIX);
        let num = FUNDING_NEWS_LIMIT.to_string();
        tracing::info!("SerpApi funding news search for: {}", company);

        match self
            .search(&[("q", query.as_str()), ("tbm", "nws"), ("num", num.as_str())])
            .await
        {
            Ok(payload) => match normalize_serp_news(&payload) {
                Some(signal) => SourceOutcome::Found(signal),
                None => SourceOutcome::Empty,
            },
            Err(e) => {
                tracing::warn!("SerpApi funding search unavailable for '{}': {}", company, e);
                e.into()
            }
        }
    }
}

#[async_trait]
impl ProfileSource for SerpApiService {
    async fn resolve_profile(&self, name: &str, company: &str) -> SourceOutcome<ProfileHint> {
        let query = if is_sentinel(Some(company)) {
            format!("site:linkedin.com/in/ \"{}\"", name)
        } else {
            format!("site:linkedin.com/in/ \"{}\" \"{}\"", name, company)
        };

        match self.search(&[("q", query.as_str()), ("num", "1")]).await {
            Ok(payload) => match normalize_serp_profile(&payload) {
                Some(hint) => SourceOutcome::Found(hint),
                None => SourceOutcome::Empty,
            },
            Err(e) => {
                tracing::warn!("SerpApi profile lookup unavailable for '{}': {}", name, e);
                e.into()
            }
        }
    }
}

// ============ DuckDuckGo (free people-search) ============

pub struct DuckDuckGoService {
    http: SourceClient,
    base_url: String,
}

impl DuckDuckGoService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            http: SourceClient::new("DuckDuckGo", config, BROWSER_USER_AGENT)?,
            base_url: config.duckduckgo_base_url.clone(),
        })
    }
}

/// Extracts organic result entries from the DuckDuckGo HTML results page.
pub fn parse_duckduckgo_html(html: &str, limit: usize) -> Vec<SearchHit> {
    let (Ok(result_sel), Ok(title_sel)) = (
        Selector::parse("div.result"),
        Selector::parse("a.result__a"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&result_sel)
        // sponsored entries
        .filter(|result| !result.value().classes().any(|c| c == "result--ad"))
        .filter_map(|result| {
            let anchor = result.select(&title_sel).next()?;
            let title = clean_opt(Some(anchor.text().collect::<String>().as_str()))?;
            Some(SearchHit { title })
        })
        .take(limit)
        .collect()
}

/// Turns free-search hits into leads using the simpler `"Name - Title"` rule.
pub fn normalize_free_hits(hits: &[SearchHit], role: &str, location: &str) -> Vec<LeadRecord> {
    hits.iter()
        .filter_map(|hit| parse_simple_title(&hit.title, role))
        .map(|parsed| parsed.into_lead(location, DiscoveryStrategy::FreeSearch))
        .collect()
}

#[async_trait]
impl LeadSource for DuckDuckGoService {
    fn strategy(&self) -> DiscoveryStrategy {
        DiscoveryStrategy::FreeSearch
    }

    async fn find_leads(
        &self,
        role: &str,
        location: &str,
        limit: usize,
    ) -> SourceOutcome<Vec<LeadRecord>> {
        let query = format!("site:linkedin.com/in/ {} {}", role, location);
        tracing::info!("DuckDuckGo people search: {}", query);

        let url = match Url::parse_with_params(
            &format!("{}/html/", self.base_url),
            &[("q", query.as_str())],
        ) {
            Ok(url) => url,
            Err(e) => return SourceOutcome::Unavailable(format!("Failed to build URL: {}", e)),
        };

        match self.http.get_text(&url).await {
            Ok(body) => {
                let hits = parse_duckduckgo_html(&body, limit);
                let leads = normalize_free_hits(&hits, role, location);
                if leads.is_empty() {
                    SourceOutcome::Empty
                } else {
                    SourceOutcome::Found(leads)
                }
            }
            Err(e) => {
                tracing::warn!("DuckDuckGo search unavailable: {}", e);
                e.into()
            }
        }
    }
}

// ============ OpenAlex (academic metadata) ============

/// Client for the OpenAlex works API, filtered to the recency cutoff.
pub struct OpenAlexService {
    http: SourceClient,
    base_url: String,
    since: NaiveDate,
    mailto: Option<String>,
}

impl OpenAlexService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            http: SourceClient::new("OpenAlex", config, USER_AGENT)?,
            base_url: config.openalex_base_url.clone(),
            since: config.recency_cutoff,
            mailto: config.openalex_mailto.clone(),
        })
    }

    fn works_url(&self, query: &str, per_page: usize) -> Result<Url, SourceError> {
        let filter = format!("from_publication_date:{}", self.since.format("%Y-%m-%d"));
        let per_page = per_page.to_string();
        let mut params = vec![
            ("search", query),
            ("filter", filter.as_str()),
            ("per-page", per_page.as_str()),
        ];
        if let Some(mailto) = self.mailto.as_deref() {
            params.push(("mailto", mailto));
        }
        Url::parse_with_params(&format!("{}/works", self.base_url), &params)
            .map_err(|e| SourceError::Parse(format!("Failed to build URL: {}", e)))
    }
}

/// Reduces an OpenAlex works page to counts, titles and first authorships.
pub fn normalize_openalex_works(payload: &Value) -> AcademicSummary {
    let results = payload
        .get("results")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let count = payload
        .get("meta")
        .and_then(|m| m.get("count"))
        .and_then(|c| c.as_u64())
        .map(|c| u32::try_from(c).unwrap_or(u32::MAX))
        .unwrap_or(results.len() as u32);

    let titles = results
        .iter()
        .filter_map(|work| str_field(work, "title"))
        .take(MAX_PAPER_TITLES)
        .map(String::from)
        .collect();

    let works = results
        .iter()
        .filter_map(|work| {
            let authorship = work.get("authorships")?.as_array()?.first()?;
            let institution = authorship
                .get("institutions")
                .and_then(|v| v.as_array())
                .and_then(|list| list.first());
            Some(WorkSummary {
                title: clean_opt(str_field(work, "title")),
                first_author: clean_opt(
                    authorship.get("author").and_then(|a| str_field(a, "display_name")),
                ),
                institution: clean_opt(institution.and_then(|i| str_field(i, "display_name"))),
                country_code: clean_opt(institution.and_then(|i| str_field(i, "country_code"))),
            })
        })
        .collect();

    AcademicSummary {
        count,
        titles,
        works,
    }
}

#[async_trait]
impl AcademicSource for OpenAlexService {
    async fn search_works(&self, query: &str, per_page: usize) -> SourceOutcome<AcademicSummary> {
        let url = match self.works_url(query, per_page) {
            Ok(url) => url,
            Err(e) => return e.into(),
        };
        tracing::info!("OpenAlex works search: {}", query);

        match self.http.get_json(&url).await {
            Ok(payload) => {
                let summary = normalize_openalex_works(&payload);
                if summary.count == 0 && summary.works.is_empty() {
                    SourceOutcome::Empty
                } else {
                    SourceOutcome::Found(summary)
                }
            }
            Err(e) => {
                tracing::warn!("OpenAlex search unavailable for '{}': {}", query, e);
                e.into()
            }
        }
    }
}
