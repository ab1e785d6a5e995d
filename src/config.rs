use chrono::NaiveDate;
use serde::Deserialize;

/// Publication-date threshold used when no `RECENCY_CUTOFF` is configured.
pub const DEFAULT_RECENCY_CUTOFF: &str = "2023-01-01";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Credential for paid people-search and funding news. `None` disables both.
    pub serpapi_key: Option<String>,
    pub serpapi_base_url: String,
    pub duckduckgo_base_url: String,
    pub openalex_base_url: String,
    /// Contact address for the OpenAlex polite pool.
    pub openalex_mailto: Option<String>,
    /// Only works published on or after this date count as recent activity.
    pub recency_cutoff: NaiveDate,
    pub source_timeout_secs: u64,
    /// Retries on transient failures. 0 keeps a single failure terminal.
    pub source_max_retries: u32,
    pub enrichment_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            serpapi_key: None,
            serpapi_base_url: "https://serpapi.com".to_string(),
            duckduckgo_base_url: "https://html.duckduckgo.com".to_string(),
            openalex_base_url: "https://api.openalex.org".to_string(),
            openalex_mailto: None,
            recency_cutoff: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            source_timeout_secs: 30,
            source_max_retries: 0,
            enrichment_concurrency: 1,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            serpapi_key: std::env::var("SERPAPI_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            serpapi_base_url: base_url_var("SERPAPI_BASE_URL", defaults.serpapi_base_url)?,
            duckduckgo_base_url: base_url_var("DUCKDUCKGO_BASE_URL", defaults.duckduckgo_base_url)?,
            openalex_base_url: base_url_var("OPENALEX_BASE_URL", defaults.openalex_base_url)?,
            openalex_mailto: std::env::var("OPENALEX_MAILTO")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            recency_cutoff: std::env::var("RECENCY_CUTOFF")
                .unwrap_or_else(|_| DEFAULT_RECENCY_CUTOFF.to_string())
                .parse::<NaiveDate>()
                .map_err(|_| anyhow::anyhow!("RECENCY_CUTOFF must be a date in YYYY-MM-DD form"))?,
            source_timeout_secs: std::env::var("SOURCE_TIMEOUT_SECS")
                .unwrap_or_else(|_| defaults.source_timeout_secs.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SOURCE_TIMEOUT_SECS must be a positive number"))
                .and_then(|secs: u64| {
                    if secs == 0 {
                        anyhow::bail!("SOURCE_TIMEOUT_SECS cannot be zero");
                    }
                    Ok(secs)
                })?,
            source_max_retries: std::env::var("SOURCE_MAX_RETRIES")
                .unwrap_or_else(|_| defaults.source_max_retries.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SOURCE_MAX_RETRIES must be a number"))?,
            enrichment_concurrency: std::env::var("ENRICHMENT_CONCURRENCY")
                .unwrap_or_else(|_| defaults.enrichment_concurrency.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("ENRICHMENT_CONCURRENCY must be a number"))
                .and_then(|n: usize| {
                    if !(1..=16).contains(&n) {
                        anyhow::bail!("ENRICHMENT_CONCURRENCY must be between 1 and 16");
                    }
                    Ok(n)
                })?,
        };

        // Never log the key itself
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("SerpApi key configured: {}", config.serpapi_key.is_some());
        tracing::debug!("SerpApi Base URL: {}", config.serpapi_base_url);
        tracing::debug!("DuckDuckGo Base URL: {}", config.duckduckgo_base_url);
        tracing::debug!("OpenAlex Base URL: {}", config.openalex_base_url);
        tracing::debug!("Recency cutoff: {}", config.recency_cutoff);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn has_serpapi_key(&self) -> bool {
        self.serpapi_key.is_some()
    }
}

fn base_url_var(name: &str, default: String) -> anyhow::Result<String> {
    let url = std::env::var(name).unwrap_or(default);
    if url.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url.trim_end_matches('/').to_string())
}
