/// Integration tests with mocked external sources
/// Exercises discovery, enrichment and the HTTP handlers against wiremock
/// servers standing in for SerpApi, DuckDuckGo and OpenAlex
use axum::extract::State;
use axum::Json;
use rust_lead_hunter::batch::{summarize, BatchOrchestrator};
use rust_lead_hunter::config::Config;
use rust_lead_hunter::enrichment::EnrichmentContext;
use rust_lead_hunter::errors::AppError;
use rust_lead_hunter::handlers::{self, AppState};
use rust_lead_hunter::models::{DiscoveryStrategy, LeadRecord, ProcessRequest};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create test config with every source on the mock server
fn create_test_config(base_url: String, serpapi_key: Option<&str>) -> Config {
    Config {
        serpapi_key: serpapi_key.map(String::from),
        serpapi_base_url: base_url.clone(),
        duckduckgo_base_url: base_url.clone(),
        openalex_base_url: base_url,
        source_timeout_secs: 5,
        ..Config::default()
    }
}

fn openalex_single_work() -> serde_json::Value {
    serde_json::json!({
        "meta": {"count": 1},
        "results": [{
            "title": "Hepatotoxicity in 3D liver models",
            "authorships": [{
                "author": {"display_name": "Jane Doe"},
                "institutions": [{"display_name": "MIT", "country_code": "US"}]
            }]
        }]
    })
}

const EMPTY_DDG_PAGE: &str = "<html><body><div id=\"links\"></div></body></html>";

const DDG_PAGE: &str = r##"
<html><body>
  <div class="result results_links result--ad">
    <a class="result__a" href="#">Sponsored - Buy Now</a>
  </div>
  <div class="result results_links">
    <a class="result__a" href="#">John Smith - Head of Preclinical Safety | LinkedIn</a>
    <a class="result__snippet">Boston, Massachusetts</a>
  </div>
</body></html>
"##;

#[tokio::test]
async fn test_discovery_falls_back_to_academic_sources() {
    let mock_server = MockServer::start().await;

    // Paid search: reachable, zero organic results
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .and(query_param("engine", "google"))
        .and(query_param("api_key", "test_key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"organic_results": []})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    // Free search: reachable, no result blocks
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_DDG_PAGE))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Academic: one recent work on the derived topic
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("search", "Toxicology"))
        .and(query_param("filter", "from_publication_date:2023-01-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openalex_single_work()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), Some("test_key"));
    let pipeline = BatchOrchestrator::from_config(&config).unwrap();

    let outcome = pipeline.discover("Director of Toxicology", "Boston, MA").await;

    assert!(outcome.used_fallback);
    assert_eq!(outcome.strategy, Some(DiscoveryStrategy::AcademicFallback));
    assert_eq!(outcome.leads.len(), 1);
    let lead = &outcome.leads[0];
    assert_eq!(lead.name, "Jane Doe");
    assert_eq!(lead.title.as_deref(), Some("Lead Researcher (Toxicology)"));
    assert_eq!(lead.company, "MIT");
    assert_eq!(lead.location.as_deref(), Some("US"));
}

#[tokio::test]
async fn test_paid_search_success_skips_lower_strategies() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search.json"))
        .and(query_param("q", "site:linkedin.com/in/ \"Toxicologist\" \"Basel\""))
        .and(query_param("num", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "organic_results": [
                {"title": "Anna Meier - Senior Toxicologist - Roche | LinkedIn"},
                {"title": "Beat Keller - Toxicologist | LinkedIn"}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DDG_PAGE))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openalex_single_work()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), Some("test_key"));
    let pipeline = BatchOrchestrator::from_config(&config).unwrap();

    let outcome = pipeline.discover("Toxicologist", "Basel").await;

    assert!(!outcome.used_fallback);
    assert_eq!(outcome.strategy, Some(DiscoveryStrategy::PaidSearch));
    assert_eq!(outcome.leads.len(), 2);
    assert_eq!(outcome.leads[0].company, "Roche");
    assert_eq!(outcome.leads[1].company, "Unknown");
    assert_eq!(outcome.leads[1].location.as_deref(), Some("Basel"));
}

#[tokio::test]
async fn test_missing_key_goes_straight_to_free_search() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/html/"))
        .and(query_param("q", "site:linkedin.com/in/ Safety Lead Boston"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DDG_PAGE))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), None);
    let pipeline = BatchOrchestrator::from_config(&config).unwrap();

    let outcome = pipeline.discover("Safety Lead", "Boston").await;

    assert_eq!(outcome.strategy, Some(DiscoveryStrategy::FreeSearch));
    assert_eq!(outcome.leads.len(), 1);
    assert_eq!(outcome.leads[0].name, "John Smith");
    assert_eq!(
        outcome.leads[0].title.as_deref(),
        Some("Head of Preclinical Safety")
    );
    assert_eq!(outcome.leads[0].company, "Unknown");
}

#[tokio::test]
async fn test_batch_enriches_and_scores() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("search", "Jane Doe toxicity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openalex_single_work()))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search.json"))
        .and(query_param("tbm", "nws"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "news_results": [
                {"date": "2 days ago", "title": "Acme Bio opens lab", "snippet": "New site"},
                {"date": "1 week ago", "title": "Acme Bio closes Series B", "snippet": "Acme raised $40 million"}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), Some("test_key"));
    let pipeline = BatchOrchestrator::from_config(&config).unwrap();

    let records = vec![
        LeadRecord::new("Jane Doe", "Acme Bio")
            .with_title("Director of Toxicology")
            .with_location("Boston, MA"),
        LeadRecord::new("Sam Roe", "Acme Bio")
            .with_title("Sales")
            .with_location("Dallas"),
    ];

    let ranked = pipeline
        .run(records, &EnrichmentContext::default(), |_, _, _| {})
        .await;

    assert_eq!(ranked[0].name, "Jane Doe");
    assert_eq!(ranked[0].score, Some(100));
    assert_eq!(ranked[0].paper_count, Some(1));
    assert_eq!(
        ranked[0].funding_note.as_deref(),
        Some("1 week ago: Acme Bio closes Series B")
    );
    // Funding is cached per company, no papers for Sam
    assert_eq!(ranked[1].name, "Sam Roe");
    assert_eq!(ranked[1].has_recent_paper, Some(false));
    assert_eq!(ranked[1].recent_funding, Some(true));
    assert_eq!(ranked[1].score, Some(20));

    let summary = summarize(&ranked);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.hot_leads, 1);
    assert_eq!(summary.researchers, 1);
}

#[tokio::test]
async fn test_failing_sources_do_not_abort_batch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), Some("test_key"));
    let pipeline = BatchOrchestrator::from_config(&config).unwrap();

    let records = vec![
        LeadRecord::new("First Person", "Alpha"),
        LeadRecord::new("Second Person", "Beta"),
        LeadRecord::new("Third Person", "Unknown"),
    ];

    let mut progress = Vec::new();
    let ranked = pipeline
        .run(records, &EnrichmentContext::default(), |done, total, _| {
            progress.push((done, total))
        })
        .await;

    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(ranked.len(), 3);
    for lead in &ranked {
        assert_eq!(lead.has_recent_paper, Some(false));
        assert_eq!(lead.paper_count, Some(0));
        assert_eq!(lead.recent_funding, Some(false));
        assert_eq!(lead.score, Some(0));
    }
}

#[tokio::test]
async fn test_transient_failure_retried_when_configured() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openalex_single_work()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = Config {
        source_max_retries: 1,
        ..create_test_config(mock_server.uri(), None)
    };
    let pipeline = BatchOrchestrator::from_config(&config).unwrap();

    let outcome = pipeline.discover("Head of Research", "Anywhere").await;

    assert!(outcome.used_fallback);
    assert_eq!(outcome.leads[0].title.as_deref(), Some("Lead Researcher (Research)"));
}

fn app_state(config: Config) -> Arc<AppState> {
    Arc::new(AppState {
        pipeline: Arc::new(BatchOrchestrator::from_config(&config).unwrap()),
        config,
    })
}

#[tokio::test]
async fn test_process_handler_reports_no_leads() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_DDG_PAGE))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"meta": {"count": 0}, "results": []})),
        )
        .mount(&mock_server)
        .await;

    let state = app_state(create_test_config(mock_server.uri(), None));
    let req = ProcessRequest {
        role: Some("Senior Scientist".to_string()),
        location: Some("Nowhere".to_string()),
        leads: None,
    };

    let result = handlers::process_leads(State(state), Json(req)).await;

    match result {
        Err(AppError::NotFound(msg)) => assert!(msg.contains("broader query")),
        other => panic!("Expected NotFound, got {:?}", other.map(|r| r.0.leads.len())),
    }
}

#[tokio::test]
async fn test_process_handler_requires_role_without_leads() {
    let mock_server = MockServer::start().await;
    let state = app_state(create_test_config(mock_server.uri(), None));

    let result = handlers::process_leads(State(state), Json(ProcessRequest::default())).await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn test_process_handler_uploaded_leads() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openalex_single_work()))
        .mount(&mock_server)
        .await;

    // No SERPAPI_KEY: funding and profile lookups are never attempted
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let state = app_state(create_test_config(mock_server.uri(), None));
    let req: ProcessRequest = serde_json::from_value(serde_json::json!({
        "role": "Director of Safety",
        "leads": [
            {"name": "Jane Doe", "company": "MIT", "title": "Director of Safety", "location": "Cambridge, MA"},
            {"name": "   "}
        ]
    }))
    .unwrap();

    let Json(response) = handlers::process_leads(State(state), Json(req)).await.unwrap();

    assert!(!response.used_fallback);
    assert_eq!(response.summary.total, 1);
    assert_eq!(response.leads[0].discovery_strategy, DiscoveryStrategy::Uploaded);
    assert_eq!(response.leads[0].score, Some(80));
    assert_eq!(response.summary.hot_leads, 1);
}
