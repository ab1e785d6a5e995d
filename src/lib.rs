//! Lead Hunter Library
//!
//! Discovers B2B leads for a job role and location, enriches them with
//! scientific-intent and funding signals, and ranks them by a propensity score.
//!
//! # Modules
//!
//! - `batch`: Batch orchestration (enrich, score, rank).
//! - `circuit_breaker`: Circuit breaker and retry backoff for external sources.
//! - `config`: Configuration management.
//! - `discovery`: Ordered discovery fallback chain.
//! - `enrichment`: Per-lead enrichment logic.
//! - `errors`: Error handling types.
//! - `export`: CSV import and export.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `normalize`: Shared payload normalization helpers.
//! - `scoring`: Propensity scorer.
//! - `services`: External source adapters (SerpApi, DuckDuckGo, OpenAlex).

pub mod batch;
pub mod circuit_breaker;
pub mod config;
pub mod discovery;
pub mod enrichment;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod scoring;
pub mod services;
