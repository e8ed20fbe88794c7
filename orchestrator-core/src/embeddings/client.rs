//! Embedding Client (`SPEC_FULL.md` §4.8).
//!
//! Wraps the embedding HTTP endpoint behind a [`CircuitBreaker`] the way the
//! teacher's `embeddings::client::EmbeddingClient` wraps its own provider
//! call: the breaker is checked before every attempt, and every outcome
//! (including retries) feeds it back.

use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::circuit_breaker::CircuitBreaker;

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Caches the last 512 distinct canonicalised texts seen — the same
/// project state is re-embedded on every orchestration request until
/// something about it changes, so repeat runs hit this instead of the
/// network (grounded on the teacher's `lru`-backed embedding cache).
const CACHE_CAPACITY: usize = 512;

/// Produces embedding vectors for arbitrary canonicalised text.
pub struct EmbeddingClient {
    http: reqwest::Client,
    config: EmbeddingConfig,
    breaker: CircuitBreaker,
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl EmbeddingClient {
    #[must_use]
    pub fn new(http: reqwest::Client, config: EmbeddingConfig) -> Self {
        let breaker = CircuitBreaker::new(config.circuit.clone());
        let cache = Mutex::new(LruCache::new(NonZeroUsize::new(CACHE_CAPACITY).expect("nonzero capacity")));
        Self { http, config, breaker, cache }
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    /// Embed `text`. Returns [`Error::CircuitOpen`] immediately without any
    /// network call when the breaker is tripped (§4.8, §9). A cache hit
    /// also bypasses the breaker, since it makes no network call either.
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.lock().get(text).cloned() {
            return Ok(cached);
        }

        if !self.breaker.allow_request() {
            return Err(Error::CircuitOpen);
        }

        let mut last_err = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
            }
            let outcome = self
                .http
                .post(format!("{}/embed", self.config.base_url))
                .timeout(self.config.timeout())
                .json(&serde_json::json!({ "text": text }))
                .send()
                .await;
            match outcome {
                Ok(resp) if resp.status().is_success() => {
                    match resp.json::<EmbedResponse>().await {
                        Ok(parsed) if parsed.embedding.len() == self.config.dimensions => {
                            self.breaker.record_success();
                            self.cache.lock().put(text.to_string(), parsed.embedding.clone());
                            return Ok(parsed.embedding);
                        }
                        Ok(parsed) => {
                            self.breaker.record_failure();
                            return Err(Error::VectorDimensionMismatch {
                                expected: self.config.dimensions,
                                actual: parsed.embedding.len(),
                            });
                        }
                        Err(e) => last_err = Some(e.to_string()),
                    }
                }
                Ok(resp) => last_err = Some(format!("embedding service returned {}", resp.status())),
                Err(e) if e.is_timeout() => {
                    self.breaker.record_failure();
                    return Err(Error::Timeout(self.config.timeout()));
                }
                Err(e) => last_err = Some(e.to_string()),
            }
        }
        self.breaker.record_failure();
        warn!(error = ?last_err, "embedding client exhausted retries");
        Err(Error::UpstreamUnavailable(
            last_err.unwrap_or_else(|| "embedding service unavailable".to_string()),
        ))
    }
}
