//! Embedding Client and Episode Embedder (`SPEC_FULL.md` §4.8, §4.9).

pub mod circuit_breaker;
pub mod client;
pub mod embedder;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use client::EmbeddingClient;
pub use embedder::EpisodeEmbedder;
