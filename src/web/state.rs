//! # Web Application State
//!
//! Shared state for the web service: the pipeline engine, the cache provider
//! and the resolved configuration. Cloned into every request handler.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::cache::CacheProvider;
use crate::config::ConfluxConfig;
use crate::pipeline::PipelineEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: PipelineEngine,
    pub cache: Arc<CacheProvider>,
    pub config: Arc<ConfluxConfig>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: PipelineEngine, cache: Arc<CacheProvider>, config: Arc<ConfluxConfig>) -> Self {
        Self {
            engine,
            cache,
            config,
            started_at: Utc::now(),
        }
    }
}
