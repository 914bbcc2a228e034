#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Conflux Core
//!
//! An asynchronous task-composition engine feeding a reactive, cache-backed
//! web service.
//!
//! ## Overview
//!
//! Two cooperating subsystems:
//!
//! 1. The **pipeline engine** composes independent units of asynchronous work
//!    into directed dependency graphs, with combinators for sequencing,
//!    recovery, fan-out/fan-in, timeout, bounded retry and cooperative
//!    cancellation. Failures are values that travel the graph; a failure
//!    nobody observes is surfaced to an unhandled-failure sink instead of
//!    disappearing.
//! 2. The **cache-backed service** accepts HTTP requests and dispatches
//!    handler work through the pipeline engine, consulting an external
//!    key-value cache without ever blocking a worker thread. Cache access is
//!    bounded by a FIFO pending window and guarded by a circuit breaker.
//!
//! ## Module Organization
//!
//! - [`pipeline`] - task arena, combinators and the task state machine
//! - [`cache`] - cache store trait, backends, pending window
//! - [`resilience`] - circuit breaker
//! - [`web`] - router, handlers, request context and error mapping
//! - [`config`] - validated configuration loading
//! - [`error`] - top-level error type
//! - [`logging`] - structured logging initialization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use conflux_core::cache::CacheProvider;
//! use conflux_core::pipeline::PipelineEngine;
//! use serde_json::json;
//!
//! # async fn example() {
//! let engine = PipelineEngine::new();
//! let cache = CacheProvider::memory(32);
//!
//! let fetch = engine.submit(async { Ok(json!(21)) });
//! let doubled = engine.chain(&fetch, |value| async move {
//!     Ok(json!(value.as_i64().unwrap_or(0) * 2))
//! });
//! let outcome = doubled.join().await;
//! # let _ = (cache, outcome);
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod resilience;
pub mod web;

pub use cache::{CacheError, CacheProvider, CacheStore};
pub use config::{ConfigManager, ConfluxConfig};
pub use error::{ConfluxError, Result};
pub use pipeline::{PipelineEngine, RetryPolicy, TaskFailure, TaskHandle, TaskId, TaskState};
pub use web::AppState;
