//! # Cache Layer
//!
//! Key-value cache access for request handlers.
//!
//! ```text
//! CacheProvider                 <- window + circuit breaker + enum dispatch
//!   ├── Redis(RedisStore)        <- ConnectionManager-based async Redis
//!   ├── Memory(InMemoryStore)    <- per-entry TTL, process-local
//!   └── NoOp(NoOpStore)          <- always-miss, always-succeed fallback
//! ```
//!
//! The cache owns no authoritative state for this service: entries belong to
//! the external cache, handlers hold only transient copies. Failures surface
//! as typed errors; nothing here substitutes default values.

pub mod errors;
pub mod provider;
pub mod providers;
pub mod traits;
pub mod window;

pub use errors::{CacheError, CacheResult};
pub use provider::CacheProvider;
pub use providers::{InMemoryStore, NoOpStore, RedisStore};
pub use traits::CacheStore;
pub use window::PendingWindow;
