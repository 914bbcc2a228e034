//! Concrete cache backends

pub mod memory;
pub mod noop;
pub mod redis;

pub use memory::InMemoryStore;
pub use noop::NoOpStore;
pub use redis::RedisStore;
