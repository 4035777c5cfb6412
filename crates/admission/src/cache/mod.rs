//! Cache-aside data access.
//!
//! # Key Patterns
//!
//! Keys are opaque caller-chosen strings. No namespacing is applied here;
//! callers own collision avoidance (e.g. `user:{id}`, `ratelimit:{window}`).

pub mod backend;
pub mod lua_scripts;
pub mod memory;
pub mod redis;
pub mod store;

pub use backend::{CacheBackend, KeyTtl};
pub use memory::InMemoryCacheBackend;
pub use self::redis::RedisCacheBackend;
pub use store::{CacheConfig, CacheStore, DEFAULT_OP_TIMEOUT};
