//! Cache fixtures.

use admission::cache::backend::mock::MockCacheBackend;
use admission::cache::CacheStore;
use std::sync::Arc;
use std::time::Duration;

pub use admission::cache::backend::mock::FailureMode;

/// Per-operation timeout used by test stores; short so stalled backends fail fast.
pub const TEST_CACHE_OP_TIMEOUT: Duration = Duration::from_millis(200);

/// A store over a mock backend in the given failure mode, plus the backend for
/// call counting.
pub fn mock_store(mode: FailureMode) -> (CacheStore, Arc<MockCacheBackend>) {
    let backend = Arc::new(MockCacheBackend::new(mode));
    let store = CacheStore::new(backend.clone(), TEST_CACHE_OP_TIMEOUT);
    (store, backend)
}
