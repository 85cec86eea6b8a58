//! Composable API-call layers
//!
//! Each layer wraps the single "perform one API call" primitive and exposes
//! the same async call signature, so callers stack exactly the layers a
//! given endpoint needs:
//!
//! 1. **Retry**: [`retry::Retrier`] re-runs one call on transient failures
//! 2. **Pagination**: [`pagination::Paginator`] accumulates offset pages
//! 3. **Chunking**: [`chunking::Chunker`] batches identifier lists
//! 4. **Caching**: [`cache::ResultCache`] memoizes the assembled result
//!
//! [`ApiClient`] wires a [`ClientConfig`](crate::config::ClientConfig) into
//! ready-made instances of all four.
//!
//! # Error Handling
//!
//! All layers return `Result<T, ClientError>`. Connectivity and
//! temporarily-unavailable-server errors are classified transient and
//! recovered by the retrier up to its bound; structural errors surface
//! immediately and are never retried.

use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::config::ClientConfig;

pub mod cache;
pub mod chunking;
pub mod pagination;
pub mod retry;

pub use cache::{CacheStore, FileCacheStore, ResultCache};
pub use chunking::{ChunkOutcome, ChunkTracker, Chunker, IdList, MutationResponse};
pub use pagination::{Page, PaginationCursor, Paginator};
pub use retry::{Retrier, RetryPolicy, TransientError};

/// Client-side call errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connection to the API host failed
    #[error("connection error: {0}")]
    Connection(String),

    /// Chunked transfer aborted mid-response
    #[error("chunked transfer error: {0}")]
    ChunkedTransfer(String),

    /// Protocol-level failure below the API layer
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The platform reported itself temporarily unavailable
    #[error("server temporarily unavailable: {0}")]
    ServerUnavailable(String),

    /// API error response (non-retryable)
    #[error("API error: {0}")]
    Api(String),

    /// Malformed caller-supplied input, rejected before any call is made
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Retry budget exhausted on a transient failure
    #[error("retry limit exceeded")]
    RetryLimitExceeded,

    /// Pagination safety cap hit without the server signalling exhaustion
    #[error("pagination exhausted after {pages} pages")]
    PaginationExhausted {
        /// Pages fetched before aborting
        pages: u64,
    },

    /// Cache store write failure
    #[error("cache error: {0}")]
    Cache(String),
}

impl TransientError for ClientError {
    /// Connectivity and temporary-server failures are eligible for retry;
    /// everything else propagates immediately.
    fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::Connection(_)
                | ClientError::ChunkedTransfer(_)
                | ClientError::Protocol(_)
                | ClientError::ServerUnavailable(_)
        )
    }

    fn retry_limit_exceeded() -> Self {
        ClientError::RetryLimitExceeded
    }
}

/// Result type for client-layer operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Facade wiring a [`ClientConfig`] into the call layers.
///
/// The client owns a shared [`ChunkTracker`] so that chunked calls and the
/// result cache agree on the current chunk index and result length.
pub struct ApiClient {
    config: ClientConfig,
    policy: RetryPolicy,
    tracker: Arc<Mutex<ChunkTracker>>,
    cache: ResultCache,
}

impl ApiClient {
    /// Build a client from an explicit configuration.
    pub fn new(config: ClientConfig) -> Self {
        let policy = RetryPolicy::new(config.retry_attempts, config.retry_base_secs);
        let tracker = Arc::new(Mutex::new(ChunkTracker::default()));
        let store = FileCacheStore::new(&config.cache_dir);
        let cache = ResultCache::new(Box::new(store), &config.file_prefix, config.cache)
            .with_reference_date(config.reference_date);
        Self {
            config,
            policy,
            tracker,
            cache,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Turn result caching on.
    pub fn cache_enabled(&mut self) {
        self.config.cache = true;
        self.cache.set_enabled(true);
    }

    /// Turn result caching off.
    pub fn cache_disabled(&mut self) {
        self.config.cache = false;
        self.cache.set_enabled(false);
    }

    /// A retrier carrying this client's (clamped) policy.
    pub fn retrier(&self) -> Retrier {
        Retrier::new(self.policy.clone())
    }

    /// A fresh paginator with this client's page size and safety cap.
    pub fn paginator(&self) -> Paginator {
        Paginator::new(self.config.page_limit, self.config.max_pages)
    }

    /// A chunker sharing this client's chunk tracker.
    pub fn chunker(&self) -> Chunker {
        Chunker::new(self.config.chunk_size).with_tracker(Arc::clone(&self.tracker))
    }

    /// The result cache, bound to this client's chunk tracker so chunked
    /// calls persist only the most recent chunk's slice.
    pub fn cache(&self) -> ResultCache {
        self.cache.clone().with_tracker(Arc::clone(&self.tracker))
    }

    /// Fetch every page of a collection, retrying each page fetch on
    /// transient failures.
    ///
    /// `fetch` receives `(limit, offset)` and returns one [`Page`]; it is the
    /// single-call primitive the retry and pagination layers wrap.
    ///
    /// # Errors
    /// [`ClientError::RetryLimitExceeded`] once a page fetch exhausts the
    /// retry budget, [`ClientError::PaginationExhausted`] if the server never
    /// signals exhaustion, or the first non-transient error.
    pub async fn fetch_all_pages<T, F, Fut>(&self, fetch: F) -> ClientResult<Vec<T>>
    where
        F: Fn(u64, u64) -> Fut,
        Fut: Future<Output = ClientResult<Page<T>>>,
    {
        let retrier = self.retrier();
        let mut paginator = self.paginator();
        let fetch = &fetch;
        let retrier = &retrier;
        paginator
            .fetch_all(move |limit, offset| async move {
                retrier.execute(|| fetch(limit, offset)).await
            })
            .await
    }

    /// Apply `op` across bounded chunks of `ids` and merge the results.
    ///
    /// Shorthand for [`Chunker::apply_chunked`] on [`Self::chunker`].
    pub async fn chunked<F, Fut>(
        &self,
        ids: impl Into<IdList>,
        op: F,
    ) -> ClientResult<ChunkOutcome>
    where
        F: FnMut(Vec<i64>) -> Fut,
        Fut: Future<Output = ClientResult<ChunkOutcome>>,
    {
        self.chunker().apply_chunked(ids, op).await
    }

    /// Memoize a call result under this client's cache and prefix.
    ///
    /// Shorthand for [`ResultCache::memoize`] on [`Self::cache`].
    pub async fn memoized<F, Fut>(&self, op_prefix: &str, producer: F) -> ClientResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<Value>>,
    {
        self.cache().memoize(op_prefix, producer).await
    }
}
