//! Client configuration
//!
//! All tunables live in an explicit [`ClientConfig`] passed to constructors;
//! there is no process-wide state and no environment lookup inside the
//! library. Credentials and transport settings belong to the HTTP
//! collaborator and are deliberately absent here.

use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;

/// Default page size for paginated `get` calls.
/// The platform accepts up to 10 000 objects per request; 200 keeps response
/// bodies small enough to parse quickly while staying well under quota cost.
pub const DEFAULT_PAGE_LIMIT: u64 = 200;

/// Maximum number of pages fetched before pagination aborts.
/// The server is expected to eventually return an empty continuation token;
/// this cap turns a misbehaving server into an error instead of a hang.
pub const MAX_PAGES: u64 = 10_000;

/// Default identifier count per chunked request.
/// Mutation endpoints reject oversized identifier lists; 500 matches the
/// platform's documented per-call ceiling for campaign selections.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Retry attempts requested when the caller does not supply a policy.
/// Out-of-range values are clamped at policy construction, see
/// [`crate::client::retry::RetryPolicy`].
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 12;

/// First-attempt backoff delay in seconds.
/// Attempt `i` sleeps `base * 2^i`, so 10 seconds gives the platform's
/// temporarily-unavailable state time to clear before the next try.
pub const DEFAULT_RETRY_BASE_SECS: u64 = 10;

/// Calculate the exponential backoff delay for a retry attempt.
///
/// Attempt numbering starts at 0, matching the retrier's counter.
pub fn calculate_backoff(base_secs: u64, attempt: u32) -> Duration {
    Duration::from_secs(base_secs.saturating_mul(2u64.saturating_pow(attempt)))
}

/// Explicit configuration for an [`crate::ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Directory holding cached call results, one JSON file per key.
    pub cache_dir: PathBuf,
    /// File prefix identifying this client/account in cache keys.
    pub file_prefix: String,
    /// Whether memoization is active; when false every call hits the API.
    pub cache: bool,
    /// Fixed reference date for cache keys; `None` uses today's date.
    pub reference_date: Option<NaiveDate>,
    /// Page size for paginated calls.
    pub page_limit: u64,
    /// Safety cap on pages per paginated call.
    pub max_pages: u64,
    /// Identifier count per chunked call.
    pub chunk_size: usize,
    /// Requested retry attempts (clamped by the retry policy).
    pub retry_attempts: u32,
    /// Requested first-attempt backoff in seconds (clamped likewise).
    pub retry_base_secs: u64,
}

impl ClientConfig {
    /// Build a configuration with the stock limits for the given cache
    /// directory and file prefix.
    pub fn new(cache_dir: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            file_prefix: file_prefix.into(),
            cache: true,
            reference_date: None,
            page_limit: DEFAULT_PAGE_LIMIT,
            max_pages: MAX_PAGES,
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_secs: DEFAULT_RETRY_BASE_SECS,
        }
    }

    /// Disable result caching.
    pub fn without_cache(mut self) -> Self {
        self.cache = false;
        self
    }

    /// Pin cache keys to an explicit reference date instead of today.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Override the page size.
    pub fn with_page_limit(mut self, limit: u64) -> Self {
        self.page_limit = limit;
        self
    }

    /// Override the pagination safety cap.
    pub fn with_max_pages(mut self, max_pages: u64) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Override the chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Override the retry attempt count (clamped at policy construction).
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Override the first-attempt backoff (clamped at policy construction).
    pub fn with_retry_base_secs(mut self, secs: u64) -> Self {
        self.retry_base_secs = secs;
        self
    }
}
