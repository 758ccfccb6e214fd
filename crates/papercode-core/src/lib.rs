//! papercode-core - Common infrastructure for the warehouse ingestion pipeline
//!
//! Shared HTTP plumbing, retry/backoff, request throttling, logging and
//! progress reporting used by the warehouse, crawler and pipeline crates.

pub mod logging;
pub mod progress;
pub mod rate_limit;
pub mod retry;
pub mod stream;

// Re-exports for convenience
pub use logging::{IndicatifLogger, init_logging};
pub use progress::ProgressContext;
pub use rate_limit::RateLimiter;
pub use retry::{Retryable, backoff_duration, retry_with_backoff};
pub use stream::{SHARED_RUNTIME, StreamError, download_to_file, fetch_text, http_client};
