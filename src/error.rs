use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong between "give me tee times for course N" and
/// a normalized list coming back.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("golf course {0} does not exist")]
    CourseNotFound(i64),

    #[error("unsupported booking software '{0}'")]
    UnsupportedProvider(String),

    /// The priming GET to the booking page did not come back 2xx.
    #[error("session bootstrap against {url} failed: {reason}")]
    SessionBootstrapFailed { url: String, reason: String },

    /// Retries exhausted. `attempts` is how many requests were actually made.
    #[error("{provider} fetch failed after {attempts} attempt(s): {last_error}")]
    ProviderFetchFailed {
        provider: &'static str,
        attempts: u32,
        last_error: String,
    },

    #[error("timed out after {waited:?} waiting for '{selector}' on {url}")]
    RenderTimeout {
        url: String,
        selector: String,
        waited: Duration,
    },

    #[error("browser session failed: {0}")]
    Browser(String),

    #[error("scrape job {0} not found")]
    JobNotFound(String),

    #[error("course catalog error: {0}")]
    Catalog(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
