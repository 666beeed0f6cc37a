//! Per-scrape HTTP session: one cookie jar, browser-looking headers, and the
//! priming request both booking platforms need before they hand out data.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::ScrapeError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const HTML_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";

/// Settings shared by every HTTP-based adapter.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            request_timeout: Duration::from_secs(15),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// A client with its own cookie store. Build one per scrape so concurrent
/// jobs never share provider cookies.
pub struct HttpSession {
    http: Client,
}

impl HttpSession {
    pub fn new(settings: &HttpSettings) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        let ua = HeaderValue::from_str(&settings.user_agent)
            .map_err(|e| ScrapeError::HttpClient(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, ua);
        headers.insert(ACCEPT, HeaderValue::from_static(HTML_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));

        let http = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .default_headers(headers)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| ScrapeError::HttpClient(e.to_string()))?;
        Ok(HttpSession { http })
    }

    /// GET the booking page so the provider sets its session cookies.
    /// The body is thrown away; anything but 2xx is fatal for this scrape.
    pub async fn prime(&self, booking_url: &str, referer: &str) -> Result<(), ScrapeError> {
        let failed = |reason: String| ScrapeError::SessionBootstrapFailed {
            url: booking_url.to_string(),
            reason,
        };

        debug!("Priming session at {} (referer {})", booking_url, referer);
        let resp = self
            .http
            .get(booking_url)
            .header(REFERER, referer)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {}", status)));
        }
        // Drain so the connection can be reused
        let _ = resp.bytes().await;
        Ok(())
    }

    /// GET on the same cookie jar, with the booking page as referer.
    pub fn get(&self, url: &str, referer: &str) -> RequestBuilder {
        self.http.get(url).header(REFERER, referer)
    }
}

/// `https://host[:port]/` for the given page, used as the priming referer.
/// Falls back to the page itself if it doesn't parse as a URL.
pub fn site_origin(page_url: &str) -> String {
    match Url::parse(page_url) {
        Ok(url) if url.has_host() => format!("{}/", url.origin().ascii_serialization()),
        _ => page_url.to_string(),
    }
}
