//! Headless-browser path for booking pages whose cards are injected by
//! client-side script. Each call launches its own Chrome with a throwaway
//! profile, renders the booking page, waits for the first card to show up and
//! then runs the same card extraction the plain-HTTP GolfRev adapter uses.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chrono::NaiveDate;
use futures_util::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::golfrev::{extract_cards, CARD_SELECTOR};
use super::provider::TeeTimeProvider;
use crate::db::models::{GolfCourse, TeeTime};
use crate::error::ScrapeError;

#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// How long to wait for the card container to appear
    pub wait_timeout: Duration,
    /// How often to look for it meanwhile
    pub poll_interval: Duration,
    /// Use this Chrome/Chromium binary instead of auto-detecting one
    pub chrome_executable: Option<PathBuf>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            wait_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(250),
            chrome_executable: None,
        }
    }
}

/// GolfRev booking pages that only fill in their tee sheet after script runs.
pub struct GolfRevRendered {
    settings: RenderSettings,
}

impl GolfRevRendered {
    pub fn new(settings: RenderSettings) -> Self {
        GolfRevRendered { settings }
    }

    /// Render `booking_url` in a fresh browser and extract its cards.
    /// The browser is torn down whether this succeeds or not.
    pub async fn render_and_extract(&self, booking_url: &str) -> Result<Vec<TeeTime>, ScrapeError> {
        let session = BrowserSession::launch(&self.settings).await?;
        let rendered = session
            .render(
                booking_url,
                CARD_SELECTOR,
                self.settings.wait_timeout,
                self.settings.poll_interval,
            )
            .await;
        session.close().await;

        Ok(extract_cards(&rendered?))
    }
}

#[async_trait]
impl TeeTimeProvider for GolfRevRendered {
    fn name(&self) -> &'static str {
        "GolfRev (rendered)"
    }

    async fn fetch_tee_times(
        &self,
        course: &GolfCourse,
        date: NaiveDate,
    ) -> Result<Vec<TeeTime>, ScrapeError> {
        // The booking page shows today's sheet; the date only goes in the log.
        let tee_times = self.render_and_extract(&course.booking_url).await?;
        info!(
            "[GolfRev rendered] {} tee time(s) for '{}' on {}",
            tee_times.len(),
            course.name,
            date
        );
        Ok(tee_times)
    }
}

/// One launched browser plus the task pumping its CDP connection.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    profile_dir: PathBuf,
}

impl BrowserSession {
    async fn launch(settings: &RenderSettings) -> Result<Self, ScrapeError> {
        let profile_dir =
            std::env::temp_dir().join(format!("teetime-chrome-{}", uuid::Uuid::new_v4()));

        let mut builder = BrowserConfig::builder()
            .request_timeout(settings.wait_timeout)
            .user_data_dir(&profile_dir);
        if let Some(path) = &settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(ScrapeError::Browser)?;

        debug!("Launching headless browser (profile {})", profile_dir.display());
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Browser(format!("launch failed: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(BrowserSession {
            browser,
            handler,
            profile_dir,
        })
    }

    /// Navigate, wait for `selector`, and return the rendered DOM as HTML.
    async fn render(
        &self,
        url: &str,
        selector: &str,
        wait: Duration,
        poll: Duration,
    ) -> Result<String, ScrapeError> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| ScrapeError::Browser(format!("navigation to {url} failed: {e}")))?;

        let appeared = tokio::time::timeout(wait, async {
            loop {
                if page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(poll).await;
            }
        })
        .await;

        if appeared.is_err() {
            return Err(ScrapeError::RenderTimeout {
                url: url.to_string(),
                selector: selector.to_string(),
                waited: wait,
            });
        }

        page.content()
            .await
            .map_err(|e| ScrapeError::Browser(format!("failed to read rendered page: {e}")))
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Browser process did not exit cleanly: {}", e);
        }
        self.handler.abort();
        if let Err(e) = tokio::fs::remove_dir_all(&self.profile_dir).await {
            debug!("Could not remove {}: {}", self.profile_dir.display(), e);
        }
        debug!("Headless browser torn down");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Covers sessions dropped without `close()`, e.g. a cancelled future.
        self.handler.abort();
    }
}
