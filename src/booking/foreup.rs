use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::{debug, info};

use super::provider::{check_status, fill_date, TeeTimeProvider};
use super::retry::{AttemptError, RetryPolicy};
use super::session::{site_origin, HttpSession, HttpSettings};
use crate::db::models::{GolfCourse, TeeTime};
use crate::error::ScrapeError;

/// Adapter for ForeUp-style booking sites, which serve availability as a JSON
/// array from an XHR endpoint behind a cookie-primed session.
pub struct ForeUp {
    http: HttpSettings,
    retry: RetryPolicy,
}

impl ForeUp {
    pub fn new(http: HttpSettings, retry: RetryPolicy) -> Self {
        ForeUp { http, retry }
    }

    /// ForeUp wants `MM-dd-yyyy`.
    pub fn format_date(date: NaiveDate) -> String {
        date.format("%m-%d-%Y").to_string()
    }
}

#[async_trait]
impl TeeTimeProvider for ForeUp {
    fn name(&self) -> &'static str {
        "ForeUp"
    }

    async fn fetch_tee_times(
        &self,
        course: &GolfCourse,
        date: NaiveDate,
    ) -> Result<Vec<TeeTime>, ScrapeError> {
        let session = HttpSession::new(&self.http)?;
        session
            .prime(&course.booking_url, &site_origin(&course.booking_url))
            .await?;

        let url = fill_date(&course.fetch_url, &Self::format_date(date));
        let referer = course.booking_url.as_str();
        let tee_times = self
            .retry
            .run(self.name(), |attempt| {
                debug!("[ForeUp] GET {} (attempt {})", url, attempt);
                fetch_once(&session, &url, referer)
            })
            .await?;

        info!(
            "[ForeUp] {} tee time(s) for '{}' on {}",
            tee_times.len(),
            course.name,
            date
        );
        Ok(tee_times)
    }
}

async fn fetch_once(
    session: &HttpSession,
    url: &str,
    referer: &str,
) -> Result<Vec<TeeTime>, AttemptError> {
    let resp = session
        .get(url, referer)
        .header(ACCEPT, "application/json, text/javascript, */*; q=0.01")
        .header("X-Requested-With", "XMLHttpRequest")
        .send()
        .await
        .map_err(|e| AttemptError::Failed(format!("request failed: {e}")))?;

    check_status(resp.status())?;

    let body = resp
        .text()
        .await
        .map_err(|e| AttemptError::Failed(format!("failed to read body: {e}")))?;

    parse_tee_times(&body).map_err(AttemptError::Failed)
}

/// Parse a ForeUp availability response.
///
/// The body must be a JSON array; anything else is an error for the whole
/// attempt. Individual entries missing `time`, `course_name`,
/// `available_spots` or `green_fee`, or carrying values that don't parse, are
/// skipped.
pub fn parse_tee_times(body: &str) -> Result<Vec<TeeTime>, String> {
    let raw: Value =
        serde_json::from_str(body).map_err(|e| format!("invalid ForeUp JSON: {e}"))?;
    let items = raw
        .as_array()
        .ok_or_else(|| "ForeUp response is not a JSON array".to_string())?;

    let tee_times: Vec<TeeTime> = items.iter().filter_map(parse_record).collect();
    if tee_times.len() < items.len() {
        debug!(
            "[ForeUp] dropped {} incomplete record(s)",
            items.len() - tee_times.len()
        );
    }
    Ok(tee_times)
}

fn parse_record(item: &Value) -> Option<TeeTime> {
    let time = display_time(item["time"].as_str()?)?;
    let course_name = item["course_name"].as_str()?.to_string();

    let available_spots: u32 = item["available_spots"]
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .or_else(|| {
            item["available_spots"]
                .as_str()
                .and_then(|s| s.trim().parse().ok())
        })?;

    let green_fee = item["green_fee"]
        .as_f64()
        .or_else(|| item["green_fee"].as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|fee| fee.is_finite() && *fee >= 0.0)?;

    Some(TeeTime {
        time,
        course_name,
        available_spots,
        green_fee,
    })
}

/// "2025-05-18 07:30" → "7:30 AM"
fn display_time(raw: &str) -> Option<String> {
    let parsed = NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M").ok()?;
    Some(parsed.format("%-I:%M %p").to_string())
}
