use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;

use super::retry::AttemptError;
use crate::db::models::{GolfCourse, TeeTime};
use crate::error::ScrapeError;

/// Trait that every booking-platform adapter must implement.
#[async_trait]
pub trait TeeTimeProvider: Send + Sync {
    /// Fetch the tee times `course` offers on `date`.
    async fn fetch_tee_times(
        &self,
        course: &GolfCourse,
        date: NaiveDate,
    ) -> Result<Vec<TeeTime>, ScrapeError>;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;
}

/// Substitute the provider-formatted date into a course's fetch URL.
pub fn fill_date(template: &str, date: &str) -> String {
    template.replace("{DATE}", date)
}

/// Map a data-request status onto the retry controller's view of it.
pub fn check_status(status: StatusCode) -> Result<(), AttemptError> {
    if status == StatusCode::FORBIDDEN {
        Err(AttemptError::Blocked)
    } else if !status.is_success() {
        Err(AttemptError::Failed(format!("HTTP {}", status)))
    } else {
        Ok(())
    }
}
