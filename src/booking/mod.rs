pub mod browser;
pub mod foreup;
pub mod golfrev;
pub mod provider;
pub mod retry;
pub mod session;

pub use browser::{GolfRevRendered, RenderSettings};
pub use foreup::ForeUp;
pub use golfrev::GolfRev;
pub use provider::TeeTimeProvider;
pub use retry::RetryPolicy;
pub use session::HttpSettings;

use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::models::{BookingSoftware, TeeTime};
use crate::db::CourseCatalog;
use crate::error::ScrapeError;

/// Everything the adapters need to know about how to talk to providers.
#[derive(Debug, Clone, Default)]
pub struct ScraperSettings {
    pub http: HttpSettings,
    pub retry: RetryPolicy,
    pub render: RenderSettings,
}

/// Resolves a course to its booking platform and runs that platform's
/// adapter. One adapter per [`BookingSoftware`] variant.
pub struct Dispatcher {
    catalog: Arc<dyn CourseCatalog>,
    foreup: ForeUp,
    golfrev: GolfRev,
    golfrev_rendered: GolfRevRendered,
}

impl Dispatcher {
    pub fn new(catalog: Arc<dyn CourseCatalog>, settings: ScraperSettings) -> Self {
        Dispatcher {
            catalog,
            foreup: ForeUp::new(settings.http.clone(), settings.retry.clone()),
            golfrev: GolfRev::new(settings.http, settings.retry),
            golfrev_rendered: GolfRevRendered::new(settings.render),
        }
    }

    fn provider_for(&self, software: BookingSoftware) -> &dyn TeeTimeProvider {
        match software {
            BookingSoftware::ForeUp => &self.foreup,
            BookingSoftware::GolfRev => &self.golfrev,
            BookingSoftware::GolfRevRendered => &self.golfrev_rendered,
        }
    }

    /// Today's tee times for `course_id`.
    pub async fn fetch_tee_times(&self, course_id: i64) -> Result<Vec<TeeTime>, ScrapeError> {
        self.fetch_tee_times_on(course_id, Local::now().date_naive())
            .await
    }

    pub async fn fetch_tee_times_on(
        &self,
        course_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<TeeTime>, ScrapeError> {
        let course = self
            .catalog
            .get_course_by_id(course_id)
            .await
            .map_err(|e| ScrapeError::Catalog(e.to_string()))?
            .ok_or(ScrapeError::CourseNotFound(course_id))?;

        let software: BookingSoftware = course.booking_software.parse()?;
        let provider = self.provider_for(software);
        debug!(
            "Dispatching course {} ('{}', {}) to {}",
            course.id,
            course.name,
            software,
            provider.name()
        );

        let tee_times = provider.fetch_tee_times(&course, date).await?;
        info!(
            "Course {} ('{}'): {} tee time(s) via {}",
            course.id,
            course.name,
            tee_times.len(),
            provider.name()
        );
        Ok(tee_times)
    }
}
