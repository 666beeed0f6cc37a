//! In-process HTTP fixtures for tests.

use axum::Router;
use std::sync::Arc;
use std::time::Duration;

use crate::booking::{HttpSettings, RenderSettings, RetryPolicy, ScraperSettings};
use crate::db::models::GolfCourse;
use crate::db::Database;

/// Serve `app` on an ephemeral localhost port and return its base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Scraper settings with no jitter and no backoff.
pub fn fast_settings() -> ScraperSettings {
    ScraperSettings {
        http: HttpSettings {
            request_timeout: Duration::from_secs(5),
            ..HttpSettings::default()
        },
        retry: RetryPolicy {
            max_attempts: 3,
            backoff_step: Duration::ZERO,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
        },
        render: RenderSettings::default(),
    }
}

pub fn course(id: i64, tag: &str, base: &str) -> GolfCourse {
    GolfCourse {
        id,
        name: format!("Course {id}"),
        img: None,
        location: None,
        booking_software: tag.to_string(),
        fetch_url: format!("{base}/api/teetimes?date={{DATE}}"),
        booking_url: format!("{base}/booking"),
    }
}

pub fn catalog_with(courses: &[GolfCourse]) -> Arc<Database> {
    let db = Database::open(":memory:").unwrap();
    for c in courses {
        db.upsert_course(c).unwrap();
    }
    Arc::new(db)
}
