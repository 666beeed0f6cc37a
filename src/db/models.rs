use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScrapeError;

/// A golf course as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GolfCourse {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Raw booking-software tag, e.g. "foreup" | "golfrev".
    /// Only turned into a [`BookingSoftware`] when a scrape is dispatched.
    pub booking_software: String,
    /// Availability endpoint with a literal `{DATE}` placeholder
    pub fetch_url: String,
    /// Public booking page, used to prime cookies
    pub booking_url: String,
}

/// One bookable slot, normalized across providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeeTime {
    /// 12-hour display time, e.g. "7:30 AM"
    pub time: String,
    pub course_name: String,
    pub available_spots: u32,
    pub green_fee: f64,
}

/// Booking platforms we know how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingSoftware {
    /// JSON availability API
    ForeUp,
    /// Server-rendered HTML cards
    GolfRev,
    /// GolfRev cards injected by client-side script; needs a real browser
    GolfRevRendered,
}

impl BookingSoftware {
    pub fn tag(&self) -> &'static str {
        match self {
            BookingSoftware::ForeUp => "foreup",
            BookingSoftware::GolfRev => "golfrev",
            BookingSoftware::GolfRevRendered => "golfrev-rendered",
        }
    }
}

impl fmt::Display for BookingSoftware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for BookingSoftware {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "foreup" => Ok(BookingSoftware::ForeUp),
            "golfrev" => Ok(BookingSoftware::GolfRev),
            "golfrev-rendered" => Ok(BookingSoftware::GolfRevRendered),
            _ => Err(ScrapeError::UnsupportedProvider(s.to_string())),
        }
    }
}
