use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, info};

use super::provider::{check_status, fill_date, TeeTimeProvider};
use super::retry::{AttemptError, RetryPolicy};
use super::session::{site_origin, HttpSession, HttpSettings};
use crate::db::models::{GolfCourse, TeeTime};
use crate::error::ScrapeError;

/// One availability card on a GolfRev tee sheet.
pub const CARD_SELECTOR: &str = "div.v-card";
const TITLE_SELECTOR: &str = ".v-card-title";
const SUBTITLE_SELECTOR: &str = ".v-card-subtitle";

static CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(CARD_SELECTOR).expect("valid card selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(TITLE_SELECTOR).expect("valid title selector"));
static SUBTITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(SUBTITLE_SELECTOR).expect("valid subtitle selector"));

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));
static PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s*(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)").expect("valid regex")
});

/// Adapter for GolfRev-style booking sites, which render the tee sheet as
/// server-side HTML cards.
pub struct GolfRev {
    http: HttpSettings,
    retry: RetryPolicy,
}

impl GolfRev {
    pub fn new(http: HttpSettings, retry: RetryPolicy) -> Self {
        GolfRev { http, retry }
    }

    /// GolfRev wants `M/d/yyyy`, URL-escaped.
    pub fn format_date(date: NaiveDate) -> String {
        let plain = date.format("%-m/%-d/%Y").to_string();
        url::form_urlencoded::byte_serialize(plain.as_bytes()).collect()
    }
}

#[async_trait]
impl TeeTimeProvider for GolfRev {
    fn name(&self) -> &'static str {
        "GolfRev"
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
                debug!("[GolfRev] GET {} (attempt {})", url, attempt);
                fetch_once(&session, &url, referer)
            })
            .await?;

        info!(
            "[GolfRev] {} tee time(s) for '{}' on {}",
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
        .send()
        .await
        .map_err(|e| AttemptError::Failed(format!("request failed: {e}")))?;

    check_status(resp.status())?;

    let body = resp
        .text()
        .await
        .map_err(|e| AttemptError::Failed(format!("failed to read body: {e}")))?;

    Ok(extract_cards(&body))
}

/// Pull every complete availability card out of a GolfRev page.
///
/// A page with no cards is just an empty tee sheet. Cards missing the time,
/// course name, "players" line or `$` price, or whose numbers don't parse,
/// are skipped.
pub fn extract_cards(html: &str) -> Vec<TeeTime> {
    let document = Html::parse_document(html);
    let mut total = 0usize;
    let tee_times: Vec<TeeTime> = document
        .select(&CARD)
        .inspect(|_| total += 1)
        .filter_map(parse_card)
        .collect();

    if tee_times.len() < total {
        debug!(
            "[GolfRev] dropped {} incomplete card(s)",
            total - tee_times.len()
        );
    }
    tee_times
}

fn parse_card(card: ElementRef<'_>) -> Option<TeeTime> {
    let time = first_text(card, &TITLE)?;
    let course_name = first_text(card, &SUBTITLE)?;

    let lines = body_lines(card);

    let players_line = lines
        .iter()
        .find(|line| line.to_lowercase().contains("players"))?;
    let available_spots: u32 = DIGITS.find(players_line)?.as_str().parse().ok()?;

    let green_fee: f64 = lines
        .iter()
        .find_map(|line| PRICE.captures(line))?
        .get(1)?
        .as_str()
        .replace(',', "")
        .parse()
        .ok()?;

    Some(TeeTime {
        time,
        course_name,
        available_spots,
        green_fee,
    })
}

/// Trimmed, non-empty text nodes of `card` outside its title and subtitle.
fn body_lines<'a>(card: ElementRef<'a>) -> Vec<&'a str> {
    card.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let in_header = node
                .ancestors()
                .take_while(|a| a.id() != card.id())
                .filter_map(ElementRef::wrap)
                .any(|el| TITLE.matches(&el) || SUBTITLE.matches(&el));
            let line = text.trim();
            (!in_header && !line.is_empty()).then_some(line)
        })
        .collect()
}

/// Whitespace-collapsed text of the first match of `selector` inside `card`.
fn first_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let el = card.select(selector).next()?;
    let text = el.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}
