//! Date bookkeeping for scheduled quote posts.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rand::Rng;

use super::QuoteError;
use super::source::Quote;
use crate::telegram::escape_html;

/// Format of the dates kept in the cache message.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Earliest and latest hour a quote may be posted at.
const POST_HOURS: std::ops::RangeInclusive<u32> = 8..=20;

/// Parses the cache message: a JSON array of `YYYY-MM-DD` strings.
///
/// Blank entries are ignored.
///
/// # Errors
///
/// [`QuoteError::Cache`] if the text is not such an array.
pub fn parse_cache(text: &str) -> Result<Vec<NaiveDate>, QuoteError> {
    let raw: Vec<String> =
        serde_json::from_str(text).map_err(|e| QuoteError::Cache(e.to_string()))?;

    raw.iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map_err(|e| QuoteError::Cache(format!("{s}: {e}")))
        })
        .collect()
}

/// Picks `count` dates to post on.
///
/// Starts the day after the latest cached date (or tomorrow when nothing is
/// cached) and skips dates already in the cache.
#[must_use]
pub fn next_dates(existing: &[NaiveDate], today: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let taken: BTreeSet<NaiveDate> = existing.iter().copied().collect();
    let start = taken.last().copied().unwrap_or(today);

    start
        .iter_days()
        .skip(1)
        .filter(|date| !taken.contains(date))
        .take(count)
        .collect()
}

/// A random posting time between 08:00 and 20:59 on `date`.
pub fn random_slot<R: Rng>(date: NaiveDate, rng: &mut R) -> NaiveDateTime {
    let hour = rng.gen_range(POST_HOURS);
    let minute = rng.gen_range(0..60);
    // Both components are in range by construction.
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(time)
}

/// Union of both lists, sorted and without duplicates.
#[must_use]
pub fn merge_dates(existing: &[NaiveDate], scheduled: &[NaiveDate]) -> Vec<NaiveDate> {
    existing
        .iter()
        .chain(scheduled)
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Renders dates back into the cache message format.
///
/// # Errors
///
/// Only if JSON serialization fails.
pub fn render_cache(dates: &[NaiveDate]) -> Result<String, QuoteError> {
    let strings: Vec<String> = dates
        .iter()
        .map(|d| d.format(DATE_FORMAT).to_string())
        .collect();
    serde_json::to_string_pretty(&strings).map_err(|e| QuoteError::Cache(e.to_string()))
}

/// HTML body of a quote post.
#[must_use]
pub fn format_quote(quote: &Quote, username: &str) -> String {
    format!(
        "<b>Quote of the day:</b>\n\n<b>{}</b>\nby <i>{}</i>\n\n<i>Follow @{} for more!</i>",
        escape_html(&quote.text),
        escape_html(&quote.author),
        username.trim_start_matches('@'),
    )
}
