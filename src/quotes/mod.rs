//! Daily quote posts scheduled into a channel.
//!
//! Already scheduled days are remembered in a "cache" message: a Telegram
//! message whose text is a JSON array of dates. Each run extends the
//! schedule past the last cached day and rewrites the cache.

mod rate_limiter;
mod schedule;
mod source;

use std::fmt;
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::QuotesConfig;
use crate::telegram::{ChatApi, OutgoingMessage, TelegramError};

pub use rate_limiter::RateLimiter;
pub use schedule::{DATE_FORMAT, format_quote, merge_dates, next_dates, parse_cache, random_slot, render_cache};
pub use source::{Quote, QuoteSource, ZenQuotes};

/// Errors raised while scheduling quotes.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("Failed to parse cache: {0}")]
    Cache(String),

    #[error("Cache message not found")]
    CacheMissing,

    #[error("Quote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected quote API response: {0}")]
    BadResponse(String),

    #[error("No local time for {0}")]
    InvalidTime(NaiveDateTime),

    #[error(transparent)]
    Telegram(#[from] TelegramError),
}

/// What happened to the cache message at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheUpdate {
    Updated,
    Unchanged,
    Failed(String),
}

/// Outcome of one scheduling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleReport {
    pub scheduled: Vec<NaiveDate>,
    /// Dates that could not be scheduled, with the reason.
    pub failures: Vec<(NaiveDate, String)>,
    pub cache: CacheUpdate,
}

impl fmt::Display for ScheduleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (date, reason) in &self.failures {
            writeln!(f, "❌ Failed to schedule quote for {}: {}", date.format(DATE_FORMAT), reason)?;
        }
        match &self.cache {
            CacheUpdate::Updated => write!(f, "✅ Quotes scheduled successfully!"),
            CacheUpdate::Unchanged => write!(f, "✅ Quotes scheduled, but no change to cache."),
            CacheUpdate::Failed(reason) => {
                write!(f, "✅ Quotes scheduled, but failed to update cache: {reason}")
            }
        }
    }
}

/// Schedules quote posts and keeps the date cache current.
pub struct QuoteScheduler {
    api: Arc<dyn ChatApi>,
    source: Arc<dyn QuoteSource>,
    config: QuotesConfig,
    limiter: RateLimiter,
}

impl QuoteScheduler {
    #[must_use]
    pub fn new(api: Arc<dyn ChatApi>, source: Arc<dyn QuoteSource>, config: QuotesConfig) -> Self {
        let limiter = RateLimiter::new(config.cooldown);
        Self {
            api,
            source,
            config,
            limiter,
        }
    }

    /// Schedules `count` quotes on the days following the cached ones.
    ///
    /// A date that fails is reported and skipped; it stays out of the cache.
    ///
    /// # Errors
    ///
    /// Only when the cache message cannot be read or parsed. Nothing is
    /// scheduled in that case.
    pub async fn schedule(&self, count: usize, today: NaiveDate) -> Result<ScheduleReport, QuoteError> {
        let cache = self
            .api
            .get_message(self.config.cache_chat_id, self.config.cache_message_id)
            .await?
            .ok_or(QuoteError::CacheMissing)?;
        let existing = parse_cache(&cache.text)?;

        let mut scheduled = Vec::new();
        let mut failures = Vec::new();

        for date in next_dates(&existing, today, count) {
            match self.schedule_one(date).await {
                Ok(()) => scheduled.push(date),
                Err(e) => {
                    warn!("Failed to schedule quote for {}: {}", date, e);
                    failures.push((date, e.to_string()));
                }
            }
        }

        let merged = merge_dates(&existing, &scheduled);
        let cache = if merged == existing {
            CacheUpdate::Unchanged
        } else {
            match self.write_cache(&merged).await {
                Ok(()) => CacheUpdate::Updated,
                Err(e) => CacheUpdate::Failed(e.to_string()),
            }
        };

        info!("Scheduled {} of {} quotes", scheduled.len(), count);
        Ok(ScheduleReport {
            scheduled,
            failures,
            cache,
        })
    }

    async fn schedule_one(&self, date: NaiveDate) -> Result<(), QuoteError> {
        self.limiter.wait_and_acquire().await;
        let quote = self.source.fetch().await?;

        let slot = random_slot(date, &mut rand::thread_rng());
        let timestamp = Local
            .from_local_datetime(&slot)
            .earliest()
            .and_then(|at| i32::try_from(at.timestamp()).ok())
            .ok_or(QuoteError::InvalidTime(slot))?;

        let message = OutgoingMessage::html(format_quote(&quote, &self.config.username))
            .scheduled_at(timestamp);
        self.api.send_message(self.config.channel_id, &message).await?;
        Ok(())
    }

    async fn write_cache(&self, dates: &[NaiveDate]) -> Result<(), QuoteError> {
        let text = render_cache(dates)?;
        self.api
            .edit_message(self.config.cache_chat_id, self.config.cache_message_id, &text, false)
            .await?;
        Ok(())
    }
}

impl fmt::Debug for QuoteScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuoteScheduler")
            .field("channel_id", &self.config.channel_id)
            .finish_non_exhaustive()
    }
}
