//! Calendar collaborator boundary.
//!
//! The availability engine needs busy intervals per member per day; how
//! they are fetched (HTTP, fixtures, nothing at all) is behind this trait
//! so the server can degrade gracefully and tests can run without a
//! network.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::slots::BusyInterval;

/// Error fetching or interpreting one member's calendar.
///
/// These are always per-member failures: the caller drops the affected
/// member's day from the availability computation instead of failing the
/// whole request.
#[derive(Debug)]
pub enum CalendarError {
    /// The calendar endpoint could not be reached, timed out, or
    /// returned a non-success status.
    Fetch { detail: String },
    /// The endpoint responded with data that could not be interpreted.
    Malformed { detail: String },
}

impl CalendarError {
    pub fn fetch(detail: impl Into<String>) -> Self {
        Self::Fetch {
            detail: detail.into(),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed {
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for CalendarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch { detail } => write!(f, "calendar fetch failed: {}", detail),
            Self::Malformed { detail } => write!(f, "calendar data malformed: {}", detail),
        }
    }
}

impl std::error::Error for CalendarError {}

/// Source of busy intervals for member calendars.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Fetches the busy intervals recorded on `calendar_link` for `date`.
    ///
    /// Intervals outside `date` may be returned; the slot engine ignores
    /// anything that does not overlap the day being tiled.
    async fn busy_intervals(
        &self,
        calendar_link: &str,
        date: NaiveDate,
    ) -> Result<Vec<BusyInterval>, CalendarError>;
}
