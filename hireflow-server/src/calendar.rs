//! HTTP calendar provider.
//!
//! Fetches busy intervals from each member's calendar link. The link is
//! opaque to the rest of the system; here it is treated as a JSON
//! endpoint queried per day. Every failure is per-member: the caller
//! drops that member's day and carries on (the availability engine then
//! degrades per spec rather than failing the request).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use hireflow_core::calendar::{CalendarError, CalendarProvider};
use hireflow_core::slots::BusyInterval;

/// Response shape of a calendar endpoint: `{"busy": [{"start", "end"}]}`.
#[derive(Debug, Deserialize)]
struct BusyResponse {
    #[serde(default)]
    busy: Vec<WireInterval>,
}

#[derive(Debug, Deserialize)]
struct WireInterval {
    start: String,
    end: String,
}

/// Accepts both naive local date-times and RFC 3339 with an offset;
/// offsets are dropped, since the whole deployment runs on one local
/// time convention.
fn parse_wire_datetime(value: &str) -> Option<NaiveDateTime> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_local())
        .ok()
}

pub struct HttpCalendarProvider {
    client: reqwest::Client,
}

impl HttpCalendarProvider {
    pub fn new(timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl CalendarProvider for HttpCalendarProvider {
    async fn busy_intervals(
        &self,
        calendar_link: &str,
        date: NaiveDate,
    ) -> Result<Vec<BusyInterval>, CalendarError> {
        let response = self
            .client
            .get(calendar_link)
            .query(&[("date", date.format("%Y-%m-%d").to_string())])
            .send()
            .await
            .map_err(|e| CalendarError::fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CalendarError::fetch(format!(
                "calendar endpoint returned {}",
                response.status()
            )));
        }

        let body: BusyResponse = response
            .json()
            .await
            .map_err(|e| CalendarError::malformed(e.to_string()))?;

        let mut intervals = Vec::with_capacity(body.busy.len());
        for interval in body.busy {
            let (Some(start), Some(end)) = (
                parse_wire_datetime(&interval.start),
                parse_wire_datetime(&interval.end),
            ) else {
                return Err(CalendarError::malformed(format!(
                    "unparseable interval {} - {}",
                    interval.start, interval.end
                )));
            };
            if end <= start {
                // An inverted interval blocks nothing; skip it.
                continue;
            }
            intervals.push(BusyInterval { start, end });
        }
        Ok(intervals)
    }
}
