//! Slot-availability engine.
//!
//! Turns member calendars into a date-grouped list of bookable slots:
//! tile each working day into fixed-size intervals, keep the intervals
//! where every member with calendar data is free, and drop anything the
//! caller has already booked. Pure functions only; fetching calendars is
//! the `calendar` module's job.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::SlotId;

/// Tiling parameters for the availability computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotConfig {
    pub slot_minutes: u32,
    pub workday_start: NaiveTime,
    pub workday_end: NaiveTime,
    /// Number of working days to offer, starting the day after the
    /// reference date. Weekends are skipped.
    pub lookahead_days: u32,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            slot_minutes: 30,
            workday_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            workday_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            lookahead_days: 5,
        }
    }
}

/// A busy interval on one member's calendar, in naive local time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl BusyInterval {
    /// Half-open overlap test: touching boundaries do not conflict, so a
    /// meeting ending at 09:30 leaves the 09:30 slot free.
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start < end && self.end > start
    }
}

/// One bookable interval on a specific day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub slot_id: SlotId,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Slot {
    /// Display form used on the wire and in confirmation emails,
    /// e.g. "09:00 - 09:30".
    pub fn time_range(&self) -> String {
        format!(
            "{} - {}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// Busy intervals for one member on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDayAvailability {
    pub member_email: String,
    pub busy: Vec<BusyInterval>,
}

/// All member calendars that could be fetched for one day.
///
/// Members whose calendar fetch failed are omitted from `members`
/// entirely: the day degrades to the members we do know about, and a day
/// where nobody could be fetched yields no slots at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub members: Vec<MemberDayAvailability>,
}

impl DayAvailability {
    /// Emails of the members (among those with calendar data) free for
    /// the whole of [start, end) on this day.
    pub fn members_free_during(&self, start: NaiveTime, end: NaiveTime) -> Vec<&str> {
        let slot_start = self.date.and_time(start);
        let slot_end = self.date.and_time(end);
        self.members
            .iter()
            .filter(|m| !m.busy.iter().any(|b| b.overlaps(slot_start, slot_end)))
            .map(|m| m.member_email.as_str())
            .collect()
    }
}

/// Derives the stable identifier of a slot: the first 16 hex characters
/// of SHA-256 over `team|date|start|end`.
///
/// Every availability computation over the same inputs produces the same
/// id, which is what lets a client-side selection be re-validated at
/// commit time.
pub fn derive_slot_id(team: &str, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> SlotId {
    let mut hasher = Sha256::new();
    hasher.update(
        format!(
            "{}|{}|{}|{}",
            team,
            date.format("%Y-%m-%d"),
            start.format("%H:%M"),
            end.format("%H:%M")
        )
        .as_bytes(),
    );
    let digest = hasher.finalize();
    SlotId(hex::encode(digest)[..16].to_string())
}

/// The next `count` working days strictly after `from`, skipping
/// Saturdays and Sundays.
pub fn upcoming_working_days(from: NaiveDate, count: u32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count as usize);
    let mut day = from;
    while days.len() < count as usize {
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(day);
        }
    }
    days
}

/// Parses a "HH:MM - HH:MM" display range back into times.
pub fn parse_time_range(s: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (start, end) = s.split_once('-')?;
    let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
    let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;
    (end > start).then_some((start, end))
}

/// Computes the free slots for a team over the given days.
///
/// A slot is free when every member present in that day's availability
/// has no overlapping busy interval. Slots whose id appears in
/// `excluded_slot_ids` (already-committed bookings) are dropped. Days
/// that end up with no free slots are omitted; an empty result map means
/// no availability at all.
pub fn compute_free_slots(
    team_name: &str,
    days: &[DayAvailability],
    config: &SlotConfig,
    excluded_slot_ids: &HashSet<SlotId>,
) -> BTreeMap<NaiveDate, Vec<Slot>> {
    let mut by_date = BTreeMap::new();
    for day in days {
        // Zero members with calendar data means we cannot vouch for
        // anyone's availability that day.
        if day.members.is_empty() {
            continue;
        }
        let slots = free_slots_for_day(team_name, day, config, excluded_slot_ids);
        if !slots.is_empty() {
            by_date.insert(day.date, slots);
        }
    }
    by_date
}

fn free_slots_for_day(
    team_name: &str,
    day: &DayAvailability,
    config: &SlotConfig,
    excluded_slot_ids: &HashSet<SlotId>,
) -> Vec<Slot> {
    let step = Duration::minutes(i64::from(config.slot_minutes));
    if step <= Duration::zero() {
        return Vec::new();
    }

    let day_end = day.date.and_time(config.workday_end);
    let mut slots = Vec::new();
    let mut cursor = day.date.and_time(config.workday_start);

    while cursor + step <= day_end {
        let slot_start = cursor;
        let slot_end = cursor + step;
        cursor = slot_end;

        let everyone_free = day.members.iter().all(|member| {
            !member
                .busy
                .iter()
                .any(|busy| busy.overlaps(slot_start, slot_end))
        });
        if !everyone_free {
            continue;
        }

        let slot_id = derive_slot_id(team_name, day.date, slot_start.time(), slot_end.time());
        if excluded_slot_ids.contains(&slot_id) {
            continue;
        }

        slots.push(Slot {
            slot_id,
            start: slot_start.time(),
            end: slot_end.time(),
        });
    }
    slots
}
