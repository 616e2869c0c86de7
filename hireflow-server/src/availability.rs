//! Glue between the calendar collaborator, the booking records, and the
//! pure slot engine.
//!
//! Fetches each member's busy intervals for the lookahead window,
//! degrades per member on fetch failure, excludes slots already claimed
//! by other invitations, and hands the rest to
//! `hireflow_core::slots::compute_free_slots`.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use tracing::warn;

use hireflow_core::calendar::CalendarProvider;
use hireflow_core::slots::{
    compute_free_slots, upcoming_working_days, DayAvailability, MemberDayAvailability, Slot,
    SlotConfig,
};
use hireflow_core::types::{SlotId, Team};

use crate::state_machine::repository::{Repository, RepositoryError};

/// The availability picture for one team over the lookahead window.
pub struct TeamAvailability {
    /// Free slots, grouped by date in ascending order. Empty means no
    /// availability anywhere in the window.
    pub free: BTreeMap<NaiveDate, Vec<Slot>>,
    /// The raw per-day member data the slots were computed from; kept so
    /// the commit path can resolve which members are free at a slot.
    pub days: Vec<DayAvailability>,
}

impl TeamAvailability {
    /// Finds a free slot by id, with the date it belongs to.
    pub fn find_slot(&self, slot_id: &SlotId) -> Option<(NaiveDate, &Slot)> {
        self.free.iter().find_map(|(date, slots)| {
            slots
                .iter()
                .find(|slot| &slot.slot_id == slot_id)
                .map(|slot| (*date, slot))
        })
    }

    /// Member emails free for the whole of the given slot on `date`.
    pub fn members_free_at(&self, date: NaiveDate, slot: &Slot) -> Vec<String> {
        self.days
            .iter()
            .find(|day| day.date == date)
            .map(|day| {
                day.members_free_during(slot.start, slot.end)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Fetches the member calendars for each date.
///
/// A member without a calendar link is treated as free all day. A member
/// whose fetch fails is dropped from that day only; if nobody on the
/// team could be resolved for a day, that day yields no slots.
pub async fn fetch_days(
    provider: &dyn CalendarProvider,
    team: &Team,
    dates: &[NaiveDate],
) -> Vec<DayAvailability> {
    let mut days = Vec::with_capacity(dates.len());
    for &date in dates {
        let mut members = Vec::with_capacity(team.members.len());
        for member in &team.members {
            let Some(link) = member.calendar_link.as_deref() else {
                members.push(MemberDayAvailability {
                    member_email: member.email.clone(),
                    busy: Vec::new(),
                });
                continue;
            };
            match provider.busy_intervals(link, date).await {
                Ok(busy) => members.push(MemberDayAvailability {
                    member_email: member.email.clone(),
                    busy,
                }),
                Err(e) => {
                    warn!(
                        "Dropping {} from {} availability: {}",
                        member.email, date, e
                    );
                }
            }
        }
        days.push(DayAvailability { date, members });
    }
    days
}

/// Computes the bookable slots for a team over the lookahead window
/// starting after `today`.
pub async fn team_availability(
    provider: &dyn CalendarProvider,
    repository: &dyn Repository,
    org_email: &str,
    team: &Team,
    config: &SlotConfig,
    today: NaiveDate,
) -> Result<TeamAvailability, RepositoryError> {
    let dates = upcoming_working_days(today, config.lookahead_days);
    let days = fetch_days(provider, team, &dates).await;

    let booked: HashSet<SlotId> = repository
        .booked_slot_ids(org_email, &team.name)
        .await?
        .into_iter()
        .collect();

    let free = compute_free_slots(&team.name, &days, config, &booked);
    Ok(TeamAvailability { free, days })
}
