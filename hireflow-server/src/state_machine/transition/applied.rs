//! Handles the `applied` and `decision_pending` states.
//!
//! These are the manual-review stages: the only legal event is an
//! organization member setting a status, and only the screening
//! decisions are on the table. Interview machinery (invitations, slot
//! commits, feedback) starts after shortlisting.

use hireflow_core::types::ApplicantStatus;

use super::super::effect::{Effect, LogLevel};
use super::super::event::ApplicantEvent;
use super::super::state::ApplicantState;
use super::{TransitionError, TransitionResult};

pub fn handle(
    state: &ApplicantState,
    event: ApplicantEvent,
) -> Result<TransitionResult, TransitionError> {
    let from = state.status();
    match event {
        ApplicantEvent::StatusSet { target } => {
            let allowed = match from {
                ApplicantStatus::Applied => matches!(
                    target,
                    ApplicantStatus::SelectedForInterview
                        | ApplicantStatus::Rejected
                        | ApplicantStatus::DecisionPending
                ),
                ApplicantStatus::DecisionPending => matches!(
                    target,
                    ApplicantStatus::SelectedForInterview | ApplicantStatus::Rejected
                ),
                _ => false,
            };
            if !allowed {
                return Err(TransitionError::invalid(
                    from,
                    format!("set status to '{target}'"),
                ));
            }
            let next = match target {
                ApplicantStatus::SelectedForInterview => ApplicantState::SelectedForInterview,
                ApplicantStatus::DecisionPending => ApplicantState::DecisionPending,
                ApplicantStatus::Rejected => ApplicantState::Rejected,
                // Unreachable given the table above, but keep the match total.
                _ => return Err(TransitionError::invalid(from, format!("set status to '{target}'"))),
            };
            Ok(TransitionResult::new(
                next,
                vec![Effect::Log {
                    level: LogLevel::Info,
                    message: format!("Status manually set from '{from}' to '{target}'"),
                }],
            ))
        }
        ApplicantEvent::InvitationCreated { .. } => Err(TransitionError::invalid(
            from,
            "send an interview invitation before shortlisting",
        )),
        ApplicantEvent::SlotCommitted { .. } => Err(TransitionError::invalid(
            from,
            "commit an interview slot before shortlisting",
        )),
        ApplicantEvent::FeedbackRecorded { .. } => Err(TransitionError::invalid(
            from,
            "record interview feedback before shortlisting",
        )),
    }
}
