//! Handles the `selected_for_interview` state.
//!
//! Shortlisted applicants are waiting for the organization to send a
//! scheduling invitation. A commit can still arrive here: after a
//! reschedule the applicant returns to this state while the earlier
//! invitation link stays pending until a new one replaces it, so a
//! booking made through the old link schedules normally.

use super::super::event::ApplicantEvent;
use super::super::state::ApplicantState;
use super::{schedule_round, TransitionError, TransitionResult};
use crate::state_machine::effect::{Effect, LogLevel};

pub fn handle(
    state: &ApplicantState,
    event: ApplicantEvent,
) -> Result<TransitionResult, TransitionError> {
    let from = state.status();
    match event {
        ApplicantEvent::InvitationCreated {
            webhook_id,
            round,
            team,
            invite_email,
        } => {
            let message = format!(
                "Invitation {}.. sent for round '{}' (team '{}')",
                webhook_id.short(),
                round,
                team
            );
            Ok(TransitionResult::new(
                ApplicantState::InvitationSent {
                    webhook_id,
                    round,
                    team,
                },
                vec![
                    Effect::SendEmail {
                        email: invite_email,
                    },
                    Effect::Log {
                        level: LogLevel::Info,
                        message,
                    },
                ],
            ))
        }
        ApplicantEvent::SlotCommitted {
            webhook_id,
            round,
            emails,
        } => Ok(schedule_round(&webhook_id, round, emails)),
        ApplicantEvent::StatusSet { target } => Err(TransitionError::invalid(
            from,
            format!("set status to '{target}'"),
        )),
        ApplicantEvent::FeedbackRecorded { .. } => Err(TransitionError::invalid(
            from,
            "record feedback with no interview in progress",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::EmailJob;
    use hireflow_core::types::{ApplicantStatus, WebhookId};

    #[test]
    fn test_invitation_effects_are_email_then_log() {
        let result = handle(
            &ApplicantState::SelectedForInterview,
            ApplicantEvent::InvitationCreated {
                webhook_id: WebhookId::from("wh-abc"),
                round: "HR Round".to_string(),
                team: "People".to_string(),
                invite_email: EmailJob::InterviewInvitation {
                    to: "c@example.com".to_string(),
                    applicant_name: "C".to_string(),
                    org_name: "Acme".to_string(),
                    round: "HR Round".to_string(),
                    form_link: "https://app.example.com/form?webhook_id=wh-abc".to_string(),
                },
            },
        )
        .unwrap();
        assert!(matches!(result.effects[0], Effect::SendEmail { .. }));
        assert!(matches!(result.effects[1], Effect::Log { .. }));
    }

    #[test]
    fn test_manual_rejection_is_refused_after_shortlist() {
        // Once interviewing starts, outcomes come from feedback, not the
        // status dropdown.
        let err = handle(
            &ApplicantState::SelectedForInterview,
            ApplicantEvent::StatusSet {
                target: ApplicantStatus::Rejected,
            },
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
    }
}
