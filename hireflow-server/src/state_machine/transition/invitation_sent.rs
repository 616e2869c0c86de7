//! Handles the `invitation_sent` state.
//!
//! An invitation is out and the applicant is expected to pick a slot
//! through it. Only a commit carrying this state's own webhook id is
//! accepted; a commit through any other link means bookkeeping has
//! drifted and is refused rather than guessed at.

use super::super::event::ApplicantEvent;
use super::super::state::ApplicantState;
use super::{schedule_round, TransitionError, TransitionResult};

pub fn handle(
    state: &ApplicantState,
    event: ApplicantEvent,
) -> Result<TransitionResult, TransitionError> {
    let from = state.status();
    let expected = match state {
        ApplicantState::InvitationSent { webhook_id, .. } => webhook_id,
        _ => {
            return Err(TransitionError::invalid(
                from,
                "handle an invitation event outside invitation_sent",
            ))
        }
    };
    match event {
        ApplicantEvent::SlotCommitted {
            webhook_id,
            round,
            emails,
        } => {
            if &webhook_id != expected {
                return Err(TransitionError::invalid(
                    from,
                    format!(
                        "commit a slot via invitation {}.. when {}.. is the live one",
                        webhook_id.short(),
                        expected.short()
                    ),
                ));
            }
            Ok(schedule_round(&webhook_id, round, emails))
        }
        ApplicantEvent::InvitationCreated { .. } => Err(TransitionError::invalid(
            from,
            "send a new invitation while one is pending",
        )),
        ApplicantEvent::StatusSet { target } => Err(TransitionError::invalid(
            from,
            format!("set status to '{target}'"),
        )),
        ApplicantEvent::FeedbackRecorded { .. } => Err(TransitionError::invalid(
            from,
            "record feedback before a slot is booked",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hireflow_core::types::{FeedbackId, LocationType, Round, WebhookId};

    fn state() -> ApplicantState {
        ApplicantState::InvitationSent {
            webhook_id: WebhookId::from("wh-live"),
            round: "Technical Round 2".to_string(),
            team: "Platform".to_string(),
        }
    }

    fn round() -> Round {
        Round {
            round: "Technical Round 2".to_string(),
            interviewer_email: "bob@example.com".to_string(),
            interviewer_name: "Bob".to_string(),
            interview_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 11).unwrap(),
            interview_time: "10:00 - 10:30".to_string(),
            meeting_link: "https://meet.example.com/xyz".to_string(),
            location_type: LocationType::Online,
            location: None,
            scheduled_at: 1_749_500_000,
            feedback_id: FeedbackId::from("fb-2"),
        }
    }

    #[test]
    fn test_matching_webhook_commits() {
        let result = handle(
            &state(),
            ApplicantEvent::SlotCommitted {
                webhook_id: WebhookId::from("wh-live"),
                round: round(),
                emails: Vec::new(),
            },
        )
        .unwrap();
        assert_eq!(
            result.state,
            ApplicantState::Processing {
                feedback_id: FeedbackId::from("fb-2"),
                round: "Technical Round 2".to_string(),
            }
        );
    }

    #[test]
    fn test_foreign_webhook_is_refused() {
        let err = handle(
            &state(),
            ApplicantEvent::SlotCommitted {
                webhook_id: WebhookId::from("wh-stale"),
                round: round(),
                emails: Vec::new(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
    }
}
