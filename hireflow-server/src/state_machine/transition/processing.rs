//! Handles the `processing` state.
//!
//! An interview is scheduled and the interviewer owes feedback. The
//! feedback token must match the round being awaited; the attendance
//! and outcome fields then decide where the applicant goes next.

use hireflow_core::types::{Attendance, RoundOutcome};

use super::super::effect::{Effect, LogLevel};
use super::super::event::ApplicantEvent;
use super::super::state::ApplicantState;
use super::{TransitionError, TransitionResult};

pub fn handle(
    state: &ApplicantState,
    event: ApplicantEvent,
) -> Result<TransitionResult, TransitionError> {
    let from = state.status();
    let awaited = match state {
        ApplicantState::Processing { feedback_id, .. } => feedback_id,
        _ => {
            return Err(TransitionError::invalid(
                from,
                "handle a processing event outside processing",
            ))
        }
    };
    match event {
        ApplicantEvent::FeedbackRecorded {
            feedback_id,
            round,
            closure,
        } => {
            if &feedback_id != awaited {
                return Err(TransitionError::invalid(
                    from,
                    format!(
                        "close round via feedback {}.. when {}.. is awaited",
                        feedback_id.short(),
                        awaited.short()
                    ),
                ));
            }
            let next = match (closure.candidate_attended, closure.outcome) {
                (Attendance::No, _) => ApplicantState::Rejected,
                (Attendance::Reschedule, _) => ApplicantState::SelectedForInterview,
                (Attendance::Yes, Some(RoundOutcome::Selected)) => ApplicantState::Selected,
                (Attendance::Yes, Some(RoundOutcome::Proceed)) => {
                    ApplicantState::SelectedForInterview
                }
                (Attendance::Yes, Some(RoundOutcome::Rejected)) => ApplicantState::Rejected,
                (Attendance::Yes, None) => {
                    return Err(TransitionError::invalid(
                        from,
                        "close an attended round without an outcome",
                    ))
                }
            };
            let message = format!(
                "Feedback {}.. closed round '{}'; applicant now '{}'",
                feedback_id.short(),
                round,
                next.status()
            );
            Ok(TransitionResult::new(
                next,
                vec![
                    Effect::CloseRound {
                        feedback_id,
                        closure,
                    },
                    Effect::Log {
                        level: LogLevel::Info,
                        message,
                    },
                ],
            ))
        }
        // A replayed commit for the already-scheduled round is harmless.
        ApplicantEvent::SlotCommitted { webhook_id, .. } => {
            Ok(TransitionResult {
                state: state.clone(),
                effects: vec![Effect::Log {
                    level: LogLevel::Warn,
                    message: format!(
                        "Ignoring duplicate slot commit via invitation {}.. while processing",
                        webhook_id.short()
                    ),
                }],
            })
        }
        ApplicantEvent::InvitationCreated { .. } => Err(TransitionError::invalid(
            from,
            "send an invitation while a round is in progress",
        )),
        ApplicantEvent::StatusSet { target } => Err(TransitionError::invalid(
            from,
            format!("set status to '{target}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hireflow_core::types::{FeedbackId, FeedbackScores, RoundClosure};

    fn state() -> ApplicantState {
        ApplicantState::Processing {
            feedback_id: FeedbackId::from("fb-open"),
            round: "Final Round".to_string(),
        }
    }

    fn closure(attended: Attendance, outcome: Option<RoundOutcome>) -> RoundClosure {
        RoundClosure {
            candidate_attended: attended,
            outcome,
            scores: Some(FeedbackScores {
                technical_configuration: 3,
                technical_customization: 3,
                communication_skills: 3,
                leadership_abilities: 3,
                enthusiasm: 3,
                teamwork: 3,
                attitude: 3,
            }),
            reason: None,
            feedback_submitted_at: 1_750_000_000,
        }
    }

    fn feedback(feedback_id: &str, closure: RoundClosure) -> ApplicantEvent {
        ApplicantEvent::FeedbackRecorded {
            feedback_id: FeedbackId::from(feedback_id),
            round: "Final Round".to_string(),
            closure,
        }
    }

    #[test]
    fn test_close_round_effect_carries_the_closure() {
        let result = handle(
            &state(),
            feedback("fb-open", closure(Attendance::Yes, Some(RoundOutcome::Selected))),
        )
        .unwrap();
        match &result.effects[0] {
            Effect::CloseRound {
                feedback_id,
                closure,
            } => {
                assert_eq!(feedback_id, &FeedbackId::from("fb-open"));
                assert_eq!(closure.outcome, Some(RoundOutcome::Selected));
            }
            other => panic!("expected CloseRound first, got {other:?}"),
        }
    }

    #[test]
    fn test_no_show_rejects_regardless_of_outcome_field() {
        let result = handle(
            &state(),
            feedback("fb-open", closure(Attendance::No, Some(RoundOutcome::Proceed))),
        )
        .unwrap();
        assert_eq!(result.state, ApplicantState::Rejected);
    }

    #[test]
    fn test_reschedule_ignores_outcome_field() {
        let result = handle(
            &state(),
            feedback(
                "fb-open",
                closure(Attendance::Reschedule, Some(RoundOutcome::Rejected)),
            ),
        )
        .unwrap();
        assert_eq!(result.state, ApplicantState::SelectedForInterview);
    }

    #[test]
    fn test_stale_feedback_token_is_refused() {
        let err = handle(
            &state(),
            feedback("fb-old", closure(Attendance::Yes, Some(RoundOutcome::Proceed))),
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn test_duplicate_commit_logs_warning_only() {
        use hireflow_core::types::{LocationType, Round, WebhookId};
        let result = handle(
            &state(),
            ApplicantEvent::SlotCommitted {
                webhook_id: WebhookId::from("wh-replayed"),
                round: Round {
                    round: "Final Round".to_string(),
                    interviewer_email: "i@example.com".to_string(),
                    interviewer_name: "I".to_string(),
                    interview_date: chrono::NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                    interview_time: "11:00 - 11:30".to_string(),
                    meeting_link: "https://meet.example.com/dup".to_string(),
                    location_type: LocationType::Online,
                    location: None,
                    scheduled_at: 1_750_100_000,
                    feedback_id: FeedbackId::from("fb-open"),
                },
                emails: Vec::new(),
            },
        )
        .unwrap();
        assert_eq!(result.state, state());
        assert_eq!(result.effects.len(), 1);
        assert!(matches!(
            result.effects[0],
            Effect::Log {
                level: LogLevel::Warn,
                ..
            }
        ));
    }
}
