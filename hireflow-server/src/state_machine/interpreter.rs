//! Executes the effects produced by transitions.
//!
//! By the time effects run, the transition has already been decided, so
//! a failing effect is logged and skipped rather than aborting the
//! event: a lost email must not wedge an applicant record.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::effect::{Effect, LogLevel};
use super::repository::StoredApplicant;
use crate::mailer::Mailer;

/// Everything effect execution needs from the outside world.
#[derive(Clone)]
pub struct InterpreterContext {
    pub mailer: Arc<dyn Mailer>,
}

/// Applies each effect to the applicant record, in order.
pub fn execute_effects(
    context: &InterpreterContext,
    record: &mut StoredApplicant,
    effects: Vec<Effect>,
) {
    for effect in effects {
        if let Err(detail) = execute_effect(context, record, effect) {
            error!("Effect failed: {detail}");
        }
    }
}

fn execute_effect(
    context: &InterpreterContext,
    record: &mut StoredApplicant,
    effect: Effect,
) -> Result<(), String> {
    match effect {
        Effect::AppendOngoingRound { round } => {
            record.ongoing_rounds.push(round);
            Ok(())
        }
        Effect::CloseRound {
            feedback_id,
            closure,
        } => {
            // The round lives in exactly one list; closing removes it from
            // ongoing and appends the closed form to previous.
            let position = record
                .ongoing_rounds
                .iter()
                .position(|round| round.feedback_id == feedback_id)
                .ok_or_else(|| {
                    format!(
                        "no ongoing round to close for feedback {}..",
                        feedback_id.short()
                    )
                })?;
            let round = record.ongoing_rounds.remove(position);
            record.previous_rounds.push(round.apply_closure(closure));
            Ok(())
        }
        Effect::SendEmail { email } => {
            context.mailer.send(email);
            Ok(())
        }
        Effect::Log { level, message } => {
            match level {
                LogLevel::Debug => debug!("{message}"),
                LogLevel::Info => info!("{message}"),
                LogLevel::Warn => warn!("{message}"),
                LogLevel::Error => error!("{message}"),
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::{EmailJob, RecordingMailer};
    use hireflow_core::types::{
        Attendance, FeedbackId, FeedbackScores, LocationType, Round, RoundClosure, RoundOutcome,
    };

    fn context_with_recorder() -> (InterpreterContext, Arc<RecordingMailer>) {
        let mailer = Arc::new(RecordingMailer::default());
        (
            InterpreterContext {
                mailer: mailer.clone(),
            },
            mailer,
        )
    }

    fn record() -> StoredApplicant {
        StoredApplicant::new_applied("Jane Doe", 1_749_000_000)
    }

    fn round(feedback_id: &str) -> Round {
        Round {
            round: "Technical Round 1".to_string(),
            interviewer_email: "alice@example.com".to_string(),
            interviewer_name: "Alice".to_string(),
            interview_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            interview_time: "09:00 - 09:30".to_string(),
            meeting_link: "https://meet.example.com/abc".to_string(),
            location_type: LocationType::Online,
            location: None,
            scheduled_at: 1_749_500_000,
            feedback_id: FeedbackId::from(feedback_id),
        }
    }

    fn closure() -> RoundClosure {
        RoundClosure {
            candidate_attended: Attendance::Yes,
            outcome: Some(RoundOutcome::Proceed),
            scores: Some(FeedbackScores {
                technical_configuration: 4,
                technical_customization: 3,
                communication_skills: 5,
                leadership_abilities: 3,
                enthusiasm: 4,
                teamwork: 4,
                attitude: 5,
            }),
            reason: None,
            feedback_submitted_at: 1_749_600_000,
        }
    }

    #[test]
    fn test_append_then_close_moves_round_between_lists() {
        let (context, _) = context_with_recorder();
        let mut record = record();

        execute_effects(
            &context,
            &mut record,
            vec![Effect::AppendOngoingRound {
                round: round("fb-1"),
            }],
        );
        assert_eq!(record.ongoing_rounds.len(), 1);
        assert!(record.previous_rounds.is_empty());

        execute_effects(
            &context,
            &mut record,
            vec![Effect::CloseRound {
                feedback_id: FeedbackId::from("fb-1"),
                closure: closure(),
            }],
        );
        assert!(record.ongoing_rounds.is_empty());
        assert_eq!(record.previous_rounds.len(), 1);
        assert_eq!(
            record.previous_rounds[0].outcome,
            Some(RoundOutcome::Proceed)
        );
    }

    #[test]
    fn test_close_with_unknown_feedback_leaves_lists_untouched() {
        let (context, _) = context_with_recorder();
        let mut record = record();
        record.ongoing_rounds.push(round("fb-1"));

        execute_effects(
            &context,
            &mut record,
            vec![Effect::CloseRound {
                feedback_id: FeedbackId::from("fb-unknown"),
                closure: closure(),
            }],
        );
        assert_eq!(record.ongoing_rounds.len(), 1);
        assert!(record.previous_rounds.is_empty());
    }

    #[test]
    fn test_send_email_reaches_the_mailer() {
        let (context, mailer) = context_with_recorder();
        let mut record = record();

        execute_effects(
            &context,
            &mut record,
            vec![Effect::SendEmail {
                email: EmailJob::NoSlotsAvailable {
                    to: "org@example.com".to_string(),
                    org_name: "Acme".to_string(),
                    team: "Backend".to_string(),
                    lookahead_days: 5,
                },
            }],
        );
        assert_eq!(mailer.sent_jobs().len(), 1);
    }
}
