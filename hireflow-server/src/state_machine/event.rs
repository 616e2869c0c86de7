//! Events that drive applicant transitions.
//!
//! Events record things that happened: an organization decision, an
//! invitation minted, a slot commit that won its claim, feedback
//! recorded. They are inputs to the pure transition function, and they
//! carry the data downstream effects need (email jobs, round entries).

use serde::{Deserialize, Serialize};

use hireflow_core::types::{ApplicantStatus, FeedbackId, Round, RoundClosure, WebhookId};

use crate::mailer::EmailJob;

/// All events that can drive an applicant's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicantEvent {
    /// Organization manually moved the applicant (decision endpoints).
    StatusSet { target: ApplicantStatus },

    /// An interview form link was created and persisted for a round.
    InvitationCreated {
        webhook_id: WebhookId,
        round: String,
        team: String,
        /// Invitation email for the candidate, sent as an effect.
        invite_email: EmailJob,
    },

    /// The candidate committed a slot and the booking won its claim.
    SlotCommitted {
        webhook_id: WebhookId,
        /// The scheduled round to append to the ongoing list.
        round: Round,
        /// Confirmation emails (candidate and interviewer), sent as effects.
        emails: Vec<EmailJob>,
    },

    /// The interviewer submitted feedback for the awaited round.
    FeedbackRecorded {
        feedback_id: FeedbackId,
        round: String,
        closure: RoundClosure,
    },
}

impl ApplicantEvent {
    /// Stable name of the event variant, used for audit rows.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StatusSet { .. } => "status_set",
            Self::InvitationCreated { .. } => "invitation_created",
            Self::SlotCommitted { .. } => "slot_committed",
            Self::FeedbackRecorded { .. } => "feedback_recorded",
        }
    }

    /// A summary of the event suitable for logging.
    ///
    /// Avoids logging full capability tokens and email bodies.
    pub fn log_summary(&self) -> String {
        match self {
            Self::StatusSet { target } => format!("StatusSet {{ target: {} }}", target),
            Self::InvitationCreated {
                webhook_id,
                round,
                team,
                ..
            } => format!(
                "InvitationCreated {{ webhook: {}.., round: {}, team: {} }}",
                webhook_id.short(),
                round,
                team
            ),
            Self::SlotCommitted {
                webhook_id, round, ..
            } => format!(
                "SlotCommitted {{ webhook: {}.., round: {}, date: {}, time: {} }}",
                webhook_id.short(),
                round.round,
                round.interview_date,
                round.interview_time
            ),
            Self::FeedbackRecorded {
                feedback_id,
                round,
                closure,
            } => format!(
                "FeedbackRecorded {{ feedback: {}.., round: {}, attended: {}, outcome: {} }}",
                feedback_id.short(),
                round,
                closure.candidate_attended.as_str(),
                closure
                    .outcome
                    .map(|o| o.as_str())
                    .unwrap_or("none")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hireflow_core::types::Attendance;

    #[test]
    fn test_log_summary_truncates_tokens() {
        let event = ApplicantEvent::FeedbackRecorded {
            feedback_id: FeedbackId::from("0123456789abcdef"),
            round: "Technical Round 1".to_string(),
            closure: RoundClosure {
                candidate_attended: Attendance::Yes,
                outcome: None,
                scores: None,
                reason: None,
                feedback_submitted_at: 0,
            },
        };
        let summary = event.log_summary();
        assert!(summary.contains("01234567"));
        assert!(!summary.contains("0123456789abcdef"));
    }

    #[test]
    fn test_kind_names() {
        let event = ApplicantEvent::StatusSet {
            target: ApplicantStatus::Rejected,
        };
        assert_eq!(event.kind(), "status_set");
    }
}
