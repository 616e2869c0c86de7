//! Applicant lifecycle states.
//!
//! One state per applicant per job. The serialized form is persisted as
//! a JSON column; the projected [`ApplicantStatus`] is extracted into an
//! indexed column alongside it.

use hireflow_core::types::{ApplicantStatus, FeedbackId, WebhookId};
use serde::{Deserialize, Serialize};

/// State of one applicant on one job, with the context each stage needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicantState {
    /// Application received, no decision yet.
    Applied,

    /// Organization parked the application for later review.
    DecisionPending,

    /// Shortlisted; an interview round may be initiated.
    SelectedForInterview,

    /// A form link is out for this round; waiting for the candidate to
    /// commit a slot.
    InvitationSent {
        webhook_id: WebhookId,
        round: String,
        team: String,
    },

    /// Interview scheduled; waiting for the interviewer's feedback.
    Processing {
        feedback_id: FeedbackId,
        round: String,
    },

    /// Hired (terminal).
    Selected,

    /// Not hired (terminal).
    Rejected,
}

impl ApplicantState {
    /// Projects the wire-level status of this state.
    pub fn status(&self) -> ApplicantStatus {
        match self {
            Self::Applied => ApplicantStatus::Applied,
            Self::DecisionPending => ApplicantStatus::DecisionPending,
            Self::SelectedForInterview => ApplicantStatus::SelectedForInterview,
            Self::InvitationSent { .. } => ApplicantStatus::InvitationSent,
            Self::Processing { .. } => ApplicantStatus::Processing,
            Self::Selected => ApplicantStatus::Selected,
            Self::Rejected => ApplicantStatus::Rejected,
        }
    }

    /// Returns true if no further events are accepted.
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// The scheduling token this applicant is currently waiting on, if any.
    pub fn pending_webhook_id(&self) -> Option<&WebhookId> {
        match self {
            Self::InvitationSent { webhook_id, .. } => Some(webhook_id),
            _ => None,
        }
    }

    /// The feedback token this applicant is currently waiting on, if any.
    pub fn awaited_feedback_id(&self) -> Option<&FeedbackId> {
        match self {
            Self::Processing { feedback_id, .. } => Some(feedback_id),
            _ => None,
        }
    }
}

impl Default for ApplicantState {
    fn default() -> Self {
        Self::Applied
    }
}
