//! Pure applicant-state transitions.
//!
//! `transition(state, event)` returns the new state plus effects, or
//! refuses the event. The legal-transition table is enforced here and
//! only here: handlers for each state decide what they accept, and
//! anything not explicitly accepted is an error, regardless of what a
//! client UI offers.

pub mod applied;
pub mod invitation_sent;
pub mod processing;
pub mod selected_for_interview;
pub mod terminal;

use hireflow_core::types::{ApplicantStatus, Round, WebhookId};

use super::effect::{Effect, LogLevel};
use super::event::ApplicantEvent;
use super::state::ApplicantState;
use crate::mailer::EmailJob;

/// Result of a successful transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionResult {
    pub state: ApplicantState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ApplicantState, effects: Vec<Effect>) -> Self {
        Self { state, effects }
    }

    /// Keeps the current state with no effects.
    pub fn no_change(state: ApplicantState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }
}

/// Why a transition was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The event is not legal from the current status.
    InvalidTransition {
        from: ApplicantStatus,
        attempted: String,
    },
    /// Terminal statuses accept nothing further.
    TerminalState { status: ApplicantStatus },
}

impl TransitionError {
    pub fn invalid(from: ApplicantStatus, attempted: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from,
            attempted: attempted.into(),
        }
    }
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTransition { from, attempted } => {
                write!(
                    f,
                    "Cannot {} while applicant status is '{}'",
                    attempted, from
                )
            }
            Self::TerminalState { status } => {
                write!(
                    f,
                    "Applicant is in terminal status '{}' and accepts no further changes",
                    status
                )
            }
        }
    }
}

impl std::error::Error for TransitionError {}

/// Applies one event to one applicant state.
pub fn transition(
    state: &ApplicantState,
    event: ApplicantEvent,
) -> Result<TransitionResult, TransitionError> {
    match state {
        ApplicantState::Applied | ApplicantState::DecisionPending => applied::handle(state, event),
        ApplicantState::SelectedForInterview => selected_for_interview::handle(state, event),
        ApplicantState::InvitationSent { .. } => invitation_sent::handle(state, event),
        ApplicantState::Processing { .. } => processing::handle(state, event),
        ApplicantState::Selected | ApplicantState::Rejected => terminal::handle(state, event),
    }
}

/// Shared result for a winning slot commit: the applicant moves to
/// Processing, the round joins the ongoing list, and the confirmation
/// emails go out. The round is appended before the emails so a failed
/// send can never leave a scheduled interview unrecorded.
fn schedule_round(
    webhook_id: &WebhookId,
    round: Round,
    emails: Vec<EmailJob>,
) -> TransitionResult {
    let message = format!(
        "Scheduled round '{}' on {} ({}) via invitation {}..",
        round.round,
        round.interview_date,
        round.interview_time,
        webhook_id.short()
    );
    let state = ApplicantState::Processing {
        feedback_id: round.feedback_id.clone(),
        round: round.round.clone(),
    };

    let mut effects = Vec::with_capacity(emails.len() + 2);
    effects.push(Effect::AppendOngoingRound { round });
    for email in emails {
        effects.push(Effect::SendEmail { email });
    }
    effects.push(Effect::Log {
        level: LogLevel::Info,
        message,
    });
    TransitionResult::new(state, effects)
}
