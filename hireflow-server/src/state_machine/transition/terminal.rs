//! Handles the terminal `selected` and `rejected` states.
//!
//! Final decisions are final. Every event bounces with an error that
//! names the terminal status, so callers can tell "you cannot do this
//! yet" apart from "you can never do this again".

use super::super::event::ApplicantEvent;
use super::super::state::ApplicantState;
use super::{TransitionError, TransitionResult};

pub fn handle(
    state: &ApplicantState,
    _event: ApplicantEvent,
) -> Result<TransitionResult, TransitionError> {
    Err(TransitionError::TerminalState {
        status: state.status(),
    })
}
