//! Explicit state machine for the applicant lifecycle.
//!
//! This module implements a pure functional state machine for moving
//! applicants through their interview pipeline. The design separates:
//! - **State**: where the applicant is (`ApplicantState`)
//! - **Events**: what happened (`ApplicantEvent`)
//! - **Effects**: what to do about it (`Effect`)
//! - **Transition**: pure function `(State, Event) -> (State, Vec<Effect>)`
//!
//! The interpreter executes effects against the applicant record and the
//! mailer; the store wires transitions to persistence and the audit trail.

pub mod effect;
pub mod event;
pub mod interpreter;
pub mod repository;
pub mod state;
pub mod store;
pub mod transition;

pub use effect::*;
pub use event::*;
pub use state::*;
pub use store::*;
pub use transition::*;
