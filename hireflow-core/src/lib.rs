//! Domain core for the hireflow recruiting backend.
//!
//! Pure types and logic shared by the server and the CLI: identifier
//! newtypes, the applicant-status model, interview-round bookkeeping,
//! the slot-availability engine, and the calendar collaborator trait.
//! No I/O happens in this crate.

pub mod calendar;
pub mod slots;
pub mod types;
