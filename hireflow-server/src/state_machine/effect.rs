//! Effects (side effects as data).
//!
//! Effects describe what should happen as a result of a transition: round
//! bookkeeping on the stored applicant record, emails to send, messages
//! to log. The transition function stays pure; the interpreter executes
//! these against the record and the mailer.

use serde::{Deserialize, Serialize};

use hireflow_core::types::{FeedbackId, Round, RoundClosure};

use crate::mailer::EmailJob;

/// All effects that transitions can produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Append a newly scheduled round to the applicant's ongoing list.
    AppendOngoingRound { round: Round },

    /// Move the ongoing round awaiting this feedback token to history,
    /// combined with the recorded closure. A round lives in exactly one
    /// of the two lists; this effect is the only thing that moves it.
    CloseRound {
        feedback_id: FeedbackId,
        closure: RoundClosure,
    },

    /// Hand an email job to the mailer (fire-and-forget).
    SendEmail { email: EmailJob },

    /// Log a message.
    Log { level: LogLevel, message: String },
}

/// Log level for logging effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}
