//! Ties transitions, effects, and persistence together.
//!
//! `ApplicantStore::process_event` is the single write path for
//! applicant records: load, transition, apply effects, persist, audit.
//! Handlers never mutate a record directly.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use hireflow_core::types::JobId;

use super::event::ApplicantEvent;
use super::interpreter::{execute_effects, InterpreterContext};
use super::repository::{Repository, RepositoryError, StoredApplicant};
use super::transition::{transition, TransitionError};
use crate::mailer::Mailer;

/// Identifies one applicant record: one candidate on one job post.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApplicantKey {
    pub job_id: JobId,
    pub candidate_email: String,
}

impl ApplicantKey {
    pub fn new(job_id: impl Into<JobId>, candidate_email: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            candidate_email: candidate_email.into(),
        }
    }
}

impl std::fmt::Display for ApplicantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.job_id, self.candidate_email)
    }
}

#[derive(Debug)]
pub enum StoreError {
    /// No applicant record exists under the key.
    NotFound { key: ApplicantKey },
    Transition(TransitionError),
    Repository(RepositoryError),
}

impl From<TransitionError> for StoreError {
    fn from(err: TransitionError) -> Self {
        Self::Transition(err)
    }
}

impl From<RepositoryError> for StoreError {
    fn from(err: RepositoryError) -> Self {
        Self::Repository(err)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { key } => write!(f, "No applicant record for {key}"),
            Self::Transition(err) => write!(f, "{err}"),
            Self::Repository(err) => write!(f, "Storage error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// The write path for applicant records.
#[derive(Clone)]
pub struct ApplicantStore {
    repository: Arc<dyn Repository>,
    context: InterpreterContext,
}

impl ApplicantStore {
    pub fn new(repository: Arc<dyn Repository>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            repository,
            context: InterpreterContext { mailer },
        }
    }

    /// Applies one event to one applicant record.
    ///
    /// The record is persisted only when the transition succeeds; a
    /// refused event leaves storage untouched. The audit row is written
    /// after the record, and an audit failure is logged rather than
    /// surfaced, since the state change itself has already landed.
    pub async fn process_event(
        &self,
        key: &ApplicantKey,
        event: ApplicantEvent,
    ) -> Result<StoredApplicant, StoreError> {
        let mut record = self
            .repository
            .get_applicant(key)
            .await?
            .ok_or_else(|| StoreError::NotFound { key: key.clone() })?;

        info!("Applying {} to {}: {}", event.kind(), key, event.log_summary());
        let audit_kind = event.kind();
        let audit_payload = match serde_json::to_value(&event) {
            Ok(value) => value,
            Err(err) => {
                warn!("Could not serialize {audit_kind} event for audit: {err}");
                serde_json::Value::Null
            }
        };

        let result = transition(&record.state, event)?;
        record.state = result.state;
        execute_effects(&self.context, &mut record, result.effects);
        record.updated_at = Utc::now().timestamp();

        self.repository.put_applicant(key, &record).await?;

        if let Err(err) = self
            .repository
            .log_applicant_event(key, audit_kind, &audit_payload)
            .await
        {
            warn!("Could not record audit event for {key}: {err}");
        }

        Ok(record)
    }
}
