//! Feedback-invitation operations for the SQLite repository.
//!
//! A feedback form is a single-use claim, same shape as the slot commit
//! but without a cross-record resource: the conditional UPDATE on
//! `status = 'pending'` is what admits exactly one submission.

use rusqlite::{params, Connection, OptionalExtension};

use hireflow_core::types::FeedbackId;

use super::super::{
    FeedbackRecord, FeedbackStatus, FeedbackSubmission, FeedbackSubmitOutcome, RepositoryError,
};
use super::{now_secs, SqliteRepository};

pub(super) fn insert_feedback_invitation_sync(
    conn: &Connection,
    feedback: &FeedbackRecord,
) -> Result<(), String> {
    let record_json = serde_json::to_string(feedback).map_err(|e| e.to_string())?;
    conn.execute(
        "INSERT INTO feedback_invitations (feedback_id, status, record_json, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(feedback_id) DO UPDATE SET
             status = excluded.status,
             record_json = excluded.record_json,
             created_at = excluded.created_at",
        params![
            feedback.feedback_id.0,
            feedback.status.as_str(),
            record_json,
            feedback.created_at,
        ],
    )
    .map_err(|e| e.to_string())?;
    Ok(())
}

pub(super) fn get_feedback_invitation_sync(
    conn: &Connection,
    feedback_id: &FeedbackId,
) -> Result<Option<FeedbackRecord>, String> {
    let result: Option<String> = conn
        .query_row(
            "SELECT record_json FROM feedback_invitations WHERE feedback_id = ?1",
            params![feedback_id.0],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| e.to_string())?;

    match result {
        Some(json) => {
            let feedback = serde_json::from_str(&json)
                .map_err(|e| format!("feedback record JSON corrupt: {e}"))?;
            Ok(Some(feedback))
        }
        None => Ok(None),
    }
}

pub(super) fn submit_feedback_sync(
    conn: &mut Connection,
    feedback_id: &FeedbackId,
    submission: &FeedbackSubmission,
    expiry_cutoff: Option<i64>,
    now_secs: i64,
) -> Result<FeedbackSubmitOutcome, String> {
    let tx = conn.transaction().map_err(|e| e.to_string())?;

    let row: Option<(String, String, i64)> = tx
        .query_row(
            "SELECT status, record_json, created_at FROM feedback_invitations
             WHERE feedback_id = ?1",
            params![feedback_id.0],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()
        .map_err(|e| e.to_string())?;

    let Some((status, record_json, created_at)) = row else {
        return Ok(FeedbackSubmitOutcome::NotFound);
    };

    match FeedbackStatus::parse(&status) {
        Some(FeedbackStatus::Pending) => {}
        Some(FeedbackStatus::Submitted) => return Ok(FeedbackSubmitOutcome::AlreadySubmitted),
        None => {
            return Err(format!(
                "feedback {} has unknown status '{}'",
                feedback_id.short(),
                status
            ))
        }
    }

    if let Some(cutoff) = expiry_cutoff {
        if created_at < cutoff {
            return Ok(FeedbackSubmitOutcome::Expired);
        }
    }

    let mut feedback: FeedbackRecord = serde_json::from_str(&record_json)
        .map_err(|e| format!("feedback record JSON corrupt: {e}"))?;
    feedback.status = FeedbackStatus::Submitted;
    feedback.submission = Some(submission.clone());
    feedback.submitted_at = Some(now_secs);
    let updated_json = serde_json::to_string(&feedback).map_err(|e| e.to_string())?;

    // Conditional on status = 'pending': the first submission flips the
    // row, a concurrent duplicate sees changes() == 0.
    tx.execute(
        "UPDATE feedback_invitations SET status = 'submitted', record_json = ?1
         WHERE feedback_id = ?2 AND status = 'pending'",
        params![updated_json, feedback_id.0],
    )
    .map_err(|e| e.to_string())?;
    if tx.changes() == 0 {
        return Ok(FeedbackSubmitOutcome::AlreadySubmitted);
    }

    tx.commit().map_err(|e| e.to_string())?;
    Ok(FeedbackSubmitOutcome::Submitted(feedback))
}

pub(super) fn reopen_feedback_sync(
    conn: &Connection,
    feedback_id: &FeedbackId,
) -> Result<(), String> {
    let row: Option<String> = conn
        .query_row(
            "SELECT record_json FROM feedback_invitations WHERE feedback_id = ?1",
            params![feedback_id.0],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| e.to_string())?;

    let Some(json) = row else {
        return Ok(());
    };
    let mut feedback: FeedbackRecord = serde_json::from_str(&json)
        .map_err(|e| format!("feedback record JSON corrupt: {e}"))?;
    feedback.status = FeedbackStatus::Pending;
    feedback.submission = None;
    feedback.submitted_at = None;
    let updated_json = serde_json::to_string(&feedback).map_err(|e| e.to_string())?;

    conn.execute(
        "UPDATE feedback_invitations SET status = 'pending', record_json = ?1
         WHERE feedback_id = ?2",
        params![updated_json, feedback_id.0],
    )
    .map_err(|e| e.to_string())?;
    Ok(())
}

// =============================================================================
// Async wrappers
// =============================================================================

impl SqliteRepository {
    pub(super) async fn insert_feedback_invitation_impl(
        &self,
        feedback: &FeedbackRecord,
    ) -> Result<(), RepositoryError> {
        let conn = self.conn.clone();
        let feedback = feedback.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            insert_feedback_invitation_sync(&conn, &feedback)
                .map_err(|e| RepositoryError::storage("insert_feedback_invitation", e))
        })
        .await
        .map_err(|e| RepositoryError::storage("insert_feedback_invitation", e.to_string()))?
    }

    pub(super) async fn get_feedback_invitation_impl(
        &self,
        feedback_id: &FeedbackId,
    ) -> Result<Option<FeedbackRecord>, RepositoryError> {
        let conn = self.conn.clone();
        let feedback_id = feedback_id.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            get_feedback_invitation_sync(&conn, &feedback_id)
                .map_err(|e| RepositoryError::storage("get_feedback_invitation", e))
        })
        .await
        .map_err(|e| RepositoryError::storage("get_feedback_invitation", e.to_string()))?
    }

    pub(super) async fn submit_feedback_impl(
        &self,
        feedback_id: &FeedbackId,
        submission: &FeedbackSubmission,
        expiry_cutoff: Option<i64>,
    ) -> Result<FeedbackSubmitOutcome, RepositoryError> {
        let conn = self.conn.clone();
        let feedback_id = feedback_id.clone();
        let submission = submission.clone();
        let now = now_secs();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap();
            submit_feedback_sync(&mut conn, &feedback_id, &submission, expiry_cutoff, now)
                .map_err(|e| RepositoryError::storage("submit_feedback", e))
        })
        .await
        .map_err(|e| RepositoryError::storage("submit_feedback", e.to_string()))?
    }

    pub(super) async fn reopen_feedback_impl(
        &self,
        feedback_id: &FeedbackId,
    ) -> Result<(), RepositoryError> {
        let conn = self.conn.clone();
        let feedback_id = feedback_id.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            reopen_feedback_sync(&conn, &feedback_id)
                .map_err(|e| RepositoryError::storage("reopen_feedback", e))
        })
        .await
        .map_err(|e| RepositoryError::storage("reopen_feedback", e.to_string()))?
    }
}
