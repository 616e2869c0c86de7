//! Audit-trail operations for the SQLite repository.
//!
//! Every event an applicant record processes leaves one row in the
//! `applicant_events` table with the event payload JSON-encoded. The
//! trail is append-only; nothing in the service deletes from it.

use rusqlite::params;

use super::super::{ApplicantEventRow, RepositoryError};
use super::{now_secs, SqliteRepository};
use crate::state_machine::store::ApplicantKey;

impl SqliteRepository {
    pub(super) async fn log_applicant_event_impl(
        &self,
        key: &ApplicantKey,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        let conn = self.conn.clone();
        let job_id = key.job_id.0.clone();
        let candidate_email = key.candidate_email.clone();
        let event_type = event_type.to_string();
        let recorded_at = now_secs();

        let event_data = serde_json::to_string(payload)
            .map_err(|e| RepositoryError::storage("log_applicant_event serialize", e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            conn.execute(
                "INSERT INTO applicant_events
                     (job_id, candidate_email, event_type, event_data, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![job_id, candidate_email, event_type, event_data, recorded_at],
            )
            .map_err(|e| RepositoryError::storage("log_applicant_event", e.to_string()))?;

            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::storage("log_applicant_event", e.to_string()))?
    }

    pub(super) async fn applicant_events_impl(
        &self,
        key: &ApplicantKey,
    ) -> Result<Vec<ApplicantEventRow>, RepositoryError> {
        let conn = self.conn.clone();
        let job_id = key.job_id.0.clone();
        let candidate_email = key.candidate_email.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            let mut stmt = conn
                .prepare(
                    "SELECT event_type, event_data, recorded_at
                     FROM applicant_events
                     WHERE job_id = ?1 AND candidate_email = ?2
                     ORDER BY recorded_at DESC, id DESC",
                )
                .map_err(|e| RepositoryError::storage("applicant_events", e.to_string()))?;

            let rows = stmt
                .query_map(params![job_id, candidate_email], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })
                .map_err(|e| RepositoryError::storage("applicant_events", e.to_string()))?;

            let mut events = Vec::new();
            for row in rows {
                let (event_type, event_data, recorded_at) = row
                    .map_err(|e| RepositoryError::storage("applicant_events row", e.to_string()))?;

                let payload: serde_json::Value = serde_json::from_str(&event_data)
                    .map_err(|_| RepositoryError::corruption("event_data JSON"))?;

                events.push(ApplicantEventRow {
                    event_type,
                    payload,
                    recorded_at,
                });
            }

            Ok(events)
        })
        .await
        .map_err(|e| RepositoryError::storage("applicant_events", e.to_string()))?
    }
}
