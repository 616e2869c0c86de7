//! Scheduling-invitation operations for the SQLite repository.
//!
//! `commit_invitation` is the path racing clients contend on. The slot
//! claim uses atomic INSERT OR IGNORE against the `slot_bookings`
//! primary key: the first commit inserts the claim row and wins, every
//! later attempt's insert is silently ignored, which we detect via
//! `changes() == 0`. The claim and the invitation status flip happen in
//! one transaction, so a crash can never leave a booked slot without a
//! submitted invitation.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{error, warn};

use hireflow_core::types::{JobId, SlotId, WebhookId};

use super::super::{
    CommitOutcome, InvitationCounts, InvitationRecord, InvitationStatus, RepositoryError,
    SlotSelection,
};
use super::{date_to_text, now_secs, SqliteRepository};

pub(super) fn insert_invitation_sync(
    conn: &Connection,
    invitation: &InvitationRecord,
) -> Result<(), String> {
    let record_json = serde_json::to_string(invitation).map_err(|e| e.to_string())?;
    conn.execute(
        "INSERT INTO invitations (webhook_id, org_email, team_name, job_id, applicant_email,
                                  round, status, record_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(webhook_id) DO UPDATE SET
             org_email = excluded.org_email,
             team_name = excluded.team_name,
             job_id = excluded.job_id,
             applicant_email = excluded.applicant_email,
             round = excluded.round,
             status = excluded.status,
             record_json = excluded.record_json,
             created_at = excluded.created_at",
        params![
            invitation.webhook_id.0,
            invitation.org_email,
            invitation.team,
            invitation.job_id.0,
            invitation.applicant_email,
            invitation.round,
            invitation.status.as_str(),
            record_json,
            invitation.created_at,
        ],
    )
    .map_err(|e| e.to_string())?;
    Ok(())
}

pub(super) fn get_invitation_sync(
    conn: &Connection,
    webhook_id: &WebhookId,
) -> Result<Option<InvitationRecord>, String> {
    let result: Option<String> = conn
        .query_row(
            "SELECT record_json FROM invitations WHERE webhook_id = ?1",
            params![webhook_id.0],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| e.to_string())?;

    match result {
        Some(json) => {
            let invitation = serde_json::from_str(&json)
                .map_err(|e| format!("invitation record JSON corrupt: {e}"))?;
            Ok(Some(invitation))
        }
        None => Ok(None),
    }
}

pub(super) fn find_pending_invitation_sync(
    conn: &Connection,
    job_id: &JobId,
    applicant_email: &str,
    round: &str,
) -> Result<Option<InvitationRecord>, String> {
    let result: Option<String> = conn
        .query_row(
            "SELECT record_json FROM invitations
             WHERE job_id = ?1 AND applicant_email = ?2 AND round = ?3
               AND status = 'pending'
             LIMIT 1",
            params![job_id.0, applicant_email, round],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| e.to_string())?;

    match result {
        Some(json) => {
            let invitation = serde_json::from_str(&json)
                .map_err(|e| format!("invitation record JSON corrupt: {e}"))?;
            Ok(Some(invitation))
        }
        None => Ok(None),
    }
}

pub(super) fn cancel_pending_invitations_sync(
    conn: &mut Connection,
    job_id: &JobId,
    applicant_email: &str,
    round: &str,
    reason: &str,
    now_secs: i64,
) -> Result<usize, String> {
    let tx = conn.transaction().map_err(|e| e.to_string())?;

    let pending: Vec<(String, String)> = {
        let mut stmt = tx
            .prepare(
                "SELECT webhook_id, record_json FROM invitations
                 WHERE job_id = ?1 AND applicant_email = ?2 AND round = ?3
                   AND status = 'pending'",
            )
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(params![job_id.0, applicant_email, round], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| e.to_string())?;
        rows.collect::<Result<_, _>>().map_err(|e| e.to_string())?
    };

    let mut cancelled = 0;
    for (webhook_id, json) in pending {
        let mut invitation: InvitationRecord = match serde_json::from_str(&json) {
            Ok(invitation) => invitation,
            Err(e) => {
                warn!(
                    "Skipping corrupt invitation record {} during cancel: {}",
                    webhook_id, e
                );
                continue;
            }
        };
        invitation.status = InvitationStatus::Cancelled;
        invitation.cancelled_at = Some(now_secs);
        invitation.cancel_reason = Some(reason.to_string());
        let updated_json = serde_json::to_string(&invitation).map_err(|e| e.to_string())?;

        tx.execute(
            "UPDATE invitations SET status = 'cancelled', record_json = ?1
             WHERE webhook_id = ?2 AND status = 'pending'",
            params![updated_json, webhook_id],
        )
        .map_err(|e| e.to_string())?;
        cancelled += tx.changes() as usize;
    }

    tx.commit().map_err(|e| e.to_string())?;
    Ok(cancelled)
}

pub(super) fn booked_slot_ids_sync(
    conn: &Connection,
    org_email: &str,
    team: &str,
) -> Result<Vec<SlotId>, String> {
    let mut stmt = conn
        .prepare(
            "SELECT slot_id FROM slot_bookings
             WHERE org_email = ?1 AND team_name = ?2",
        )
        .map_err(|e| e.to_string())?;
    let rows = stmt
        .query_map(params![org_email, team], |row| row.get::<_, String>(0))
        .map_err(|e| e.to_string())?;

    let mut slot_ids = Vec::new();
    for row in rows {
        match row {
            Ok(slot_id) => slot_ids.push(SlotId(slot_id)),
            Err(e) => error!("Failed to read slot booking row from SQLite: {}", e),
        }
    }
    Ok(slot_ids)
}

pub(super) fn invitation_counts_sync(conn: &Connection) -> Result<InvitationCounts, String> {
    let mut stmt = conn
        .prepare("SELECT status, COUNT(*) FROM invitations GROUP BY status")
        .map_err(|e| e.to_string())?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .map_err(|e| e.to_string())?;

    let mut counts = InvitationCounts::default();
    for row in rows {
        let (status, count) = row.map_err(|e| e.to_string())?;
        let count = count.max(0) as u64;
        match InvitationStatus::parse(&status) {
            Some(InvitationStatus::Pending) => counts.pending += count,
            Some(InvitationStatus::Submitted) => counts.submitted += count,
            Some(InvitationStatus::Cancelled) => counts.cancelled += count,
            None => warn!("Ignoring unknown invitation status '{}' in counts", status),
        }
    }
    Ok(counts)
}

/// Atomically book a slot for a pending invitation.
pub(super) fn commit_invitation_sync(
    conn: &mut Connection,
    webhook_id: &WebhookId,
    selection: &SlotSelection,
    expiry_cutoff: Option<i64>,
    now_secs: i64,
) -> Result<CommitOutcome, String> {
    let tx = conn.transaction().map_err(|e| e.to_string())?;

    let row: Option<(String, String, i64)> = tx
        .query_row(
            "SELECT status, record_json, created_at FROM invitations WHERE webhook_id = ?1",
            params![webhook_id.0],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()
        .map_err(|e| e.to_string())?;

    let Some((status, record_json, created_at)) = row else {
        return Ok(CommitOutcome::NotFound);
    };

    match InvitationStatus::parse(&status) {
        Some(InvitationStatus::Pending) => {}
        Some(InvitationStatus::Submitted) => return Ok(CommitOutcome::AlreadySubmitted),
        Some(InvitationStatus::Cancelled) => return Ok(CommitOutcome::Cancelled),
        None => {
            return Err(format!(
                "invitation {} has unknown status '{}'",
                webhook_id.short(),
                status
            ))
        }
    }

    if let Some(cutoff) = expiry_cutoff {
        if created_at < cutoff {
            return Ok(CommitOutcome::Expired);
        }
    }

    let mut invitation: InvitationRecord = serde_json::from_str(&record_json)
        .map_err(|e| format!("invitation record JSON corrupt: {e}"))?;

    // Claim the slot. INSERT OR IGNORE avoids the read-then-insert race:
    // if another invitation already holds the (org, team, date, slot) key,
    // our insert is a silent no-op detected via changes() == 0.
    tx.execute(
        "INSERT OR IGNORE INTO slot_bookings
             (org_email, team_name, slot_date, slot_id, webhook_id, booked_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            invitation.org_email,
            invitation.team,
            date_to_text(selection.selected_date),
            selection.selected_slot_id.0,
            webhook_id.0,
            now_secs,
        ],
    )
    .map_err(|e| e.to_string())?;

    if tx.changes() == 0 {
        let holder: String = tx
            .query_row(
                "SELECT webhook_id FROM slot_bookings
                 WHERE org_email = ?1 AND team_name = ?2 AND slot_date = ?3 AND slot_id = ?4",
                params![
                    invitation.org_email,
                    invitation.team,
                    date_to_text(selection.selected_date),
                    selection.selected_slot_id.0,
                ],
                |row| row.get(0),
            )
            .map_err(|e| e.to_string())?;
        if holder != webhook_id.0 {
            return Ok(CommitOutcome::SlotTaken);
        }
        // The claim is our own, left by a commit that was interrupted
        // before the status flip landed. Resume and finish it.
    }

    invitation.status = InvitationStatus::Submitted;
    invitation.selection = Some(selection.clone());
    invitation.submitted_at = Some(now_secs);
    let updated_json = serde_json::to_string(&invitation).map_err(|e| e.to_string())?;

    // Conditional on status = 'pending' so a concurrent flip between our
    // read and this write cannot produce a second submission.
    tx.execute(
        "UPDATE invitations SET status = 'submitted', record_json = ?1
         WHERE webhook_id = ?2 AND status = 'pending'",
        params![updated_json, webhook_id.0],
    )
    .map_err(|e| e.to_string())?;
    if tx.changes() == 0 {
        return Ok(CommitOutcome::AlreadySubmitted);
    }

    tx.commit().map_err(|e| e.to_string())?;
    Ok(CommitOutcome::Committed(invitation))
}

// =============================================================================
// Async wrappers
// =============================================================================

impl SqliteRepository {
    pub(super) async fn insert_invitation_impl(
        &self,
        invitation: &InvitationRecord,
    ) -> Result<(), RepositoryError> {
        let conn = self.conn.clone();
        let invitation = invitation.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            insert_invitation_sync(&conn, &invitation)
                .map_err(|e| RepositoryError::storage("insert_invitation", e))
        })
        .await
        .map_err(|e| RepositoryError::storage("insert_invitation", e.to_string()))?
    }

    pub(super) async fn get_invitation_impl(
        &self,
        webhook_id: &WebhookId,
    ) -> Result<Option<InvitationRecord>, RepositoryError> {
        let conn = self.conn.clone();
        let webhook_id = webhook_id.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            get_invitation_sync(&conn, &webhook_id)
                .map_err(|e| RepositoryError::storage("get_invitation", e))
        })
        .await
        .map_err(|e| RepositoryError::storage("get_invitation", e.to_string()))?
    }

    pub(super) async fn find_pending_invitation_impl(
        &self,
        job_id: &JobId,
        applicant_email: &str,
        round: &str,
    ) -> Result<Option<InvitationRecord>, RepositoryError> {
        let conn = self.conn.clone();
        let job_id = job_id.clone();
        let applicant_email = applicant_email.to_string();
        let round = round.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            find_pending_invitation_sync(&conn, &job_id, &applicant_email, &round)
                .map_err(|e| RepositoryError::storage("find_pending_invitation", e))
        })
        .await
        .map_err(|e| RepositoryError::storage("find_pending_invitation", e.to_string()))?
    }

    pub(super) async fn cancel_pending_invitations_impl(
        &self,
        job_id: &JobId,
        applicant_email: &str,
        round: &str,
        reason: &str,
    ) -> Result<usize, RepositoryError> {
        let conn = self.conn.clone();
        let job_id = job_id.clone();
        let applicant_email = applicant_email.to_string();
        let round = round.to_string();
        let reason = reason.to_string();
        let now = now_secs();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap();
            cancel_pending_invitations_sync(&mut conn, &job_id, &applicant_email, &round, &reason, now)
                .map_err(|e| RepositoryError::storage("cancel_pending_invitations", e))
        })
        .await
        .map_err(|e| RepositoryError::storage("cancel_pending_invitations", e.to_string()))?
    }

    pub(super) async fn booked_slot_ids_impl(
        &self,
        org_email: &str,
        team: &str,
    ) -> Result<Vec<SlotId>, RepositoryError> {
        let conn = self.conn.clone();
        let org_email = org_email.to_string();
        let team = team.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            booked_slot_ids_sync(&conn, &org_email, &team)
                .map_err(|e| RepositoryError::storage("booked_slot_ids", e))
        })
        .await
        .map_err(|e| RepositoryError::storage("booked_slot_ids", e.to_string()))?
    }

    pub(super) async fn invitation_counts_impl(&self) -> Result<InvitationCounts, RepositoryError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            invitation_counts_sync(&conn)
                .map_err(|e| RepositoryError::storage("invitation_counts", e))
        })
        .await
        .map_err(|e| RepositoryError::storage("invitation_counts", e.to_string()))?
    }

    pub(super) async fn commit_invitation_impl(
        &self,
        webhook_id: &WebhookId,
        selection: &SlotSelection,
        expiry_cutoff: Option<i64>,
    ) -> Result<CommitOutcome, RepositoryError> {
        let conn = self.conn.clone();
        let webhook_id = webhook_id.clone();
        let selection = selection.clone();
        let now = now_secs();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap();
            commit_invitation_sync(&mut conn, &webhook_id, &selection, expiry_cutoff, now)
                .map_err(|e| RepositoryError::storage("commit_invitation", e))
        })
        .await
        .map_err(|e| RepositoryError::storage("commit_invitation", e.to_string()))?
    }
}
