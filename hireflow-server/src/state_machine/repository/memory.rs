//! In-memory repository used by tests.
//!
//! Keeps every concern in a `HashMap` behind a `tokio::sync::RwLock`.
//! Slot claims and the invitations they belong to share a fixed lock
//! order (invitations, then bookings) so the commit path stays atomic
//! without a real transaction.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use hireflow_core::types::{FeedbackId, JobId, JobPhase, SlotId, WebhookId};

use super::super::store::ApplicantKey;
use super::{
    ApplicantEventRow, CloseJobOutcome, CommitOutcome, FeedbackRecord, FeedbackStatus,
    FeedbackSubmission, FeedbackSubmitOutcome, InvitationCounts, InvitationRecord,
    InvitationStatus, JobRecord, Repository, RepositoryError, StoredApplicant, TeamDirectory,
};

/// (org email, team, date, slot id) — the unit of slot contention.
type BookingKey = (String, String, NaiveDate, SlotId);

fn now_secs() -> i64 {
    Utc::now().timestamp()
}

#[derive(Default)]
pub struct InMemoryRepository {
    teams: RwLock<HashMap<String, TeamDirectory>>,
    jobs: RwLock<HashMap<JobId, JobRecord>>,
    applicants: RwLock<HashMap<ApplicantKey, StoredApplicant>>,
    events: RwLock<HashMap<ApplicantKey, Vec<ApplicantEventRow>>>,
    invitations: RwLock<HashMap<WebhookId, InvitationRecord>>,
    feedback: RwLock<HashMap<FeedbackId, FeedbackRecord>>,
    slot_bookings: RwLock<HashMap<BookingKey, WebhookId>>,
}

#[async_trait]
impl Repository for InMemoryRepository {
    // --- Teams ---

    async fn get_teams(&self, org_email: &str) -> Result<Option<TeamDirectory>, RepositoryError> {
        let teams = self.teams.read().await;
        Ok(teams.get(org_email).cloned())
    }

    async fn replace_teams(&self, directory: &TeamDirectory) -> Result<(), RepositoryError> {
        let mut teams = self.teams.write().await;
        teams.insert(directory.org_email.clone(), directory.clone());
        Ok(())
    }

    // --- Jobs ---

    async fn insert_job(&self, job: &JobRecord) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    async fn get_job(&self, job_id: &JobId) -> Result<Option<JobRecord>, RepositoryError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(job_id).cloned())
    }

    async fn list_jobs(
        &self,
        org_email: &str,
        phase: Option<JobPhase>,
    ) -> Result<Vec<JobRecord>, RepositoryError> {
        let jobs = self.jobs.read().await;
        let mut matching: Vec<JobRecord> = jobs
            .values()
            .filter(|job| job.org_email == org_email)
            .filter(|job| phase.map_or(true, |wanted| job.phase == wanted))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn list_open_jobs(&self) -> Result<Vec<JobRecord>, RepositoryError> {
        let jobs = self.jobs.read().await;
        let mut open: Vec<JobRecord> = jobs
            .values()
            .filter(|job| job.phase == JobPhase::Open)
            .cloned()
            .collect();
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(open)
    }

    async fn all_jobs(&self) -> Result<Vec<JobRecord>, RepositoryError> {
        let jobs = self.jobs.read().await;
        let mut all: Vec<JobRecord> = jobs.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn close_job(
        &self,
        job_id: &JobId,
        closed_at: i64,
    ) -> Result<CloseJobOutcome, RepositoryError> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(job_id) else {
            return Ok(CloseJobOutcome::NotFound);
        };
        match job.phase {
            JobPhase::Ongoing => {
                job.phase = JobPhase::Closed;
                job.closed_at = Some(closed_at);
                Ok(CloseJobOutcome::Closed(job.clone()))
            }
            phase => Ok(CloseJobOutcome::NotOngoing(phase)),
        }
    }

    async fn sweep_expired_jobs(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<JobRecord>, RepositoryError> {
        let mut jobs = self.jobs.write().await;
        let mut swept = Vec::new();
        for job in jobs.values_mut() {
            if job.phase == JobPhase::Open && job.application_close_date < today {
                job.phase = JobPhase::Ongoing;
                swept.push(job.clone());
            }
        }
        Ok(swept)
    }

    // --- Applicants ---

    async fn create_applicant(
        &self,
        key: &ApplicantKey,
        record: &StoredApplicant,
    ) -> Result<bool, RepositoryError> {
        let mut applicants = self.applicants.write().await;
        match applicants.entry(key.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                entry.insert(record.clone());
                Ok(true)
            }
        }
    }

    async fn get_applicant(
        &self,
        key: &ApplicantKey,
    ) -> Result<Option<StoredApplicant>, RepositoryError> {
        let applicants = self.applicants.read().await;
        Ok(applicants.get(key).cloned())
    }

    async fn put_applicant(
        &self,
        key: &ApplicantKey,
        record: &StoredApplicant,
    ) -> Result<(), RepositoryError> {
        let mut applicants = self.applicants.write().await;
        applicants.insert(key.clone(), record.clone());
        Ok(())
    }

    async fn list_applicants(
        &self,
        job_id: &JobId,
    ) -> Result<Vec<(String, StoredApplicant)>, RepositoryError> {
        let applicants = self.applicants.read().await;
        let mut matching: Vec<(String, StoredApplicant)> = applicants
            .iter()
            .filter(|(key, _)| &key.job_id == job_id)
            .map(|(key, record)| (key.candidate_email.clone(), record.clone()))
            .collect();
        matching.sort_by(|a, b| a.1.applied_at.cmp(&b.1.applied_at));
        Ok(matching)
    }

    async fn all_applicants(
        &self,
    ) -> Result<Vec<(ApplicantKey, StoredApplicant)>, RepositoryError> {
        let applicants = self.applicants.read().await;
        Ok(applicants
            .iter()
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect())
    }

    async fn log_applicant_event(
        &self,
        key: &ApplicantKey,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        let mut events = self.events.write().await;
        events.entry(key.clone()).or_default().push(ApplicantEventRow {
            event_type: event_type.to_string(),
            payload: payload.clone(),
            recorded_at: now_secs(),
        });
        Ok(())
    }

    async fn applicant_events(
        &self,
        key: &ApplicantKey,
    ) -> Result<Vec<ApplicantEventRow>, RepositoryError> {
        let events = self.events.read().await;
        let mut rows = events.get(key).cloned().unwrap_or_default();
        rows.reverse();
        Ok(rows)
    }

    // --- Scheduling invitations ---

    async fn insert_invitation(
        &self,
        invitation: &InvitationRecord,
    ) -> Result<(), RepositoryError> {
        let mut invitations = self.invitations.write().await;
        invitations.insert(invitation.webhook_id.clone(), invitation.clone());
        Ok(())
    }

    async fn get_invitation(
        &self,
        webhook_id: &WebhookId,
    ) -> Result<Option<InvitationRecord>, RepositoryError> {
        let invitations = self.invitations.read().await;
        Ok(invitations.get(webhook_id).cloned())
    }

    async fn find_pending_invitation(
        &self,
        job_id: &JobId,
        applicant_email: &str,
        round: &str,
    ) -> Result<Option<InvitationRecord>, RepositoryError> {
        let invitations = self.invitations.read().await;
        Ok(invitations
            .values()
            .find(|invitation| {
                invitation.status == InvitationStatus::Pending
                    && &invitation.job_id == job_id
                    && invitation.applicant_email == applicant_email
                    && invitation.round == round
            })
            .cloned())
    }

    async fn cancel_pending_invitations(
        &self,
        job_id: &JobId,
        applicant_email: &str,
        round: &str,
        reason: &str,
    ) -> Result<usize, RepositoryError> {
        let mut invitations = self.invitations.write().await;
        let now = now_secs();
        let mut cancelled = 0;
        for invitation in invitations.values_mut() {
            if invitation.status == InvitationStatus::Pending
                && &invitation.job_id == job_id
                && invitation.applicant_email == applicant_email
                && invitation.round == round
            {
                invitation.status = InvitationStatus::Cancelled;
                invitation.cancelled_at = Some(now);
                invitation.cancel_reason = Some(reason.to_string());
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    async fn booked_slot_ids(
        &self,
        org_email: &str,
        team: &str,
    ) -> Result<Vec<SlotId>, RepositoryError> {
        let bookings = self.slot_bookings.read().await;
        Ok(bookings
            .keys()
            .filter(|(org, booked_team, _, _)| org == org_email && booked_team == team)
            .map(|(_, _, _, slot_id)| slot_id.clone())
            .collect())
    }

    async fn invitation_counts(&self) -> Result<InvitationCounts, RepositoryError> {
        let invitations = self.invitations.read().await;
        let mut counts = InvitationCounts::default();
        for invitation in invitations.values() {
            match invitation.status {
                InvitationStatus::Pending => counts.pending += 1,
                InvitationStatus::Submitted => counts.submitted += 1,
                InvitationStatus::Cancelled => counts.cancelled += 1,
            }
        }
        Ok(counts)
    }

    async fn commit_invitation(
        &self,
        webhook_id: &WebhookId,
        selection: &super::SlotSelection,
        expiry_cutoff: Option<i64>,
    ) -> Result<CommitOutcome, RepositoryError> {
        // Lock order: invitations before bookings, everywhere.
        let mut invitations = self.invitations.write().await;
        let mut bookings = self.slot_bookings.write().await;

        let Some(invitation) = invitations.get_mut(webhook_id) else {
            return Ok(CommitOutcome::NotFound);
        };
        match invitation.status {
            InvitationStatus::Submitted => return Ok(CommitOutcome::AlreadySubmitted),
            InvitationStatus::Cancelled => return Ok(CommitOutcome::Cancelled),
            InvitationStatus::Pending => {}
        }
        if let Some(cutoff) = expiry_cutoff {
            if invitation.created_at < cutoff {
                return Ok(CommitOutcome::Expired);
            }
        }

        let key = (
            invitation.org_email.clone(),
            invitation.team.clone(),
            selection.selected_date,
            selection.selected_slot_id.clone(),
        );
        match bookings.entry(key) {
            Entry::Occupied(entry) => {
                if entry.get() != webhook_id {
                    return Ok(CommitOutcome::SlotTaken);
                }
                // Our own stale claim from an interrupted commit; resume it.
            }
            Entry::Vacant(entry) => {
                entry.insert(webhook_id.clone());
            }
        }

        invitation.status = InvitationStatus::Submitted;
        invitation.selection = Some(selection.clone());
        invitation.submitted_at = Some(now_secs());
        Ok(CommitOutcome::Committed(invitation.clone()))
    }

    // --- Feedback invitations ---

    async fn insert_feedback_invitation(
        &self,
        feedback: &FeedbackRecord,
    ) -> Result<(), RepositoryError> {
        let mut records = self.feedback.write().await;
        records.insert(feedback.feedback_id.clone(), feedback.clone());
        Ok(())
    }

    async fn get_feedback_invitation(
        &self,
        feedback_id: &FeedbackId,
    ) -> Result<Option<FeedbackRecord>, RepositoryError> {
        let records = self.feedback.read().await;
        Ok(records.get(feedback_id).cloned())
    }

    async fn submit_feedback(
        &self,
        feedback_id: &FeedbackId,
        submission: &FeedbackSubmission,
        expiry_cutoff: Option<i64>,
    ) -> Result<FeedbackSubmitOutcome, RepositoryError> {
        let mut records = self.feedback.write().await;
        let Some(record) = records.get_mut(feedback_id) else {
            return Ok(FeedbackSubmitOutcome::NotFound);
        };
        if record.status == FeedbackStatus::Submitted {
            return Ok(FeedbackSubmitOutcome::AlreadySubmitted);
        }
        if let Some(cutoff) = expiry_cutoff {
            if record.created_at < cutoff {
                return Ok(FeedbackSubmitOutcome::Expired);
            }
        }
        record.status = FeedbackStatus::Submitted;
        record.submission = Some(submission.clone());
        record.submitted_at = Some(now_secs());
        Ok(FeedbackSubmitOutcome::Submitted(record.clone()))
    }

    async fn reopen_feedback(&self, feedback_id: &FeedbackId) -> Result<(), RepositoryError> {
        let mut records = self.feedback.write().await;
        if let Some(record) = records.get_mut(feedback_id) {
            record.status = FeedbackStatus::Pending;
            record.submission = None;
            record.submitted_at = None;
        }
        Ok(())
    }
}
