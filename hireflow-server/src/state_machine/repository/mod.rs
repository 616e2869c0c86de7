//! Persistence for applicant records, jobs, teams, and invitation
//! claims.
//!
//! The `Repository` trait is the only storage surface the rest of the
//! server sees. `SqliteRepository` is the production implementation;
//! `InMemoryRepository` backs tests. Both must keep the same claim
//! semantics: `commit_invitation` and `submit_feedback` are the two
//! operations racing clients contend on, and each must admit at most
//! one winner.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use hireflow_core::types::{
    ApplicantStatus, Attendance, ClosedRound, FeedbackId, FeedbackScores, JobId, JobPhase,
    JobType, LocationType, Round, RoundOutcome, SlotId, Team, WebhookId,
};

use super::state::ApplicantState;
use super::store::ApplicantKey;

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

// =============================================================================
// Stored records
// =============================================================================

/// One candidate's record on one job post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredApplicant {
    pub name: String,
    pub state: ApplicantState,
    pub ongoing_rounds: Vec<Round>,
    pub previous_rounds: Vec<ClosedRound>,
    pub applied_at: i64,
    pub updated_at: i64,
}

impl StoredApplicant {
    pub fn new_applied(name: impl Into<String>, applied_at: i64) -> Self {
        Self {
            name: name.into(),
            state: ApplicantState::Applied,
            ongoing_rounds: Vec::new(),
            previous_rounds: Vec::new(),
            applied_at,
            updated_at: applied_at,
        }
    }

    pub fn status(&self) -> ApplicantStatus {
        self.state.status()
    }
}

/// A job post, as created by an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub org_email: String,
    pub org_name: String,
    pub role: String,
    pub location: String,
    pub openings: u32,
    pub package: String,
    pub job_type: JobType,
    pub application_close_date: NaiveDate,
    /// Opaque reference to the uploaded job description, if any.
    pub jd_file: Option<String>,
    pub phase: JobPhase,
    pub created_at: i64,
    pub closed_at: Option<i64>,
}

/// The full team roster for one organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDirectory {
    pub org_email: String,
    pub teams: Vec<Team>,
    pub updated_at: i64,
}

impl TeamDirectory {
    pub fn team(&self, name: &str) -> Option<&Team> {
        self.teams.iter().find(|team| team.name == name)
    }
}

// =============================================================================
// Scheduling invitations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Submitted,
    Cancelled,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "submitted" => Some(Self::Submitted),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The slot a candidate picked, plus the interviewer assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSelection {
    pub selected_date: NaiveDate,
    pub selected_slot_id: SlotId,
    pub selected_time: String,
    pub interviewer_email: String,
    pub interviewer_name: String,
}

/// One scheduling link sent to one candidate for one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvitationRecord {
    pub webhook_id: WebhookId,
    pub org_email: String,
    pub org_name: String,
    pub job_id: JobId,
    pub team: String,
    pub round: String,
    pub applicant_email: String,
    pub applicant_name: String,
    pub location_type: LocationType,
    pub location: Option<String>,
    pub status: InvitationStatus,
    pub selection: Option<SlotSelection>,
    pub created_at: i64,
    pub submitted_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub cancel_reason: Option<String>,
}

/// What `commit_invitation` decided about a booking attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// This attempt won the slot; the record now carries the selection.
    Committed(InvitationRecord),
    NotFound,
    AlreadySubmitted,
    Cancelled,
    Expired,
    /// Another invitation already holds the slot.
    SlotTaken,
}

// =============================================================================
// Feedback invitations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Pending,
    Submitted,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "submitted" => Some(Self::Submitted),
            _ => None,
        }
    }
}

/// What the interviewer reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    pub candidate_attended: Attendance,
    pub outcome: Option<RoundOutcome>,
    pub scores: Option<FeedbackScores>,
    pub reason: Option<String>,
}

/// One feedback link sent to one interviewer for one scheduled round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub feedback_id: FeedbackId,
    pub webhook_id: WebhookId,
    pub org_email: String,
    pub org_name: String,
    pub job_id: JobId,
    pub team: String,
    pub round: String,
    pub applicant_email: String,
    pub applicant_name: String,
    pub interviewer_email: String,
    pub interviewer_name: String,
    pub interview_date: NaiveDate,
    pub interview_time: String,
    pub meeting_link: String,
    pub location_type: LocationType,
    pub location: Option<String>,
    pub status: FeedbackStatus,
    pub submission: Option<FeedbackSubmission>,
    pub created_at: i64,
    pub submitted_at: Option<i64>,
}

/// What `submit_feedback` decided about a submission attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackSubmitOutcome {
    /// This attempt claimed the form; the record now carries the submission.
    Submitted(FeedbackRecord),
    NotFound,
    AlreadySubmitted,
    Expired,
}

// =============================================================================
// Supporting rows
// =============================================================================

/// What `close_job` decided.
#[derive(Debug, Clone, PartialEq)]
pub enum CloseJobOutcome {
    Closed(JobRecord),
    NotFound,
    /// Only ongoing jobs can be closed; open and closed jobs cannot.
    NotOngoing(JobPhase),
}

/// One audit row in an applicant's event history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantEventRow {
    pub event_type: String,
    pub payload: serde_json::Value,
    pub recorded_at: i64,
}

/// Invitation totals for operational dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvitationCounts {
    pub pending: u64,
    pub submitted: u64,
    pub cancelled: u64,
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Clone)]
pub enum RepositoryError {
    /// The backing store failed to carry out an operation.
    Storage { operation: String, detail: String },
    /// Stored data could not be decoded.
    Corruption { detail: String },
}

impl RepositoryError {
    pub fn storage(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            detail: detail.into(),
        }
    }

    pub fn corruption(detail: impl Into<String>) -> Self {
        Self::Corruption {
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage { operation, detail } => {
                write!(f, "storage operation '{operation}' failed: {detail}")
            }
            Self::Corruption { detail } => write!(f, "stored data is corrupt: {detail}"),
        }
    }
}

impl std::error::Error for RepositoryError {}

// =============================================================================
// The trait
// =============================================================================

#[async_trait]
pub trait Repository: Send + Sync {
    // --- Teams ---

    async fn get_teams(&self, org_email: &str) -> Result<Option<TeamDirectory>, RepositoryError>;

    /// Replaces the organization's entire roster. Partial edits are not a
    /// thing: clients send the full directory every time.
    async fn replace_teams(&self, directory: &TeamDirectory) -> Result<(), RepositoryError>;

    // --- Jobs ---

    async fn insert_job(&self, job: &JobRecord) -> Result<(), RepositoryError>;

    async fn get_job(&self, job_id: &JobId) -> Result<Option<JobRecord>, RepositoryError>;

    async fn list_jobs(
        &self,
        org_email: &str,
        phase: Option<JobPhase>,
    ) -> Result<Vec<JobRecord>, RepositoryError>;

    async fn list_open_jobs(&self) -> Result<Vec<JobRecord>, RepositoryError>;

    async fn all_jobs(&self) -> Result<Vec<JobRecord>, RepositoryError>;

    async fn close_job(
        &self,
        job_id: &JobId,
        closed_at: i64,
    ) -> Result<CloseJobOutcome, RepositoryError>;

    /// Moves every open job whose application window has passed into the
    /// ongoing phase and returns the jobs that moved.
    async fn sweep_expired_jobs(&self, today: NaiveDate)
        -> Result<Vec<JobRecord>, RepositoryError>;

    // --- Applicants ---

    /// Inserts the record if no applicant exists under the key. Returns
    /// whether an insert happened; an existing record is left untouched.
    async fn create_applicant(
        &self,
        key: &ApplicantKey,
        record: &StoredApplicant,
    ) -> Result<bool, RepositoryError>;

    async fn get_applicant(
        &self,
        key: &ApplicantKey,
    ) -> Result<Option<StoredApplicant>, RepositoryError>;

    async fn put_applicant(
        &self,
        key: &ApplicantKey,
        record: &StoredApplicant,
    ) -> Result<(), RepositoryError>;

    /// All applicants on one job, as (candidate email, record) pairs.
    async fn list_applicants(
        &self,
        job_id: &JobId,
    ) -> Result<Vec<(String, StoredApplicant)>, RepositoryError>;

    async fn all_applicants(
        &self,
    ) -> Result<Vec<(ApplicantKey, StoredApplicant)>, RepositoryError>;

    async fn log_applicant_event(
        &self,
        key: &ApplicantKey,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<(), RepositoryError>;

    /// Audit rows for one applicant, newest first.
    async fn applicant_events(
        &self,
        key: &ApplicantKey,
    ) -> Result<Vec<ApplicantEventRow>, RepositoryError>;

    // --- Scheduling invitations ---

    async fn insert_invitation(
        &self,
        invitation: &InvitationRecord,
    ) -> Result<(), RepositoryError>;

    async fn get_invitation(
        &self,
        webhook_id: &WebhookId,
    ) -> Result<Option<InvitationRecord>, RepositoryError>;

    async fn find_pending_invitation(
        &self,
        job_id: &JobId,
        applicant_email: &str,
        round: &str,
    ) -> Result<Option<InvitationRecord>, RepositoryError>;

    /// Cancels every pending invitation for the (job, applicant, round)
    /// triple and returns how many were cancelled.
    async fn cancel_pending_invitations(
        &self,
        job_id: &JobId,
        applicant_email: &str,
        round: &str,
        reason: &str,
    ) -> Result<usize, RepositoryError>;

    /// Slot ids already claimed for this organization and team.
    async fn booked_slot_ids(
        &self,
        org_email: &str,
        team: &str,
    ) -> Result<Vec<SlotId>, RepositoryError>;

    async fn invitation_counts(&self) -> Result<InvitationCounts, RepositoryError>;

    /// Atomically books a slot for a pending invitation.
    ///
    /// The slot claim is keyed on (org, team, date, slot id); the first
    /// commit to claim it wins and flips the invitation to submitted in
    /// the same step. Every other concurrent attempt sees `SlotTaken`.
    /// When `expiry_cutoff` is set, invitations created before it are
    /// refused as `Expired`.
    async fn commit_invitation(
        &self,
        webhook_id: &WebhookId,
        selection: &SlotSelection,
        expiry_cutoff: Option<i64>,
    ) -> Result<CommitOutcome, RepositoryError>;

    // --- Feedback invitations ---

    async fn insert_feedback_invitation(
        &self,
        feedback: &FeedbackRecord,
    ) -> Result<(), RepositoryError>;

    async fn get_feedback_invitation(
        &self,
        feedback_id: &FeedbackId,
    ) -> Result<Option<FeedbackRecord>, RepositoryError>;

    /// Single-use claim on a feedback form: the first submission wins and
    /// stores the payload, later attempts see `AlreadySubmitted`.
    async fn submit_feedback(
        &self,
        feedback_id: &FeedbackId,
        submission: &FeedbackSubmission,
        expiry_cutoff: Option<i64>,
    ) -> Result<FeedbackSubmitOutcome, RepositoryError>;

    /// Releases a claimed feedback form so it can be submitted again.
    /// Used when the downstream state change refuses the submission.
    async fn reopen_feedback(&self, feedback_id: &FeedbackId) -> Result<(), RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitation_status_round_trips() {
        for status in [
            InvitationStatus::Pending,
            InvitationStatus::Submitted,
            InvitationStatus::Cancelled,
        ] {
            assert_eq!(InvitationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(InvitationStatus::parse("expired"), None);
    }

    #[test]
    fn test_feedback_status_round_trips() {
        for status in [FeedbackStatus::Pending, FeedbackStatus::Submitted] {
            assert_eq!(FeedbackStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(FeedbackStatus::parse(""), None);
    }

    #[test]
    fn test_new_applicant_starts_applied() {
        let record = StoredApplicant::new_applied("Jane", 100);
        assert_eq!(record.status(), ApplicantStatus::Applied);
        assert_eq!(record.applied_at, record.updated_at);
        assert!(record.ongoing_rounds.is_empty());
        assert!(record.previous_rounds.is_empty());
    }

    #[test]
    fn test_directory_lookup_by_team_name() {
        let directory = TeamDirectory {
            org_email: "org@example.com".to_string(),
            teams: vec![Team {
                name: "Backend".to_string(),
                members: Vec::new(),
            }],
            updated_at: 0,
        };
        assert!(directory.team("Backend").is_some());
        assert!(directory.team("backend").is_none());
    }
}
