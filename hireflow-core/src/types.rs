//! Core domain types: identifiers, statuses, teams, rounds, and scores.
//!
//! These are pure value types shared by the server and the CLI. Anything
//! that talks to the outside world (HTTP, SQLite, SMTP) lives elsewhere.

use serde::{Deserialize, Serialize};

// =============================================================================
// Identifier newtypes
// =============================================================================

/// Identifier of a job posting (`job_<uuid>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        JobId(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

/// Single-use capability token identifying a scheduling invitation.
///
/// Handed to the candidate inside the interview form link; knowing the
/// token is what authorizes the slot commit, so it never appears in logs
/// in full - use [`WebhookId::short`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebhookId(pub String);

impl WebhookId {
    /// Returns a log-safe prefix (first 8 characters) of the token.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for WebhookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WebhookId {
    fn from(s: String) -> Self {
        WebhookId(s)
    }
}

impl From<&str> for WebhookId {
    fn from(s: &str) -> Self {
        WebhookId(s.to_string())
    }
}

/// Single-use capability token identifying a feedback invitation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedbackId(pub String);

impl FeedbackId {
    /// Returns a log-safe prefix (first 8 characters) of the token.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for FeedbackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for FeedbackId {
    fn from(s: String) -> Self {
        FeedbackId(s)
    }
}

impl From<&str> for FeedbackId {
    fn from(s: &str) -> Self {
        FeedbackId(s.to_string())
    }
}

/// Deterministic identifier of a bookable slot.
///
/// Derived from team, date and times (see `slots::derive_slot_id`), so two
/// availability computations over the same calendar data always agree on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub String);

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SlotId {
    fn from(s: String) -> Self {
        SlotId(s)
    }
}

impl From<&str> for SlotId {
    fn from(s: &str) -> Self {
        SlotId(s.to_string())
    }
}

// =============================================================================
// Applicant status
// =============================================================================

/// Lifecycle status of one applicant on one job.
///
/// `Selected` and `Rejected` are terminal: no further transitions are
/// accepted once either is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicantStatus {
    /// Application received, no decision yet.
    Applied,
    /// Organization has parked the application for later review.
    DecisionPending,
    /// Shortlisted; an interview round may be initiated.
    SelectedForInterview,
    /// An interview form link has been sent; waiting for the candidate
    /// to pick a slot.
    InvitationSent,
    /// Interview scheduled; waiting for interviewer feedback.
    Processing,
    /// Hired (terminal).
    Selected,
    /// Not hired (terminal).
    Rejected,
}

impl ApplicantStatus {
    /// Returns true if no further transitions are accepted from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Selected | Self::Rejected)
    }

    /// Wire representation, matching the serde encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::DecisionPending => "decision_pending",
            Self::SelectedForInterview => "selected_for_interview",
            Self::InvitationSent => "invitation_sent",
            Self::Processing => "processing",
            Self::Selected => "selected",
            Self::Rejected => "rejected",
        }
    }

    /// Parse from the wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "applied" => Some(Self::Applied),
            "decision_pending" => Some(Self::DecisionPending),
            "selected_for_interview" => Some(Self::SelectedForInterview),
            "invitation_sent" => Some(Self::InvitationSent),
            "processing" => Some(Self::Processing),
            "selected" => Some(Self::Selected),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApplicantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Job posting
// =============================================================================

/// Phase of a job posting.
///
/// `Open` accepts applications; the sweep moves postings to `Ongoing` once
/// their application window has passed; `Closed` is set by an explicit
/// close call and is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Open,
    Ongoing,
    Closed,
}

impl JobPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Ongoing => "ongoing",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "ongoing" => Some(Self::Ongoing),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Employment type of a job posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    Internship,
    Unpaid,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullTime => "full_time",
            Self::Internship => "internship",
            Self::Unpaid => "unpaid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full_time" => Some(Self::FullTime),
            "internship" => Some(Self::Internship),
            "unpaid" => Some(Self::Unpaid),
            _ => None,
        }
    }
}

/// Where an interview round takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    /// Video call; a meeting link is derived for the round.
    Online,
    /// In person; the round carries the job posting's location string.
    Offline,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(Self::Online),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }
}

impl std::fmt::Display for LocationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Teams
// =============================================================================

/// One member of an interviewing team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub email: String,
    /// Opaque link to the member's availability calendar. Members without
    /// one are treated as having no busy intervals.
    #[serde(default)]
    pub calendar_link: Option<String>,
}

/// An interviewing team: a named set of members.
///
/// Rosters are replaced wholesale (last-writer-wins); there is no merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub members: Vec<TeamMember>,
}

impl Team {
    /// Validates the roster shape: non-empty team name, and every member
    /// has a non-empty name and email. Calendar links are opaque and not
    /// inspected here.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Team name must not be empty".to_string());
        }
        for (i, member) in self.members.iter().enumerate() {
            if member.name.trim().is_empty() {
                return Err(format!(
                    "Member {} of team '{}' has an empty name",
                    i + 1,
                    self.name
                ));
            }
            if member.email.trim().is_empty() {
                return Err(format!(
                    "Member '{}' of team '{}' has an empty email",
                    member.name, self.name
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Interview rounds
// =============================================================================

/// How the candidate showed up for a scheduled interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attendance {
    Yes,
    No,
    Reschedule,
}

impl Attendance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Reschedule => "reschedule",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "reschedule" => Some(Self::Reschedule),
            _ => None,
        }
    }
}

/// Interviewer verdict for an attended round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    /// Hire: the applicant reaches the terminal `selected` status.
    Selected,
    /// Advance to another round.
    Proceed,
    /// Reject: the applicant reaches the terminal `rejected` status.
    Rejected,
}

impl RoundOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Selected => "selected",
            Self::Proceed => "proceed",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "selected" => Some(Self::Selected),
            "proceed" => Some(Self::Proceed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// The seven per-round interviewer scores, each on a 1-5 scale.
///
/// A zeroed instance (see [`FeedbackScores::zeroed`]) marks a round that
/// was closed without being evaluated (reschedule).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackScores {
    pub technical_configuration: u8,
    pub technical_customization: u8,
    pub communication_skills: u8,
    pub leadership_abilities: u8,
    pub enthusiasm: u8,
    pub teamwork: u8,
    pub attitude: u8,
}

impl FeedbackScores {
    /// All-zero scores, used when a round is closed unevaluated.
    pub fn zeroed() -> Self {
        Self {
            technical_configuration: 0,
            technical_customization: 0,
            communication_skills: 0,
            leadership_abilities: 0,
            enthusiasm: 0,
            teamwork: 0,
            attitude: 0,
        }
    }

    fn fields(&self) -> [(&'static str, u8); 7] {
        [
            ("technical_configuration", self.technical_configuration),
            ("technical_customization", self.technical_customization),
            ("communication_skills", self.communication_skills),
            ("leadership_abilities", self.leadership_abilities),
            ("enthusiasm", self.enthusiasm),
            ("teamwork", self.teamwork),
            ("attitude", self.attitude),
        ]
    }

    /// Validates that every score is in 1..=5. Zeroed scores are not valid
    /// as a submission; they only appear on rounds closed by a reschedule.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in self.fields() {
            if !(1..=5).contains(&value) {
                return Err(format!("Score '{}' must be between 1 and 5, got {}", name, value));
            }
        }
        Ok(())
    }
}

/// One scheduled interview stage for one applicant, awaiting feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Round name as chosen by the organization, e.g. "Technical Round 1".
    pub round: String,
    pub interviewer_email: String,
    pub interviewer_name: String,
    pub interview_date: chrono::NaiveDate,
    /// Display form of the committed slot, e.g. "09:00 - 09:30".
    pub interview_time: String,
    pub meeting_link: String,
    pub location_type: LocationType,
    /// Physical address for offline rounds; None for online.
    pub location: Option<String>,
    /// Unix timestamp (UTC) of when the slot was committed.
    pub scheduled_at: i64,
    pub feedback_id: FeedbackId,
}

/// A round with its feedback recorded.
///
/// `outcome` is None exactly when the round was closed by a reschedule
/// request; no-shows are recorded as `Rejected` with a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedRound {
    #[serde(flatten)]
    pub details: Round,
    pub candidate_attended: Attendance,
    pub outcome: Option<RoundOutcome>,
    pub scores: Option<FeedbackScores>,
    pub reason: Option<String>,
    /// Unix timestamp (UTC) of the feedback submission.
    pub feedback_submitted_at: i64,
}

/// The feedback fields that close a round, detached from the round they
/// close.
///
/// The round bookkeeping finds the ongoing round by feedback token and
/// combines it with this closure into a [`ClosedRound`], so scheduling
/// details can never drift between the open and closed representations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundClosure {
    pub candidate_attended: Attendance,
    pub outcome: Option<RoundOutcome>,
    pub scores: Option<FeedbackScores>,
    pub reason: Option<String>,
    /// Unix timestamp (UTC) of the feedback submission.
    pub feedback_submitted_at: i64,
}

impl Round {
    /// Applies a closure to this round, producing its history entry.
    pub fn apply_closure(self, closure: RoundClosure) -> ClosedRound {
        ClosedRound {
            details: self,
            candidate_attended: closure.candidate_attended,
            outcome: closure.outcome,
            scores: closure.scores,
            reason: closure.reason,
            feedback_submitted_at: closure.feedback_submitted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_id_short() {
        let id = WebhookId::from("abcdef1234567890");
        assert_eq!(id.short(), "abcdef12");

        let tiny = WebhookId::from("abc");
        assert_eq!(tiny.short(), "abc");
    }

    #[test]
    fn test_applicant_status_is_terminal() {
        assert!(!ApplicantStatus::Applied.is_terminal());
        assert!(!ApplicantStatus::DecisionPending.is_terminal());
        assert!(!ApplicantStatus::SelectedForInterview.is_terminal());
        assert!(!ApplicantStatus::InvitationSent.is_terminal());
        assert!(!ApplicantStatus::Processing.is_terminal());
        assert!(ApplicantStatus::Selected.is_terminal());
        assert!(ApplicantStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_applicant_status_parse_round_trip() {
        for status in [
            ApplicantStatus::Applied,
            ApplicantStatus::DecisionPending,
            ApplicantStatus::SelectedForInterview,
            ApplicantStatus::InvitationSent,
            ApplicantStatus::Processing,
            ApplicantStatus::Selected,
            ApplicantStatus::Rejected,
        ] {
            assert_eq!(ApplicantStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ApplicantStatus::parse("hired"), None);
    }

    #[test]
    fn test_applicant_status_serde_matches_as_str() {
        let json = serde_json::to_string(&ApplicantStatus::SelectedForInterview).unwrap();
        assert_eq!(json, "\"selected_for_interview\"");
        let parsed: ApplicantStatus = serde_json::from_str("\"decision_pending\"").unwrap();
        assert_eq!(parsed, ApplicantStatus::DecisionPending);
    }

    #[test]
    fn test_job_phase_parse() {
        assert_eq!(JobPhase::parse("open"), Some(JobPhase::Open));
        assert_eq!(JobPhase::parse("ongoing"), Some(JobPhase::Ongoing));
        assert_eq!(JobPhase::parse("closed"), Some(JobPhase::Closed));
        assert_eq!(JobPhase::parse("archived"), None);
    }

    #[test]
    fn test_team_validate_accepts_well_formed_roster() {
        let team = Team {
            name: "Backend".to_string(),
            members: vec![
                TeamMember {
                    name: "Alice".to_string(),
                    email: "alice@example.com".to_string(),
                    calendar_link: Some("https://cal.example.com/alice".to_string()),
                },
                TeamMember {
                    name: "Bob".to_string(),
                    email: "bob@example.com".to_string(),
                    calendar_link: None,
                },
            ],
        };
        assert!(team.validate().is_ok());
    }

    #[test]
    fn test_team_validate_rejects_empty_team_name() {
        let team = Team {
            name: "   ".to_string(),
            members: vec![],
        };
        assert!(team.validate().is_err());
    }

    #[test]
    fn test_team_validate_rejects_member_without_email() {
        let team = Team {
            name: "Backend".to_string(),
            members: vec![TeamMember {
                name: "Alice".to_string(),
                email: "".to_string(),
                calendar_link: None,
            }],
        };
        let err = team.validate().unwrap_err();
        assert!(err.contains("Alice"), "error should name the member: {}", err);
    }

    #[test]
    fn test_scores_validate_range() {
        let mut scores = FeedbackScores {
            technical_configuration: 4,
            technical_customization: 3,
            communication_skills: 5,
            leadership_abilities: 2,
            enthusiasm: 5,
            teamwork: 4,
            attitude: 1,
        };
        assert!(scores.validate().is_ok());

        scores.teamwork = 0;
        assert!(scores.validate().is_err());

        scores.teamwork = 6;
        assert!(scores.validate().is_err());
    }

    #[test]
    fn test_zeroed_scores_fail_validation() {
        assert!(FeedbackScores::zeroed().validate().is_err());
    }

    #[test]
    fn test_closed_round_serializes_flat() {
        let round = Round {
            round: "Technical Round 1".to_string(),
            interviewer_email: "alice@example.com".to_string(),
            interviewer_name: "Alice".to_string(),
            interview_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            interview_time: "09:00 - 09:30".to_string(),
            meeting_link: "https://meet.example.com/abc123".to_string(),
            location_type: LocationType::Online,
            location: None,
            scheduled_at: 1_749_500_000,
            feedback_id: FeedbackId::from("fb-1"),
        };
        let closed = round.apply_closure(RoundClosure {
            candidate_attended: Attendance::Yes,
            outcome: Some(RoundOutcome::Proceed),
            scores: None,
            reason: None,
            feedback_submitted_at: 1_749_600_000,
        });
        let value = serde_json::to_value(&closed).unwrap();
        // Round fields are flattened alongside the outcome fields.
        assert_eq!(value["round"], "Technical Round 1");
        assert_eq!(value["outcome"], "proceed");
        assert_eq!(value["candidate_attended"], "yes");
    }
}
