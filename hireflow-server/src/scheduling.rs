//! Public scheduling surface: the endpoints behind the capability links
//! sent by email.
//!
//! No bearer auth here; possession of the `webhook_id` or `feedback_id`
//! token is what authorizes each call. The commit endpoint is the one
//! place two candidates can race for the same slot, so everything it
//! validates up front is re-checked atomically by
//! `Repository::commit_invitation`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use chrono::{Local, NaiveDate, Utc};
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use hireflow_core::slots::{parse_time_range, Slot};
use hireflow_core::types::{
    Attendance, FeedbackId, FeedbackScores, Round, RoundClosure, RoundOutcome, SlotId, WebhookId,
};

use crate::availability::{team_availability, TeamAvailability};
use crate::error::ApiError;
use crate::mailer::EmailJob;
use crate::state_machine::event::ApplicantEvent;
use crate::state_machine::repository::{
    CommitOutcome, FeedbackRecord, FeedbackStatus, FeedbackSubmission, FeedbackSubmitOutcome,
    InvitationStatus, SlotSelection,
};
use crate::state_machine::store::ApplicantKey;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/get-free-slots", post(get_free_slots))
        .route("/api/check-webhook-status", post(check_webhook_status))
        .route("/api/submit-interview-form", post(submit_interview_form))
        .route("/api/check-feedback-status", post(check_feedback_status))
        .route(
            "/api/submit-interview-feedback",
            post(submit_interview_feedback),
        )
}

// =============================================================================
// Free slots
// =============================================================================

#[derive(Debug, Deserialize)]
struct GetFreeSlotsRequest {
    #[serde(rename = "orgEmail")]
    org_email: String,
    #[serde(rename = "orgName")]
    org_name: String,
    #[serde(rename = "teamName")]
    team_name: String,
    /// When present, the invitation is validated before slots are offered.
    webhook_id: Option<String>,
}

fn slots_payload(free: &BTreeMap<NaiveDate, Vec<Slot>>) -> Value {
    let mut days = serde_json::Map::new();
    for (date, slots) in free {
        let entries: Vec<Value> = slots
            .iter()
            .map(|slot| {
                json!({
                    "slot_id": slot.slot_id.0,
                    "start": slot.start.format("%H:%M").to_string(),
                    "end": slot.end.format("%H:%M").to_string(),
                    "time": slot.time_range(),
                })
            })
            .collect();
        days.insert(date.format("%Y-%m-%d").to_string(), Value::Array(entries));
    }
    Value::Object(days)
}

/// Checks that a pending invitation matches the requesting organization
/// and team, and is still usable.
async fn validate_invitation_for_slots(
    state: &AppState,
    raw_webhook: &str,
    org_email: &str,
    team_name: &str,
) -> Result<(), ApiError> {
    let webhook_id = WebhookId::from(raw_webhook);
    let invitation = state
        .repository
        .get_invitation(&webhook_id)
        .await?
        .ok_or_else(|| ApiError::InvalidToken {
            detail: "Unknown webhook_id".to_string(),
        })?;

    if invitation.org_email != org_email || invitation.team != team_name {
        return Err(ApiError::validation(
            "webhook_id does not belong to this organization and team",
        ));
    }
    match invitation.status {
        InvitationStatus::Pending => Ok(()),
        InvitationStatus::Submitted => Err(ApiError::AlreadySubmitted {
            detail: "This interview form has already been submitted".to_string(),
        }),
        InvitationStatus::Cancelled => Err(ApiError::Cancelled {
            detail: "This interview form has been cancelled".to_string(),
        }),
    }
}

async fn get_free_slots(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GetFreeSlotsRequest>,
) -> Result<Json<Value>, ApiError> {
    if let Some(raw) = &request.webhook_id {
        validate_invitation_for_slots(&state, raw, &request.org_email, &request.team_name).await?;
    }

    let directory = state
        .repository
        .get_teams(&request.org_email)
        .await?
        .ok_or_else(|| ApiError::not_found("No teams registered for this organization"))?;
    let team = directory
        .team(&request.team_name)
        .ok_or_else(|| ApiError::not_found("No such team"))?;

    let today = Local::now().date_naive();
    let availability = team_availability(
        state.calendar.as_ref(),
        state.repository.as_ref(),
        &request.org_email,
        team,
        &state.config.slots,
        today,
    )
    .await?;

    if availability.free.is_empty() {
        warn!(
            "No bookable slots for team '{}' of {} in the next {} working days",
            team.name, request.org_email, state.config.slots.lookahead_days
        );
        state.mailer.send(EmailJob::NoSlotsAvailable {
            to: request.org_email.clone(),
            org_name: request.org_name.clone(),
            team: team.name.clone(),
            lookahead_days: state.config.slots.lookahead_days,
        });
        return Ok(Json(json!({
            "success": true,
            "free_slots": {},
            "no_slots_available": true,
        })));
    }

    Ok(Json(json!({
        "success": true,
        "free_slots": slots_payload(&availability.free),
        "no_slots_available": false,
    })))
}

// =============================================================================
// Webhook status
// =============================================================================

#[derive(Debug, Deserialize)]
struct CheckWebhookStatusRequest {
    webhook_id: String,
}

async fn check_webhook_status(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CheckWebhookStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let webhook_id = WebhookId::from(request.webhook_id.as_str());
    let Some(invitation) = state.repository.get_invitation(&webhook_id).await? else {
        return Ok(Json(json!({
            "success": true,
            "exists": false,
            "submitted": false,
        })));
    };

    let expired = matches!(invitation.status, InvitationStatus::Pending)
        && state
            .expiry_cutoff()
            .is_some_and(|cutoff| invitation.created_at < cutoff);

    let data = invitation.selection.as_ref().map(|selection| {
        json!({
            "selected_date": selection.selected_date.format("%Y-%m-%d").to_string(),
            "selected_time": selection.selected_time,
            "round": invitation.round,
            "team": invitation.team,
        })
    });

    Ok(Json(json!({
        "success": true,
        "exists": true,
        "submitted": matches!(invitation.status, InvitationStatus::Submitted),
        "cancelled": matches!(invitation.status, InvitationStatus::Cancelled),
        "expired": expired,
        "data": data,
    })))
}

// =============================================================================
// Slot commit
// =============================================================================

#[derive(Debug, Deserialize)]
struct SubmitInterviewFormRequest {
    webhook_id: String,
    /// `YYYY-MM-DD`
    selected_date: String,
    selected_slot_id: String,
    /// `HH:MM - HH:MM`
    selected_time: String,
}

/// Re-derives the slot from current calendar data and picks a free
/// interviewer for it. Any mismatch with what the candidate saw means
/// the offer has gone stale and they must pick again.
fn resolve_selection(
    availability: &TeamAvailability,
    team: &hireflow_core::types::Team,
    selected_date: NaiveDate,
    selected_slot_id: &SlotId,
    selected_time: &str,
) -> Result<SlotSelection, ApiError> {
    let stale = || ApiError::SlotConflict {
        detail: "The selected slot is no longer available; please pick another".to_string(),
    };

    let (date, slot) = availability.find_slot(selected_slot_id).ok_or_else(stale)?;
    if date != selected_date || slot.time_range() != selected_time {
        return Err(stale());
    }

    let free_members = availability.members_free_at(date, slot);
    let interviewer_email = free_members
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or_else(stale)?;
    let interviewer_name = team
        .members
        .iter()
        .find(|member| member.email == interviewer_email)
        .map(|member| member.name.clone())
        .unwrap_or_else(|| interviewer_email.clone());

    Ok(SlotSelection {
        selected_date,
        selected_slot_id: selected_slot_id.clone(),
        selected_time: selected_time.to_string(),
        interviewer_email,
        interviewer_name,
    })
}

async fn submit_interview_form(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitInterviewFormRequest>,
) -> Result<Json<Value>, ApiError> {
    let webhook_id = WebhookId::from(request.webhook_id.as_str());
    let invitation = state
        .repository
        .get_invitation(&webhook_id)
        .await?
        .ok_or_else(|| ApiError::InvalidToken {
            detail: "Unknown webhook_id".to_string(),
        })?;
    match invitation.status {
        InvitationStatus::Pending => {}
        InvitationStatus::Submitted => {
            return Err(ApiError::AlreadySubmitted {
                detail: "This interview form has already been submitted".to_string(),
            })
        }
        InvitationStatus::Cancelled => {
            return Err(ApiError::Cancelled {
                detail: "This interview form has been cancelled".to_string(),
            })
        }
    }

    let selected_date = NaiveDate::parse_from_str(&request.selected_date, "%Y-%m-%d")
        .map_err(|_| ApiError::validation("selected_date must be YYYY-MM-DD"))?;
    if parse_time_range(&request.selected_time).is_none() {
        return Err(ApiError::validation(
            "selected_time must be 'HH:MM - HH:MM'",
        ));
    }
    let selected_slot_id = SlotId::from(request.selected_slot_id.as_str());

    let directory = state
        .repository
        .get_teams(&invitation.org_email)
        .await?
        .ok_or_else(|| ApiError::validation("The interviewing team no longer exists"))?;
    let team = directory
        .team(&invitation.team)
        .ok_or_else(|| ApiError::validation("The interviewing team no longer exists"))?;

    let today = Local::now().date_naive();
    let availability = team_availability(
        state.calendar.as_ref(),
        state.repository.as_ref(),
        &invitation.org_email,
        team,
        &state.config.slots,
        today,
    )
    .await?;
    let selection = resolve_selection(
        &availability,
        team,
        selected_date,
        &selected_slot_id,
        &request.selected_time,
    )?;

    let outcome = state
        .repository
        .commit_invitation(&webhook_id, &selection, state.expiry_cutoff())
        .await?;
    let invitation = match outcome {
        CommitOutcome::Committed(record) => record,
        CommitOutcome::NotFound => {
            return Err(ApiError::InvalidToken {
                detail: "Unknown webhook_id".to_string(),
            })
        }
        CommitOutcome::AlreadySubmitted => {
            return Err(ApiError::AlreadySubmitted {
                detail: "This interview form has already been submitted".to_string(),
            })
        }
        CommitOutcome::Cancelled => {
            return Err(ApiError::Cancelled {
                detail: "This interview form has been cancelled".to_string(),
            })
        }
        CommitOutcome::Expired => {
            return Err(ApiError::Expired {
                detail: "This interview form link has expired".to_string(),
            })
        }
        CommitOutcome::SlotTaken => {
            return Err(ApiError::SlotConflict {
                detail: "The selected slot was just taken; please pick another".to_string(),
            })
        }
    };

    info!(
        "Invitation {}.. committed slot {} on {} for {}",
        webhook_id.short(),
        selection.selected_slot_id,
        selection.selected_date,
        invitation.applicant_email
    );

    let now = Utc::now().timestamp();
    let feedback_id = FeedbackId(uuid::Uuid::new_v4().to_string());
    let meeting_link = state.new_meeting_link();
    let feedback_link = state.feedback_form_link(&feedback_id);

    let round = Round {
        round: invitation.round.clone(),
        interviewer_email: selection.interviewer_email.clone(),
        interviewer_name: selection.interviewer_name.clone(),
        interview_date: selection.selected_date,
        interview_time: selection.selected_time.clone(),
        meeting_link: meeting_link.clone(),
        location_type: invitation.location_type,
        location: invitation.location.clone(),
        scheduled_at: now,
        feedback_id: feedback_id.clone(),
    };

    state
        .repository
        .insert_feedback_invitation(&FeedbackRecord {
            feedback_id: feedback_id.clone(),
            webhook_id: webhook_id.clone(),
            org_email: invitation.org_email.clone(),
            org_name: invitation.org_name.clone(),
            job_id: invitation.job_id.clone(),
            team: invitation.team.clone(),
            round: invitation.round.clone(),
            applicant_email: invitation.applicant_email.clone(),
            applicant_name: invitation.applicant_name.clone(),
            interviewer_email: selection.interviewer_email.clone(),
            interviewer_name: selection.interviewer_name.clone(),
            interview_date: selection.selected_date,
            interview_time: selection.selected_time.clone(),
            meeting_link: meeting_link.clone(),
            location_type: invitation.location_type,
            location: invitation.location.clone(),
            status: FeedbackStatus::Pending,
            submission: None,
            created_at: now,
            submitted_at: None,
        })
        .await?;

    let interview_date = selection.selected_date.format("%Y-%m-%d").to_string();
    let emails = vec![
        EmailJob::InterviewScheduled {
            to: invitation.applicant_email.clone(),
            applicant_name: invitation.applicant_name.clone(),
            org_name: invitation.org_name.clone(),
            round: invitation.round.clone(),
            interview_date: interview_date.clone(),
            interview_time: selection.selected_time.clone(),
            meeting_link: meeting_link.clone(),
            location_type: invitation.location_type,
            location: invitation.location.clone(),
        },
        EmailJob::InterviewerAssigned {
            to: selection.interviewer_email.clone(),
            interviewer_name: selection.interviewer_name.clone(),
            applicant_name: invitation.applicant_name.clone(),
            round: invitation.round.clone(),
            interview_date: interview_date.clone(),
            interview_time: selection.selected_time.clone(),
            meeting_link: meeting_link.clone(),
            feedback_link,
        },
    ];

    let key = ApplicantKey::new(
        invitation.job_id.clone(),
        invitation.applicant_email.clone(),
    );
    state
        .store
        .process_event(
            &key,
            ApplicantEvent::SlotCommitted {
                webhook_id,
                round: round.clone(),
                emails,
            },
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Interview scheduled",
        "data": {
            "round": round.round,
            "interview_date": interview_date,
            "interview_time": round.interview_time,
            "meeting_link": round.meeting_link,
            "location_type": round.location_type.as_str(),
            "location": round.location,
            "interviewer_name": round.interviewer_name,
        },
    })))
}

// =============================================================================
// Feedback status
// =============================================================================

#[derive(Debug, Deserialize)]
struct CheckFeedbackStatusRequest {
    feedback_id: String,
}

async fn check_feedback_status(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CheckFeedbackStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let feedback_id = FeedbackId::from(request.feedback_id.as_str());
    let Some(record) = state.repository.get_feedback_invitation(&feedback_id).await? else {
        return Ok(Json(json!({
            "success": true,
            "exists": false,
            "submitted": false,
        })));
    };

    let expired = matches!(record.status, FeedbackStatus::Pending)
        && state
            .expiry_cutoff()
            .is_some_and(|cutoff| record.created_at < cutoff);

    Ok(Json(json!({
        "success": true,
        "exists": true,
        "submitted": matches!(record.status, FeedbackStatus::Submitted),
        "expired": expired,
        "data": {
            "applicant_name": record.applicant_name,
            "round": record.round,
            "interview_date": record.interview_date.format("%Y-%m-%d").to_string(),
            "interview_time": record.interview_time,
            "org_name": record.org_name,
        },
    })))
}

// =============================================================================
// Feedback submit
// =============================================================================

#[derive(Debug, Deserialize)]
struct SubmitFeedbackRequest {
    feedback_id: String,
    candidate_attended: String,
    interview_outcome: Option<String>,
    scores: Option<FeedbackScores>,
    reason: Option<String>,
}

/// Validates the feedback fields against the attendance value and builds
/// the submission that closes the round.
fn build_submission(request: &SubmitFeedbackRequest) -> Result<FeedbackSubmission, ApiError> {
    let attended = Attendance::parse(&request.candidate_attended).ok_or_else(|| {
        ApiError::validation("candidate_attended must be 'yes', 'no' or 'reschedule'")
    })?;

    match attended {
        Attendance::Yes => {
            let outcome = request
                .interview_outcome
                .as_deref()
                .and_then(RoundOutcome::parse)
                .ok_or_else(|| {
                    ApiError::validation(
                        "interview_outcome must be 'selected', 'proceed' or 'rejected' \
                         when the candidate attended",
                    )
                })?;
            let scores = request
                .scores
                .ok_or_else(|| ApiError::validation("scores are required when the candidate attended"))?;
            scores.validate().map_err(ApiError::validation)?;
            Ok(FeedbackSubmission {
                candidate_attended: Attendance::Yes,
                outcome: Some(outcome),
                scores: Some(scores),
                reason: request.reason.clone(),
            })
        }
        // A reschedule closes the round unevaluated.
        Attendance::Reschedule => Ok(FeedbackSubmission {
            candidate_attended: Attendance::Reschedule,
            outcome: None,
            scores: Some(FeedbackScores::zeroed()),
            reason: request.reason.clone(),
        }),
        // A no-show is recorded as a rejection with a reason.
        Attendance::No => Ok(FeedbackSubmission {
            candidate_attended: Attendance::No,
            outcome: Some(RoundOutcome::Rejected),
            scores: None,
            reason: Some(
                request
                    .reason
                    .clone()
                    .unwrap_or_else(|| "Candidate did not attend the interview".to_string()),
            ),
        }),
    }
}

async fn submit_interview_feedback(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitFeedbackRequest>,
) -> Result<Json<Value>, ApiError> {
    let feedback_id = FeedbackId::from(request.feedback_id.as_str());
    let submission = build_submission(&request)?;

    let outcome = state
        .repository
        .submit_feedback(&feedback_id, &submission, state.expiry_cutoff())
        .await?;
    let record = match outcome {
        FeedbackSubmitOutcome::Submitted(record) => record,
        FeedbackSubmitOutcome::NotFound => {
            return Err(ApiError::InvalidToken {
                detail: "Unknown feedback_id".to_string(),
            })
        }
        FeedbackSubmitOutcome::AlreadySubmitted => {
            return Err(ApiError::AlreadySubmitted {
                detail: "Feedback for this interview has already been submitted".to_string(),
            })
        }
        FeedbackSubmitOutcome::Expired => {
            return Err(ApiError::Expired {
                detail: "This feedback form link has expired".to_string(),
            })
        }
    };

    let closure = RoundClosure {
        candidate_attended: submission.candidate_attended,
        outcome: submission.outcome,
        scores: submission.scores,
        reason: submission.reason.clone(),
        feedback_submitted_at: record
            .submitted_at
            .unwrap_or_else(|| Utc::now().timestamp()),
    };

    let key = ApplicantKey::new(record.job_id.clone(), record.applicant_email.clone());
    let result = state
        .store
        .process_event(
            &key,
            ApplicantEvent::FeedbackRecorded {
                feedback_id: feedback_id.clone(),
                round: record.round.clone(),
                closure,
            },
        )
        .await;

    if let Err(err) = result {
        // Release the claim so the form stays usable; the submission did
        // not take effect.
        if let Err(reopen_err) = state.repository.reopen_feedback(&feedback_id).await {
            error!(
                "Could not reopen refused feedback {}..: {}",
                feedback_id.short(),
                reopen_err
            );
        }
        return Err(err.into());
    }

    Ok(Json(json!({
        "success": true,
        "message": "Feedback recorded",
    })))
}
