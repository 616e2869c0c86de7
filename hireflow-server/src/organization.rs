//! The bearer-authenticated API surface: team rosters, job posts,
//! applications, manual status decisions, invitation sending, and the
//! job phase sweep.
//!
//! Every handler takes the verified [`AuthClaims`] from request
//! extensions; the account type gates decide which side of the hiring
//! desk may call what.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::{middleware, Extension, Router};
use chrono::{Local, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use hireflow_core::types::{ApplicantStatus, JobId, JobPhase, JobType, LocationType, Team, WebhookId};

use crate::auth::{require_auth, AuthClaims};
use crate::error::ApiError;
use crate::mailer::EmailJob;
use crate::state_machine::event::ApplicantEvent;
use crate::state_machine::repository::{
    CloseJobOutcome, InvitationRecord, InvitationStatus, JobRecord, StoredApplicant, TeamDirectory,
};
use crate::state_machine::state::ApplicantState;
use crate::state_machine::store::ApplicantKey;
use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/organization-teams",
            post(replace_teams).get(get_teams),
        )
        .route(
            "/api/organization-jobpost",
            post(create_job).get(list_org_jobs),
        )
        .route("/api/organization-jobpost/:job_id/close", put(close_job))
        .route(
            "/api/organization-jobpost/:job_id/applicants",
            get(list_job_applicants),
        )
        .route("/api/organization-jobpost/:job_id/apply", put(apply_to_job))
        .route(
            "/api/organization-jobpost/:job_id/applicants/:email/status",
            put(set_applicant_status),
        )
        .route(
            "/api/organization-jobpost/:job_id/applicants/:email/events",
            get(applicant_events),
        )
        .route("/api/send-interview-form", post(send_interview_form))
        .route("/api/admin/manage-job-status", post(manage_job_status))
        .route("/api/jobs", get(list_open_jobs))
        .layer(middleware::from_fn_with_state(state, require_auth))
}

/// Loads a job and checks it belongs to the calling organization.
async fn owned_job(
    state: &AppState,
    claims: &AuthClaims,
    job_id: &JobId,
) -> Result<JobRecord, ApiError> {
    let job = state
        .repository
        .get_job(job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("No such job"))?;
    if job.org_email != claims.sub {
        return Err(ApiError::Forbidden {
            detail: "This job belongs to another organization".to_string(),
        });
    }
    Ok(job)
}

// =============================================================================
// Teams
// =============================================================================

#[derive(Debug, Deserialize)]
struct ReplaceTeamsRequest {
    teams: Vec<Team>,
}

async fn replace_teams(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
    Json(request): Json<ReplaceTeamsRequest>,
) -> Result<Json<Value>, ApiError> {
    let claims = claims.organization()?;

    for team in &request.teams {
        team.validate().map_err(ApiError::validation)?;
    }
    let mut seen = std::collections::HashSet::new();
    for team in &request.teams {
        if !seen.insert(team.name.as_str()) {
            return Err(ApiError::validation(format!(
                "Duplicate team name '{}'",
                team.name
            )));
        }
    }

    let directory = TeamDirectory {
        org_email: claims.sub.clone(),
        teams: request.teams,
        updated_at: Utc::now().timestamp(),
    };
    state.repository.replace_teams(&directory).await?;
    info!(
        "Replaced team roster for {}: {} teams",
        claims.sub,
        directory.teams.len()
    );

    Ok(Json(json!({
        "success": true,
        "teams": directory.teams.len(),
    })))
}

async fn get_teams(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
) -> Result<Json<Value>, ApiError> {
    let claims = claims.organization()?;
    let teams = state
        .repository
        .get_teams(&claims.sub)
        .await?
        .map(|directory| directory.teams)
        .unwrap_or_default();
    Ok(Json(json!({ "success": true, "teams": teams })))
}

// =============================================================================
// Job posts
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateJobRequest {
    role: String,
    location: String,
    openings: u32,
    package: String,
    job_type: String,
    /// `YYYY-MM-DD`; applications close at the end of this day.
    application_close_date: String,
    jd_file: Option<String>,
}

async fn create_job(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
    Json(request): Json<CreateJobRequest>,
) -> Result<Json<Value>, ApiError> {
    let claims = claims.organization()?;

    if request.role.trim().is_empty() {
        return Err(ApiError::validation("role must not be empty"));
    }
    if request.openings == 0 {
        return Err(ApiError::validation("openings must be at least 1"));
    }
    let job_type = JobType::parse(&request.job_type).ok_or_else(|| {
        ApiError::validation("job_type must be 'full_time', 'internship' or 'unpaid'")
    })?;
    let application_close_date =
        NaiveDate::parse_from_str(&request.application_close_date, "%Y-%m-%d")
            .map_err(|_| ApiError::validation("application_close_date must be YYYY-MM-DD"))?;

    let job = JobRecord {
        job_id: JobId(format!("job_{}", uuid::Uuid::new_v4().simple())),
        org_email: claims.sub.clone(),
        org_name: claims.name.clone(),
        role: request.role,
        location: request.location,
        openings: request.openings,
        package: request.package,
        job_type,
        application_close_date,
        jd_file: request.jd_file,
        phase: JobPhase::Open,
        created_at: Utc::now().timestamp(),
        closed_at: None,
    };
    state.repository.insert_job(&job).await?;
    info!("{} posted job {} ({})", claims.sub, job.job_id, job.role);

    Ok(Json(json!({ "success": true, "job_id": job.job_id.0 })))
}

fn job_payload(job: &JobRecord) -> Value {
    json!({
        "job_id": job.job_id.0,
        "org_name": job.org_name,
        "role": job.role,
        "location": job.location,
        "openings": job.openings,
        "package": job.package,
        "job_type": job.job_type.as_str(),
        "application_close_date": job.application_close_date.format("%Y-%m-%d").to_string(),
        "phase": job.phase.as_str(),
    })
}

async fn list_org_jobs(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
) -> Result<Json<Value>, ApiError> {
    let claims = claims.organization()?;
    let jobs = state.repository.list_jobs(&claims.sub, None).await?;

    let mut payload = Vec::with_capacity(jobs.len());
    for job in &jobs {
        let applicants = state.repository.list_applicants(&job.job_id).await?;
        let mut entry = job_payload(job);
        entry["applicants"] = applicants
            .iter()
            .map(|(email, record)| {
                json!({
                    "email": email,
                    "name": record.name,
                    "status": record.status().as_str(),
                })
            })
            .collect();
        payload.push(entry);
    }

    Ok(Json(json!({ "success": true, "jobs": payload })))
}

async fn close_job(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let claims = claims.organization()?;
    let job_id = JobId::from(job_id.as_str());
    owned_job(&state, claims, &job_id).await?;

    match state
        .repository
        .close_job(&job_id, Utc::now().timestamp())
        .await?
    {
        CloseJobOutcome::Closed(job) => {
            info!("{} closed job {}", claims.sub, job.job_id);
            Ok(Json(json!({ "success": true, "phase": job.phase.as_str() })))
        }
        CloseJobOutcome::NotFound => Err(ApiError::not_found("No such job")),
        CloseJobOutcome::NotOngoing(phase) => Err(ApiError::validation(format!(
            "Only ongoing jobs can be closed; this job is {phase}"
        ))),
    }
}

async fn list_job_applicants(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let claims = claims.organization()?;
    let job_id = JobId::from(job_id.as_str());
    owned_job(&state, claims, &job_id).await?;

    let applicants = state.repository.list_applicants(&job_id).await?;
    let payload: Vec<Value> = applicants
        .iter()
        .map(|(email, record)| applicant_payload(email, record))
        .collect();
    Ok(Json(json!({ "success": true, "applicants": payload })))
}

fn applicant_payload(email: &str, record: &StoredApplicant) -> Value {
    json!({
        "email": email,
        "name": record.name,
        "status": record.status().as_str(),
        "ongoing_rounds": record.ongoing_rounds,
        "previous_rounds": record.previous_rounds,
        "applied_at": record.applied_at,
        "updated_at": record.updated_at,
    })
}

// =============================================================================
// Applications
// =============================================================================

async fn apply_to_job(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let claims = claims.candidate()?;
    let job_id = JobId::from(job_id.as_str());
    let job = state
        .repository
        .get_job(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("No such job"))?;
    if job.phase != JobPhase::Open {
        return Err(ApiError::validation(
            "This job is no longer accepting applications",
        ));
    }

    let key = ApplicantKey::new(job_id, claims.sub.clone());
    let record = StoredApplicant::new_applied(claims.name.clone(), Utc::now().timestamp());
    if !state.repository.create_applicant(&key, &record).await? {
        return Err(ApiError::validation("You have already applied to this job"));
    }
    info!("{} applied to {}", claims.sub, key.job_id);

    Ok(Json(json!({ "success": true })))
}

// =============================================================================
// Manual status decisions
// =============================================================================

#[derive(Debug, Deserialize)]
struct SetStatusRequest {
    status: String,
}

async fn set_applicant_status(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
    Path((job_id, email)): Path<(String, String)>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let claims = claims.organization()?;
    let job_id = JobId::from(job_id.as_str());
    owned_job(&state, claims, &job_id).await?;

    let target = ApplicantStatus::parse(&request.status)
        .ok_or_else(|| ApiError::validation("Unknown status value"))?;

    let key = ApplicantKey::new(job_id, email);
    let record = state
        .store
        .process_event(&key, ApplicantEvent::StatusSet { target })
        .await?;

    Ok(Json(json!({
        "success": true,
        "status": record.status().as_str(),
    })))
}

/// The applicant's audit history, newest first.
async fn applicant_events(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
    Path((job_id, email)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let claims = claims.organization()?;
    let job_id = JobId::from(job_id.as_str());
    owned_job(&state, claims, &job_id).await?;

    let key = ApplicantKey::new(job_id, email);
    if state.repository.get_applicant(&key).await?.is_none() {
        return Err(ApiError::not_found("No such applicant on this job"));
    }
    let events = state.repository.applicant_events(&key).await?;
    let payload: Vec<Value> = events
        .iter()
        .map(|event| {
            json!({
                "event_type": event.event_type,
                "payload": event.payload,
                "recorded_at": event.recorded_at,
            })
        })
        .collect();
    Ok(Json(json!({ "success": true, "events": payload })))
}

// =============================================================================
// Interview invitations
// =============================================================================

#[derive(Debug, Deserialize)]
struct SendInterviewFormRequest {
    applicant_email: String,
    job_id: String,
    round: String,
    team: String,
    location_type: String,
}

async fn send_interview_form(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
    Json(request): Json<SendInterviewFormRequest>,
) -> Result<Json<Value>, ApiError> {
    let claims = claims.organization()?;
    let job_id = JobId::from(request.job_id.as_str());
    let job = owned_job(&state, claims, &job_id).await?;
    if job.phase == JobPhase::Closed {
        return Err(ApiError::validation("This job has been closed"));
    }
    if request.round.trim().is_empty() {
        return Err(ApiError::validation("round must not be empty"));
    }

    let location_type = LocationType::parse(&request.location_type)
        .ok_or_else(|| ApiError::validation("location_type must be 'online' or 'offline'"))?;
    let location = match location_type {
        LocationType::Online => None,
        LocationType::Offline => Some(job.location.clone()),
    };

    let directory = state
        .repository
        .get_teams(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::validation("No teams registered for this organization"))?;
    if directory.team(&request.team).is_none() {
        return Err(ApiError::validation("No such team"));
    }

    let key = ApplicantKey::new(job_id.clone(), request.applicant_email.clone());
    let record = state
        .repository
        .get_applicant(&key)
        .await?
        .ok_or_else(|| ApiError::not_found("No such applicant on this job"))?;
    if !matches!(record.state, ApplicantState::SelectedForInterview) {
        return Err(ApiError::InvalidTransition {
            detail: format!(
                "Cannot send an interview form while the applicant is '{}'",
                record.status()
            ),
        });
    }

    // A fresh invitation supersedes any still-pending link for this
    // round (left over from a reschedule).
    let cancelled = state
        .repository
        .cancel_pending_invitations(
            &job_id,
            &request.applicant_email,
            &request.round,
            "superseded by a new invitation",
        )
        .await?;
    if cancelled > 0 {
        info!(
            "Cancelled {} stale invitation(s) for {} round '{}'",
            cancelled, key, request.round
        );
    }

    let webhook_id = WebhookId(uuid::Uuid::new_v4().to_string());
    state
        .repository
        .insert_invitation(&InvitationRecord {
            webhook_id: webhook_id.clone(),
            org_email: claims.sub.clone(),
            org_name: claims.name.clone(),
            job_id: job_id.clone(),
            team: request.team.clone(),
            round: request.round.clone(),
            applicant_email: request.applicant_email.clone(),
            applicant_name: record.name.clone(),
            location_type,
            location,
            status: InvitationStatus::Pending,
            selection: None,
            created_at: Utc::now().timestamp(),
            submitted_at: None,
            cancelled_at: None,
            cancel_reason: None,
        })
        .await?;

    let invite_email = EmailJob::InterviewInvitation {
        to: request.applicant_email.clone(),
        applicant_name: record.name.clone(),
        org_name: claims.name.clone(),
        round: request.round.clone(),
        form_link: state.interview_form_link(&webhook_id),
    };
    let result = state
        .store
        .process_event(
            &key,
            ApplicantEvent::InvitationCreated {
                webhook_id: webhook_id.clone(),
                round: request.round.clone(),
                team: request.team.clone(),
                invite_email,
            },
        )
        .await;

    if let Err(err) = result {
        // The applicant never moved; withdraw the link we just minted.
        let _ = state
            .repository
            .cancel_pending_invitations(
                &job_id,
                &request.applicant_email,
                &request.round,
                "state change refused",
            )
            .await;
        return Err(err.into());
    }

    Ok(Json(json!({
        "success": true,
        "message": "Interview form sent",
    })))
}

// =============================================================================
// Job phase sweep
// =============================================================================

async fn manage_job_status(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
) -> Result<Json<Value>, ApiError> {
    claims.organization()?;

    let today = Local::now().date_naive();
    let moved = state.repository.sweep_expired_jobs(today).await?;
    let job_ids: Vec<&str> = moved.iter().map(|job| job.job_id.0.as_str()).collect();
    if !moved.is_empty() {
        info!("Sweep moved {} job(s) to ongoing: {:?}", moved.len(), job_ids);
    }

    Ok(Json(json!({
        "success": true,
        "moved": moved.len(),
        "job_ids": job_ids,
    })))
}

// =============================================================================
// Candidate job browsing
// =============================================================================

async fn list_open_jobs(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
) -> Result<Json<Value>, ApiError> {
    claims.candidate()?;
    let jobs = state.repository.list_open_jobs().await?;
    let payload: Vec<Value> = jobs.iter().map(job_payload).collect();
    Ok(Json(json!({ "success": true, "jobs": payload })))
}
