//! Operational status endpoint.
//!
//! `/status` summarizes the stored state: jobs per phase, applicants
//! per status, invitation totals, and a per-job breakdown. The endpoint
//! is disabled unless `STATUS_AUTH_TOKEN` is configured, and then only
//! answers requests carrying that token.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use serde::Serialize;

use crate::error::ApiError;
use crate::state_machine::repository::{InvitationCounts, Repository, RepositoryError};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct JobStatusEntry {
    pub job_id: String,
    pub role: String,
    pub phase: String,
    pub applicant_count: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusData {
    /// Job counts keyed by phase name.
    pub jobs_by_phase: BTreeMap<String, usize>,
    /// Applicant counts keyed by status name, across all jobs.
    pub applicants_by_status: BTreeMap<String, usize>,
    pub invitations: InvitationCounts,
    pub jobs: Vec<JobStatusEntry>,
}

impl StatusData {
    pub async fn gather(repository: &dyn Repository) -> Result<Self, RepositoryError> {
        let jobs = repository.all_jobs().await?;
        let applicants = repository.all_applicants().await?;
        let invitations = repository.invitation_counts().await?;

        let mut jobs_by_phase: BTreeMap<String, usize> = BTreeMap::new();
        let mut applicants_by_status: BTreeMap<String, usize> = BTreeMap::new();
        let mut per_job: BTreeMap<&str, usize> = BTreeMap::new();

        for job in &jobs {
            *jobs_by_phase.entry(job.phase.as_str().to_string()).or_default() += 1;
        }
        for (key, record) in &applicants {
            *applicants_by_status
                .entry(record.status().as_str().to_string())
                .or_default() += 1;
            *per_job.entry(key.job_id.0.as_str()).or_default() += 1;
        }

        let jobs = jobs
            .iter()
            .map(|job| JobStatusEntry {
                job_id: job.job_id.0.clone(),
                role: job.role.clone(),
                phase: job.phase.as_str().to_string(),
                applicant_count: per_job.get(job.job_id.0.as_str()).copied().unwrap_or(0),
            })
            .collect();

        Ok(Self {
            jobs_by_phase,
            applicants_by_status,
            invitations,
            jobs,
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

pub async fn status_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatusData>, ApiError> {
    let Some(expected) = state.config.status_auth_token.as_deref() else {
        return Err(ApiError::Forbidden {
            detail: "Status endpoint is disabled".to_string(),
        });
    };
    match bearer_token(&headers) {
        Some(token) if token == expected => {}
        _ => {
            return Err(ApiError::Unauthorized {
                detail: "Invalid or missing status token".to_string(),
            })
        }
    }

    let data = StatusData::gather(state.repository.as_ref()).await?;
    Ok(Json(data))
}

/// `/health`: liveness only, no storage access.
pub async fn health_handler() -> StatusCode {
    StatusCode::OK
}

/// `/help`: a plain-text index of the API surface.
pub async fn help_handler() -> &'static str {
    "hireflow-server\n\
     \n\
     Public (capability links):\n\
     \x20 POST /api/get-free-slots\n\
     \x20 POST /api/check-webhook-status\n\
     \x20 POST /api/submit-interview-form\n\
     \x20 POST /api/check-feedback-status\n\
     \x20 POST /api/submit-interview-feedback\n\
     \n\
     Authenticated (bearer token):\n\
     \x20 POST/GET /api/organization-teams\n\
     \x20 POST/GET /api/organization-jobpost\n\
     \x20 PUT  /api/organization-jobpost/{job_id}/close\n\
     \x20 GET  /api/organization-jobpost/{job_id}/applicants\n\
     \x20 PUT  /api/organization-jobpost/{job_id}/apply\n\
     \x20 PUT  /api/organization-jobpost/{job_id}/applicants/{email}/status\n\
     \x20 GET  /api/organization-jobpost/{job_id}/applicants/{email}/events\n\
     \x20 POST /api/send-interview-form\n\
     \x20 POST /api/admin/manage-job-status\n\
     \x20 GET  /api/jobs\n\
     \n\
     Operational:\n\
     \x20 GET /health\n\
     \x20 GET /status (requires STATUS_AUTH_TOKEN)\n"
}
