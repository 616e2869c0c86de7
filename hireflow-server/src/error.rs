//! HTTP error taxonomy.
//!
//! Every handler funnels failures through [`ApiError`], which maps the
//! domain outcomes onto status codes and a JSON `detail` body. The one
//! mapping clients depend on: 409 means a conflict (the slot went to
//! someone else, or the transition table refused the state change), so
//! a booking form can tell "pick another slot" apart from "fix your
//! input".

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::error;

use crate::state_machine::store::StoreError;
use crate::state_machine::repository::RepositoryError;
use crate::state_machine::transition::TransitionError;

#[derive(Debug)]
pub enum ApiError {
    /// Capability token (webhook or feedback) is unknown.
    InvalidToken { detail: String },
    /// Single-use token already consumed.
    AlreadySubmitted { detail: String },
    /// Invitation superseded by a newer one for the same round.
    Cancelled { detail: String },
    /// Invitation outlived its TTL.
    Expired { detail: String },
    /// The chosen slot was claimed by another invitation first.
    SlotConflict { detail: String },
    /// The requested state change is not in the transition table.
    InvalidTransition { detail: String },
    /// Terminal applicant statuses accept no further changes.
    TerminalState { detail: String },
    /// Request shape or field values are wrong.
    Validation { detail: String },
    NotFound { detail: String },
    Unauthorized { detail: String },
    Forbidden { detail: String },
    /// Storage or other internal failure; detail is logged, not leaked.
    Internal { detail: String },
}

impl ApiError {
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation {
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound {
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidToken { .. } | Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::AlreadySubmitted { .. } | Self::Cancelled { .. } | Self::Validation { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Expired { .. } => StatusCode::GONE,
            Self::SlotConflict { .. }
            | Self::InvalidTransition { .. }
            | Self::TerminalState { .. } => StatusCode::CONFLICT,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> &str {
        match self {
            Self::InvalidToken { detail }
            | Self::AlreadySubmitted { detail }
            | Self::Cancelled { detail }
            | Self::Expired { detail }
            | Self::SlotConflict { detail }
            | Self::InvalidTransition { detail }
            | Self::TerminalState { detail }
            | Self::Validation { detail }
            | Self::NotFound { detail }
            | Self::Unauthorized { detail }
            | Self::Forbidden { detail }
            | Self::Internal { detail } => detail,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = if matches!(self, Self::Internal { .. }) {
            error!("Internal error serving request: {}", self.detail());
            "Internal server error".to_string()
        } else {
            self.detail().to_string()
        };
        (status, Json(json!({ "success": false, "detail": detail }))).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        Self::Internal {
            detail: err.to_string(),
        }
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::InvalidTransition { .. } => Self::InvalidTransition {
                detail: err.to_string(),
            },
            TransitionError::TerminalState { .. } => Self::TerminalState {
                detail: err.to_string(),
            },
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound {
                detail: err.to_string(),
            },
            StoreError::Transition(inner) => inner.into(),
            StoreError::Repository(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hireflow_core::types::ApplicantStatus;

    #[test]
    fn test_slot_conflict_is_the_only_409_in_the_booking_path() {
        let conflict = ApiError::SlotConflict {
            detail: "slot taken".to_string(),
        };
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let submitted = ApiError::AlreadySubmitted {
            detail: "done".to_string(),
        };
        assert_eq!(submitted.status_code(), StatusCode::BAD_REQUEST);

        let unknown = ApiError::InvalidToken {
            detail: "no such token".to_string(),
        };
        assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_transition_errors_map_to_conflict() {
        let invalid: ApiError = TransitionError::invalid(ApplicantStatus::Applied, "jump").into();
        assert_eq!(invalid.status_code(), StatusCode::CONFLICT);

        let terminal: ApiError = TransitionError::TerminalState {
            status: ApplicantStatus::Rejected,
        }
        .into();
        assert_eq!(terminal.status_code(), StatusCode::CONFLICT);
    }
}
