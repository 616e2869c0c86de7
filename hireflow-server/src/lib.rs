pub mod auth;
pub mod availability;
pub mod calendar;
pub mod config;
pub mod error;
pub mod mailer;
pub mod organization;
pub mod scheduling;
pub mod state_machine;
pub mod status;

use std::sync::Arc;

use chrono::Utc;

use hireflow_core::calendar::CalendarProvider;
use hireflow_core::types::{FeedbackId, WebhookId};

use crate::config::Config;
use crate::mailer::Mailer;
use crate::state_machine::repository::Repository;
use crate::state_machine::store::ApplicantStore;

/// Shared state for all request handlers.
pub struct AppState {
    pub config: Config,
    pub repository: Arc<dyn Repository>,
    /// The single write path for applicant records.
    pub store: ApplicantStore,
    pub mailer: Arc<dyn Mailer>,
    pub calendar: Arc<dyn CalendarProvider>,
}

impl AppState {
    pub fn new(
        config: Config,
        repository: Arc<dyn Repository>,
        mailer: Arc<dyn Mailer>,
        calendar: Arc<dyn CalendarProvider>,
    ) -> Self {
        let store = ApplicantStore::new(repository.clone(), mailer.clone());
        Self {
            config,
            repository,
            store,
            mailer,
            calendar,
        }
    }

    /// Oldest creation timestamp a capability token may carry and still
    /// be honored. None when no TTL is configured.
    pub fn expiry_cutoff(&self) -> Option<i64> {
        self.config
            .invitation_ttl_secs
            .map(|ttl| Utc::now().timestamp() - ttl)
    }

    /// Scheduling form link sent to candidates.
    pub fn interview_form_link(&self, webhook_id: &WebhookId) -> String {
        format!(
            "{}/interview-form?webhook_id={}",
            self.config.app_base_url, webhook_id
        )
    }

    /// Feedback form link sent to interviewers.
    pub fn feedback_form_link(&self, feedback_id: &FeedbackId) -> String {
        format!(
            "{}/feedback-form?feedback_id={}",
            self.config.app_base_url, feedback_id
        )
    }

    /// Derives a fresh meeting link: the configured base plus a short
    /// random path slug.
    pub fn new_meeting_link(&self) -> String {
        let slug = uuid::Uuid::new_v4().simple().to_string();
        format!("{}/{}", self.config.meeting_link_base, &slug[..12])
    }
}
