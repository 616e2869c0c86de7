//! Outbound email.
//!
//! Emails are data first ([`EmailJob`]) and a delivery mechanism second:
//! the state machine emits jobs as effects, and a [`Mailer`] gets them
//! off the request path. Delivery is strictly fire-and-forget; a failed
//! send is logged and never fails the operation that produced it.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use hireflow_core::types::LocationType;

/// One email to be delivered, with everything the template needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmailJob {
    /// Interview form link for the candidate.
    InterviewInvitation {
        to: String,
        applicant_name: String,
        org_name: String,
        round: String,
        form_link: String,
    },

    /// Confirmation for the candidate after a slot was committed.
    InterviewScheduled {
        to: String,
        applicant_name: String,
        org_name: String,
        round: String,
        interview_date: String,
        interview_time: String,
        meeting_link: String,
        location_type: LocationType,
        location: Option<String>,
    },

    /// Notice to the assigned interviewer, carrying the feedback form link.
    InterviewerAssigned {
        to: String,
        interviewer_name: String,
        applicant_name: String,
        round: String,
        interview_date: String,
        interview_time: String,
        meeting_link: String,
        feedback_link: String,
    },

    /// Warning to the organization that a team has no bookable slots.
    NoSlotsAvailable {
        to: String,
        org_name: String,
        team: String,
        lookahead_days: u32,
    },
}

impl EmailJob {
    pub fn recipient(&self) -> &str {
        match self {
            Self::InterviewInvitation { to, .. }
            | Self::InterviewScheduled { to, .. }
            | Self::InterviewerAssigned { to, .. }
            | Self::NoSlotsAvailable { to, .. } => to,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Self::InterviewInvitation { round, .. } => {
                format!("Interview Scheduling - {}", round)
            }
            Self::InterviewScheduled { round, .. } => {
                format!("Interview Scheduled - {}", round)
            }
            Self::InterviewerAssigned { round, .. } => {
                format!("Interviewer Assignment - {}", round)
            }
            Self::NoSlotsAvailable { .. } => "No Interview Slots Available".to_string(),
        }
    }

    pub fn body(&self) -> String {
        match self {
            Self::InterviewInvitation {
                applicant_name,
                org_name,
                round,
                form_link,
                ..
            } => format!(
                "Dear {},\n\n\
                 Congratulations! You have been selected for the {} at {}.\n\
                 Please use the link below to schedule your interview:\n\n\
                 {}\n\n\
                 Best regards,\n{}",
                applicant_name, round, org_name, form_link, org_name
            ),
            Self::InterviewScheduled {
                applicant_name,
                org_name,
                round,
                interview_date,
                interview_time,
                meeting_link,
                location_type,
                location,
                ..
            } => {
                let venue = match location_type {
                    LocationType::Online => format!("Join online: {}", meeting_link),
                    LocationType::Offline => format!(
                        "Venue: {}\nBackup meeting link: {}",
                        location.as_deref().unwrap_or("to be confirmed"),
                        meeting_link
                    ),
                };
                format!(
                    "Dear {},\n\n\
                     Your {} with {} has been scheduled.\n\n\
                     Date: {}\nTime: {}\n{}\n\n\
                     Best regards,\n{}",
                    applicant_name,
                    round,
                    org_name,
                    interview_date,
                    interview_time,
                    venue,
                    org_name
                )
            }
            Self::InterviewerAssigned {
                interviewer_name,
                applicant_name,
                round,
                interview_date,
                interview_time,
                meeting_link,
                feedback_link,
                ..
            } => format!(
                "Dear {},\n\n\
                 You have been assigned to conduct the {} with {}.\n\n\
                 Date: {}\nTime: {}\nMeeting link: {}\n\n\
                 Please submit your feedback after the interview:\n{}\n",
                interviewer_name,
                round,
                applicant_name,
                interview_date,
                interview_time,
                meeting_link,
                feedback_link
            ),
            Self::NoSlotsAvailable {
                org_name,
                team,
                lookahead_days,
                ..
            } => format!(
                "Dear {},\n\n\
                 All members of team '{}' are busy for the next {} working days.\n\
                 No interview slots could be offered; please free up calendars or \
                 extend the team.\n",
                org_name, team, lookahead_days
            ),
        }
    }
}

/// Delivery boundary for email jobs.
pub trait Mailer: Send + Sync {
    /// Queues a job for delivery. Must not block the caller; delivery
    /// failures are logged, never surfaced.
    fn send(&self, job: EmailJob);
}

/// SMTP connection settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

/// SMTP-backed mailer. Each send runs on a detached task so SMTP latency
/// and outages never reach the request path.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, job: EmailJob) {
        let config = self.config.clone();
        tokio::spawn(async move {
            let subject = job.subject();
            let recipient = job.recipient().to_string();
            match tokio::task::spawn_blocking(move || deliver(&config, &job)).await {
                Ok(Ok(())) => info!("Email '{}' sent to {}", subject, recipient),
                Ok(Err(e)) => {
                    error!("Failed to send email '{}' to {}: {}", subject, recipient, e)
                }
                Err(e) => error!("Email delivery task panicked: {}", e),
            }
        });
    }
}

fn deliver(config: &SmtpConfig, job: &EmailJob) -> Result<(), String> {
    let message = Message::builder()
        .from(
            config
                .from_address
                .parse()
                .map_err(|e| format!("invalid from address: {}", e))?,
        )
        .to(job
            .recipient()
            .parse()
            .map_err(|e| format!("invalid recipient: {}", e))?)
        .subject(job.subject())
        .header(ContentType::TEXT_PLAIN)
        .body(job.body())
        .map_err(|e| format!("failed to build message: {}", e))?;

    let credentials = Credentials::new(config.username.clone(), config.password.clone());
    let transport = SmtpTransport::relay(&config.server)
        .map_err(|e| format!("failed to create SMTP transport: {}", e))?
        .credentials(credentials)
        .build();

    transport
        .send(&message)
        .map(|_| ())
        .map_err(|e| format!("SMTP send failed: {}", e))
}

/// Mailer for tests and deployments without SMTP credentials: logs and
/// drops every job.
pub struct NoopMailer;

impl Mailer for NoopMailer {
    fn send(&self, job: EmailJob) {
        debug!(
            "Email suppressed (no SMTP configured): '{}' to {}",
            job.subject(),
            job.recipient()
        );
    }
}

/// Test mailer that records every job it is handed.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: std::sync::Mutex<Vec<EmailJob>>,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn sent_jobs(&self) -> Vec<EmailJob> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Mailer for RecordingMailer {
    fn send(&self, job: EmailJob) {
        self.sent.lock().unwrap().push(job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitation_body_contains_link_and_round() {
        let job = EmailJob::InterviewInvitation {
            to: "jane@example.com".to_string(),
            applicant_name: "Jane".to_string(),
            org_name: "Acme".to_string(),
            round: "Technical Round 1".to_string(),
            form_link: "https://app.example.com/interview-form?webhook_id=wh-1".to_string(),
        };
        let body = job.body();
        assert!(body.contains("Technical Round 1"));
        assert!(body.contains("webhook_id=wh-1"));
        assert_eq!(job.recipient(), "jane@example.com");
    }

    #[test]
    fn test_offline_confirmation_lists_venue() {
        let job = EmailJob::InterviewScheduled {
            to: "jane@example.com".to_string(),
            applicant_name: "Jane".to_string(),
            org_name: "Acme".to_string(),
            round: "Onsite".to_string(),
            interview_date: "2025-06-10".to_string(),
            interview_time: "09:00 - 09:30".to_string(),
            meeting_link: "https://meet.example.com/xyz".to_string(),
            location_type: LocationType::Offline,
            location: Some("12 Main Street".to_string()),
        };
        let body = job.body();
        assert!(body.contains("12 Main Street"));
    }

    #[test]
    fn test_no_slots_subject() {
        let job = EmailJob::NoSlotsAvailable {
            to: "org@example.com".to_string(),
            org_name: "Acme".to_string(),
            team: "Backend".to_string(),
            lookahead_days: 5,
        };
        assert_eq!(job.subject(), "No Interview Slots Available");
        assert!(job.body().contains("Backend"));
    }
}
