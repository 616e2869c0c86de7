use anyhow::{Context, Result};
use chrono::NaiveTime;
use std::env;
use std::path::PathBuf;

use hireflow_core::slots::SlotConfig;

use crate::mailer::SmtpConfig;

#[derive(Clone)]
pub struct Config {
    /// HS256 secret the auth collaborator signs bearer tokens with.
    pub jwt_secret: String,
    pub port: u16,
    /// Directory for persistent state (SQLite database).
    /// Defaults to current working directory.
    pub state_dir: PathBuf,
    /// Base URL the service is reachable under; scheduling and feedback
    /// form links are built on top of it.
    pub app_base_url: String,
    /// Base URL for derived meeting links of online rounds.
    pub meeting_link_base: String,
    /// Slot tiling parameters for the availability engine.
    pub slots: SlotConfig,
    /// Seconds a pending invitation stays valid. None means no expiry,
    /// matching the historical behavior.
    pub invitation_ttl_secs: Option<i64>,
    /// Per-member calendar fetch timeout in seconds.
    pub calendar_timeout_secs: u64,
    /// SMTP settings; None disables delivery (jobs are logged and dropped).
    pub smtp: Option<SmtpConfig>,
    /// Optional bearer token for /status endpoint authentication.
    /// If set, requests to /status must include `Authorization: Bearer <token>`.
    /// If not set, /status endpoint is disabled (returns 403 Forbidden).
    pub status_auth_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret =
            env::var("JWT_SECRET").context("JWT_SECRET environment variable is required")?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let state_dir = env::var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let app_base_url = env::var("APP_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));
        let meeting_link_base =
            env::var("MEETING_LINK_BASE").unwrap_or_else(|_| "https://meet.jit.si".to_string());

        let slot_minutes = env::var("SLOT_MINUTES")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u32>()
            .context("SLOT_MINUTES must be a valid number")?;
        if slot_minutes == 0 {
            anyhow::bail!("SLOT_MINUTES must be greater than zero");
        }

        let workday_start = parse_workday_time(
            &env::var("WORKDAY_START").unwrap_or_else(|_| "09:00".to_string()),
        )
        .context("WORKDAY_START must be HH:MM")?;
        let workday_end = parse_workday_time(
            &env::var("WORKDAY_END").unwrap_or_else(|_| "17:00".to_string()),
        )
        .context("WORKDAY_END must be HH:MM")?;
        if workday_end <= workday_start {
            anyhow::bail!("WORKDAY_END must be after WORKDAY_START");
        }

        let lookahead_days = env::var("LOOKAHEAD_DAYS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("LOOKAHEAD_DAYS must be a valid number")?;

        let invitation_ttl_secs = match env::var("INVITATION_TTL_SECS") {
            Ok(value) if !value.trim().is_empty() => Some(
                value
                    .parse::<i64>()
                    .context("INVITATION_TTL_SECS must be a valid number of seconds")?,
            ),
            _ => None,
        };

        let calendar_timeout_secs = env::var("CALENDAR_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u64>()
            .context("CALENDAR_TIMEOUT_SECS must be a valid number")?;

        let smtp = smtp_from_env();

        let status_auth_token = env::var("STATUS_AUTH_TOKEN")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Ok(Config {
            jwt_secret,
            port,
            state_dir,
            app_base_url,
            meeting_link_base,
            slots: SlotConfig {
                slot_minutes,
                workday_start,
                workday_end,
                lookahead_days,
            },
            invitation_ttl_secs,
            calendar_timeout_secs,
            smtp,
            status_auth_token,
        })
    }
}

/// Parses an "HH:MM" workday boundary.
pub fn parse_workday_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// SMTP is configured only when every variable is present; a partial set
/// is treated as unconfigured so a missing password cannot silently send
/// unauthenticated mail.
fn smtp_from_env() -> Option<SmtpConfig> {
    let server = env::var("SMTP_SERVER").ok()?;
    let username = env::var("SMTP_USERNAME").ok()?;
    let password = env::var("SMTP_PASSWORD").ok()?;
    let from_address = env::var("SMTP_FROM").ok()?;
    Some(SmtpConfig {
        server,
        username,
        password,
        from_address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workday_time_valid() {
        assert_eq!(
            parse_workday_time("09:00"),
            NaiveTime::from_hms_opt(9, 0, 0)
        );
        assert_eq!(
            parse_workday_time(" 17:30 "),
            NaiveTime::from_hms_opt(17, 30, 0)
        );
    }

    #[test]
    fn test_parse_workday_time_invalid() {
        assert_eq!(parse_workday_time("9am"), None);
        assert_eq!(parse_workday_time("25:00"), None);
        assert_eq!(parse_workday_time(""), None);
    }
}
