//! SQLite implementation of `Repository`.
//!
//! This provides persistent storage that survives service restarts.
//!
//! # Schema Versioning
//!
//! The database has a `schema_version` table that tracks the schema version.
//! When the schema needs to change, increment `CURRENT_SCHEMA_VERSION` and add
//! a migration in `run_migrations()`. Migrations run sequentially from the
//! current version to the target version.
//!
//! # Forward Compatibility
//!
//! Records are stored as JSON in `record_json` columns, with the fields the
//! queries filter on extracted into indexed columns. When adding new fields
//! to a stored record, use `#[serde(default)]` so old rows still deserialize.
//! The extracted columns are rewritten together with the JSON in every
//! update, so they cannot drift.

mod events;
mod feedback;
mod invitations;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{error, warn};

use hireflow_core::types::{FeedbackId, JobId, JobPhase, SlotId, WebhookId};

use super::super::store::ApplicantKey;
use super::{
    ApplicantEventRow, CloseJobOutcome, CommitOutcome, FeedbackRecord, FeedbackSubmission,
    FeedbackSubmitOutcome, InvitationCounts, InvitationRecord, JobRecord, Repository,
    RepositoryError, SlotSelection, StoredApplicant, TeamDirectory,
};

/// Current schema version. Increment this when making schema changes and add
/// corresponding migration logic in `run_migrations()`.
const CURRENT_SCHEMA_VERSION: i64 = 3;

pub(super) fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Dates are stored as `YYYY-MM-DD` text, so lexicographic comparison in
/// SQL matches chronological order.
pub(super) fn date_to_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// SQLite-backed repository.
///
/// Uses `tokio::task::spawn_blocking` to run synchronous rusqlite
/// operations without blocking the async runtime.
pub struct SqliteRepository {
    /// Database connection. Exposed as `pub(crate)` for test access to
    /// manipulate timestamps when testing expiry behavior.
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// Create a new SQLite repository at the given path.
    ///
    /// Creates the database file and schema if they don't exist.
    /// Runs any pending migrations if the database exists but has an older schema.
    ///
    /// # Durability
    ///
    /// The database is configured with:
    /// - `journal_mode = WAL` for better concurrency and crash safety
    /// - `synchronous = FULL` for maximum durability (survives OS/power failure)
    /// - `busy_timeout = 5000ms` to handle concurrent access gracefully
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path_ref = path.as_ref();

        // Ensure parent directory exists (unless it's :memory: or empty path)
        let path_str = path_ref.to_string_lossy();
        if path_str != ":memory:" && !path_str.is_empty() {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        RepositoryError::storage(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;

                    // Set restrictive permissions on the state directory (Unix
                    // only). This also covers the WAL/SHM files SQLite creates
                    // with default umask permissions.
                    #[cfg(unix)]
                    {
                        use std::os::unix::fs::PermissionsExt;
                        let dir_permissions = std::fs::Permissions::from_mode(0o700);
                        if let Err(e) = std::fs::set_permissions(parent, dir_permissions) {
                            warn!(
                                "Failed to set restrictive permissions on state directory: {}",
                                e
                            );
                        }
                    }
                }
            }
        }

        let conn = Connection::open(path_ref)
            .map_err(|e| RepositoryError::storage("open database", e.to_string()))?;

        // The database holds scheduling and feedback capability tokens, so
        // keep it readable by the service user only (Unix only).
        #[cfg(unix)]
        if path_str != ":memory:" && !path_str.is_empty() {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            if let Err(e) = std::fs::set_permissions(path_ref, permissions) {
                warn!(
                    "Failed to set restrictive permissions on database file: {}",
                    e
                );
            }
        }

        // Configure durability settings.
        // We must verify WAL mode was actually enabled - SQLite can silently keep
        // DELETE mode on some filesystems (e.g., network filesystems that don't
        // support shared memory), which would violate our durability/concurrency
        // assumptions.
        //
        // For in-memory databases (:memory:), SQLite returns "memory" as the
        // journal mode, which is expected - in-memory databases are ephemeral
        // by design.
        let is_in_memory = path_str == ":memory:";
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| RepositoryError::storage("set journal_mode", e.to_string()))?;

        let journal_mode_ok = journal_mode.eq_ignore_ascii_case("wal")
            || (is_in_memory && journal_mode.eq_ignore_ascii_case("memory"));

        if !journal_mode_ok {
            return Err(RepositoryError::storage(
                "configure journal_mode",
                format!(
                    "Failed to enable WAL mode: SQLite returned '{}' instead of 'wal'. \
                     This can happen on filesystems that don't support shared memory \
                     (e.g., some network filesystems). The database requires WAL mode \
                     for durability and concurrency guarantees.",
                    journal_mode
                ),
            ));
        }

        conn.execute_batch(
            r#"
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
            "#,
        )
        .map_err(|e| RepositoryError::storage("configure pragmas", e.to_string()))?;

        #[cfg(unix)]
        if path_str != ":memory:" && !path_str.is_empty() {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);

            let wal_path = format!("{}-wal", path_str);
            if std::path::Path::new(&wal_path).exists() {
                if let Err(e) = std::fs::set_permissions(&wal_path, permissions.clone()) {
                    warn!("Failed to set restrictive permissions on WAL file: {}", e);
                }
            }

            let shm_path = format!("{}-shm", path_str);
            if std::path::Path::new(&shm_path).exists() {
                if let Err(e) = std::fs::set_permissions(&shm_path, permissions) {
                    warn!("Failed to set restrictive permissions on SHM file: {}", e);
                }
            }
        }

        // Create schema version table if it doesn't exist
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| RepositoryError::storage("create schema_version table", e.to_string()))?;

        // Get current version (0 if table is empty = fresh database)
        let current_version: i64 = conn
            .query_row(
                "SELECT version FROM schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| RepositoryError::storage("get schema version", e.to_string()))?
            .unwrap_or(0);

        Self::run_migrations(&conn, current_version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run migrations from `from_version` to `CURRENT_SCHEMA_VERSION`.
    fn run_migrations(conn: &Connection, from_version: i64) -> Result<(), RepositoryError> {
        if from_version > CURRENT_SCHEMA_VERSION {
            return Err(RepositoryError::storage(
                "schema version",
                format!(
                    "Database schema version {} is newer than supported version {}. \
                     Please upgrade the application.",
                    from_version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }

        if from_version == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }

        // Migration from version 0 (fresh database) to version 1: the core
        // tables. Every record is stored as JSON with the columns queries
        // filter on extracted alongside it.
        if from_version < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS team_directories (
                    org_email TEXT PRIMARY KEY,
                    record_json TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS jobs (
                    job_id TEXT PRIMARY KEY,
                    org_email TEXT NOT NULL,
                    phase TEXT NOT NULL,
                    application_close_date TEXT NOT NULL,
                    record_json TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_jobs_org
                    ON jobs(org_email, created_at DESC);
                CREATE INDEX IF NOT EXISTS idx_jobs_phase
                    ON jobs(phase);

                CREATE TABLE IF NOT EXISTS applicants (
                    job_id TEXT NOT NULL,
                    candidate_email TEXT NOT NULL,
                    record_json TEXT NOT NULL,
                    applied_at INTEGER NOT NULL,
                    PRIMARY KEY (job_id, candidate_email)
                );
                CREATE INDEX IF NOT EXISTS idx_applicants_job
                    ON applicants(job_id, applied_at);

                CREATE TABLE IF NOT EXISTS invitations (
                    webhook_id TEXT PRIMARY KEY,
                    org_email TEXT NOT NULL,
                    team_name TEXT NOT NULL,
                    job_id TEXT NOT NULL,
                    applicant_email TEXT NOT NULL,
                    round TEXT NOT NULL,
                    status TEXT NOT NULL,
                    record_json TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_invitations_pending
                    ON invitations(job_id, applicant_email, round)
                    WHERE status = 'pending';

                CREATE TABLE IF NOT EXISTS feedback_invitations (
                    feedback_id TEXT PRIMARY KEY,
                    status TEXT NOT NULL,
                    record_json TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );
                "#,
            )
            .map_err(|e| RepositoryError::storage("migration v1", e.to_string()))?;
        }

        // Migration from version 1 to version 2: per-applicant audit trail.
        // Every processed event leaves a row here, newest first on reads.
        if from_version < 2 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS applicant_events (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    job_id TEXT NOT NULL,
                    candidate_email TEXT NOT NULL,
                    event_type TEXT NOT NULL,
                    event_data TEXT NOT NULL,
                    recorded_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_applicant_events_lookup
                    ON applicant_events(job_id, candidate_email, recorded_at DESC);
                "#,
            )
            .map_err(|e| RepositoryError::storage("migration v2", e.to_string()))?;
        }

        // Migration from version 2 to version 3: slot claims. The primary
        // key (org, team, date, slot) is what makes booking commits atomic:
        // INSERT OR IGNORE either claims the slot or is a detectable no-op.
        if from_version < 3 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS slot_bookings (
                    org_email TEXT NOT NULL,
                    team_name TEXT NOT NULL,
                    slot_date TEXT NOT NULL,
                    slot_id TEXT NOT NULL,
                    webhook_id TEXT NOT NULL,
                    booked_at INTEGER NOT NULL,
                    PRIMARY KEY (org_email, team_name, slot_date, slot_id)
                );
                CREATE INDEX IF NOT EXISTS idx_slot_bookings_team
                    ON slot_bookings(org_email, team_name);
                "#,
            )
            .map_err(|e| RepositoryError::storage("migration v3", e.to_string()))?;
        }

        // Update schema version
        conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
            params![CURRENT_SCHEMA_VERSION],
        )
        .map_err(|e| RepositoryError::storage("update schema version", e.to_string()))?;

        Ok(())
    }

    /// Create a new in-memory SQLite repository (for testing).
    pub fn new_in_memory() -> Result<Self, RepositoryError> {
        Self::new(":memory:")
    }
}

// =============================================================================
// Row parsing helpers
// =============================================================================

/// Runs a query whose first column is a job's `record_json` and parses
/// each row, skipping corrupt ones so one bad row cannot take down a
/// whole listing.
fn query_jobs_sync(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<JobRecord>, String> {
    let mut stmt = conn.prepare(sql).map_err(|e| e.to_string())?;
    let rows = stmt
        .query_map(params, |row| row.get::<_, String>(0))
        .map_err(|e| e.to_string())?;

    let mut jobs = Vec::new();
    for row in rows {
        let json = match row {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to read job row from SQLite: {}", e);
                continue;
            }
        };
        match serde_json::from_str::<JobRecord>(&json) {
            Ok(job) => jobs.push(job),
            Err(e) => {
                warn!(
                    "Skipping corrupt job row: {}. \
                     This row may need manual investigation or will be overwritten \
                     on next update.",
                    e
                );
            }
        }
    }
    Ok(jobs)
}

// =============================================================================
// Repository trait implementation
// =============================================================================

#[async_trait]
impl Repository for SqliteRepository {
    // --- Teams ---

    async fn get_teams(&self, org_email: &str) -> Result<Option<TeamDirectory>, RepositoryError> {
        let conn = self.conn.clone();
        let org_email = org_email.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            let result: Option<String> = conn
                .query_row(
                    "SELECT record_json FROM team_directories WHERE org_email = ?1",
                    params![org_email],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| RepositoryError::storage("get_teams", e.to_string()))?;

            match result {
                Some(json) => {
                    let directory: TeamDirectory = serde_json::from_str(&json)
                        .map_err(|_| RepositoryError::corruption("team directory JSON"))?;
                    Ok(Some(directory))
                }
                None => Ok(None),
            }
        })
        .await
        .map_err(|e| RepositoryError::storage("get_teams", e.to_string()))?
    }

    async fn replace_teams(&self, directory: &TeamDirectory) -> Result<(), RepositoryError> {
        let conn = self.conn.clone();
        let org_email = directory.org_email.clone();
        let updated_at = directory.updated_at;
        let record_json = serde_json::to_string(directory)
            .map_err(|e| RepositoryError::storage("serialize team directory", e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            conn.execute(
                "INSERT INTO team_directories (org_email, record_json, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(org_email) DO UPDATE SET
                     record_json = excluded.record_json,
                     updated_at = excluded.updated_at",
                params![org_email, record_json, updated_at],
            )
            .map_err(|e| RepositoryError::storage("replace_teams", e.to_string()))?;

            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::storage("replace_teams", e.to_string()))?
    }

    // --- Jobs ---

    async fn insert_job(&self, job: &JobRecord) -> Result<(), RepositoryError> {
        let conn = self.conn.clone();
        let job_id = job.job_id.0.clone();
        let org_email = job.org_email.clone();
        let phase = job.phase.as_str().to_string();
        let close_date = date_to_text(job.application_close_date);
        let created_at = job.created_at;
        let record_json = serde_json::to_string(job)
            .map_err(|e| RepositoryError::storage("serialize job", e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            conn.execute(
                "INSERT INTO jobs (job_id, org_email, phase, application_close_date,
                                   record_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(job_id) DO UPDATE SET
                     org_email = excluded.org_email,
                     phase = excluded.phase,
                     application_close_date = excluded.application_close_date,
                     record_json = excluded.record_json,
                     created_at = excluded.created_at",
                params![job_id, org_email, phase, close_date, record_json, created_at],
            )
            .map_err(|e| RepositoryError::storage("insert_job", e.to_string()))?;

            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::storage("insert_job", e.to_string()))?
    }

    async fn get_job(&self, job_id: &JobId) -> Result<Option<JobRecord>, RepositoryError> {
        let conn = self.conn.clone();
        let job_id = job_id.0.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            let result: Option<String> = conn
                .query_row(
                    "SELECT record_json FROM jobs WHERE job_id = ?1",
                    params![job_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| RepositoryError::storage("get_job", e.to_string()))?;

            match result {
                Some(json) => {
                    let job: JobRecord = serde_json::from_str(&json)
                        .map_err(|_| RepositoryError::corruption("job JSON"))?;
                    Ok(Some(job))
                }
                None => Ok(None),
            }
        })
        .await
        .map_err(|e| RepositoryError::storage("get_job", e.to_string()))?
    }

    async fn list_jobs(
        &self,
        org_email: &str,
        phase: Option<JobPhase>,
    ) -> Result<Vec<JobRecord>, RepositoryError> {
        let conn = self.conn.clone();
        let org_email = org_email.to_string();
        let phase = phase.map(|p| p.as_str().to_string());

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            let jobs = match &phase {
                Some(phase) => query_jobs_sync(
                    &conn,
                    "SELECT record_json FROM jobs
                     WHERE org_email = ?1 AND phase = ?2
                     ORDER BY created_at DESC",
                    &[&org_email, phase],
                ),
                None => query_jobs_sync(
                    &conn,
                    "SELECT record_json FROM jobs
                     WHERE org_email = ?1
                     ORDER BY created_at DESC",
                    &[&org_email],
                ),
            };
            jobs.map_err(|e| RepositoryError::storage("list_jobs", e))
        })
        .await
        .map_err(|e| RepositoryError::storage("list_jobs", e.to_string()))?
    }

    async fn list_open_jobs(&self) -> Result<Vec<JobRecord>, RepositoryError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            query_jobs_sync(
                &conn,
                "SELECT record_json FROM jobs
                 WHERE phase = 'open'
                 ORDER BY created_at DESC",
                &[],
            )
            .map_err(|e| RepositoryError::storage("list_open_jobs", e))
        })
        .await
        .map_err(|e| RepositoryError::storage("list_open_jobs", e.to_string()))?
    }

    async fn all_jobs(&self) -> Result<Vec<JobRecord>, RepositoryError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            query_jobs_sync(
                &conn,
                "SELECT record_json FROM jobs ORDER BY created_at DESC",
                &[],
            )
            .map_err(|e| RepositoryError::storage("all_jobs", e))
        })
        .await
        .map_err(|e| RepositoryError::storage("all_jobs", e.to_string()))?
    }

    async fn close_job(
        &self,
        job_id: &JobId,
        closed_at: i64,
    ) -> Result<CloseJobOutcome, RepositoryError> {
        let conn = self.conn.clone();
        let job_id = job_id.0.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap();
            let tx = conn
                .transaction()
                .map_err(|e| RepositoryError::storage("close_job", e.to_string()))?;

            let result: Option<String> = tx
                .query_row(
                    "SELECT record_json FROM jobs WHERE job_id = ?1",
                    params![job_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| RepositoryError::storage("close_job", e.to_string()))?;

            let Some(json) = result else {
                return Ok(CloseJobOutcome::NotFound);
            };
            let mut job: JobRecord = serde_json::from_str(&json)
                .map_err(|_| RepositoryError::corruption("job JSON"))?;

            if job.phase != JobPhase::Ongoing {
                return Ok(CloseJobOutcome::NotOngoing(job.phase));
            }

            job.phase = JobPhase::Closed;
            job.closed_at = Some(closed_at);
            let updated_json = serde_json::to_string(&job)
                .map_err(|e| RepositoryError::storage("serialize job", e.to_string()))?;

            tx.execute(
                "UPDATE jobs SET phase = 'closed', record_json = ?1 WHERE job_id = ?2",
                params![updated_json, job_id],
            )
            .map_err(|e| RepositoryError::storage("close_job", e.to_string()))?;

            tx.commit()
                .map_err(|e| RepositoryError::storage("close_job", e.to_string()))?;
            Ok(CloseJobOutcome::Closed(job))
        })
        .await
        .map_err(|e| RepositoryError::storage("close_job", e.to_string()))?
    }

    async fn sweep_expired_jobs(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<JobRecord>, RepositoryError> {
        let conn = self.conn.clone();
        let today_text = date_to_text(today);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap();
            let tx = conn
                .transaction()
                .map_err(|e| RepositoryError::storage("sweep_expired_jobs", e.to_string()))?;

            let expired: Vec<String> = {
                let mut stmt = tx
                    .prepare(
                        "SELECT record_json FROM jobs
                         WHERE phase = 'open' AND application_close_date < ?1",
                    )
                    .map_err(|e| RepositoryError::storage("sweep_expired_jobs", e.to_string()))?;
                let rows = stmt
                    .query_map(params![today_text], |row| row.get::<_, String>(0))
                    .map_err(|e| RepositoryError::storage("sweep_expired_jobs", e.to_string()))?;
                rows.filter_map(|row| row.ok()).collect()
            };

            let mut swept = Vec::new();
            for json in expired {
                let mut job: JobRecord = match serde_json::from_str(&json) {
                    Ok(job) => job,
                    Err(e) => {
                        warn!("Skipping corrupt job row during sweep: {}", e);
                        continue;
                    }
                };
                job.phase = JobPhase::Ongoing;
                let updated_json = serde_json::to_string(&job).map_err(|e| {
                    RepositoryError::storage("serialize job", e.to_string())
                })?;
                tx.execute(
                    "UPDATE jobs SET phase = 'ongoing', record_json = ?1 WHERE job_id = ?2",
                    params![updated_json, job.job_id.0],
                )
                .map_err(|e| RepositoryError::storage("sweep_expired_jobs", e.to_string()))?;
                swept.push(job);
            }

            tx.commit()
                .map_err(|e| RepositoryError::storage("sweep_expired_jobs", e.to_string()))?;
            Ok(swept)
        })
        .await
        .map_err(|e| RepositoryError::storage("sweep_expired_jobs", e.to_string()))?
    }

    // --- Applicants ---

    async fn create_applicant(
        &self,
        key: &ApplicantKey,
        record: &StoredApplicant,
    ) -> Result<bool, RepositoryError> {
        let conn = self.conn.clone();
        let job_id = key.job_id.0.clone();
        let candidate_email = key.candidate_email.clone();
        let applied_at = record.applied_at;
        let record_json = serde_json::to_string(record)
            .map_err(|e| RepositoryError::storage("serialize applicant", e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            // INSERT OR IGNORE makes re-applying a detectable no-op: the
            // existing record wins and changes() reports 0.
            conn.execute(
                "INSERT OR IGNORE INTO applicants (job_id, candidate_email, record_json, applied_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![job_id, candidate_email, record_json, applied_at],
            )
            .map_err(|e| RepositoryError::storage("create_applicant", e.to_string()))?;

            Ok(conn.changes() > 0)
        })
        .await
        .map_err(|e| RepositoryError::storage("create_applicant", e.to_string()))?
    }

    async fn get_applicant(
        &self,
        key: &ApplicantKey,
    ) -> Result<Option<StoredApplicant>, RepositoryError> {
        let conn = self.conn.clone();
        let job_id = key.job_id.0.clone();
        let candidate_email = key.candidate_email.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            let result: Option<String> = conn
                .query_row(
                    "SELECT record_json FROM applicants
                     WHERE job_id = ?1 AND candidate_email = ?2",
                    params![job_id, candidate_email],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| RepositoryError::storage("get_applicant", e.to_string()))?;

            match result {
                Some(json) => {
                    let record: StoredApplicant = serde_json::from_str(&json)
                        .map_err(|_| RepositoryError::corruption("applicant JSON"))?;
                    Ok(Some(record))
                }
                None => Ok(None),
            }
        })
        .await
        .map_err(|e| RepositoryError::storage("get_applicant", e.to_string()))?
    }

    async fn put_applicant(
        &self,
        key: &ApplicantKey,
        record: &StoredApplicant,
    ) -> Result<(), RepositoryError> {
        let conn = self.conn.clone();
        let job_id = key.job_id.0.clone();
        let candidate_email = key.candidate_email.clone();
        let applied_at = record.applied_at;
        let record_json = serde_json::to_string(record)
            .map_err(|e| RepositoryError::storage("serialize applicant", e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            conn.execute(
                "INSERT INTO applicants (job_id, candidate_email, record_json, applied_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(job_id, candidate_email) DO UPDATE SET
                     record_json = excluded.record_json,
                     applied_at = excluded.applied_at",
                params![job_id, candidate_email, record_json, applied_at],
            )
            .map_err(|e| RepositoryError::storage("put_applicant", e.to_string()))?;

            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::storage("put_applicant", e.to_string()))?
    }

    async fn list_applicants(
        &self,
        job_id: &JobId,
    ) -> Result<Vec<(String, StoredApplicant)>, RepositoryError> {
        let conn = self.conn.clone();
        let job_id = job_id.0.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            let mut stmt = conn
                .prepare(
                    "SELECT candidate_email, record_json FROM applicants
                     WHERE job_id = ?1 ORDER BY applied_at",
                )
                .map_err(|e| RepositoryError::storage("list_applicants", e.to_string()))?;

            let rows = stmt
                .query_map(params![job_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(|e| RepositoryError::storage("list_applicants", e.to_string()))?;

            let mut results = Vec::new();
            for row in rows {
                let (email, json) = match row {
                    Ok(data) => data,
                    Err(e) => {
                        error!("Failed to read applicant row from SQLite: {}", e);
                        continue;
                    }
                };
                // Skip rows that fail to deserialize so one corrupt record
                // cannot hide a whole job's applicant list.
                match serde_json::from_str::<StoredApplicant>(&json) {
                    Ok(record) => results.push((email, record)),
                    Err(e) => {
                        warn!(
                            "Skipping corrupt applicant record for {}: {}. \
                             This row may need manual investigation.",
                            email, e
                        );
                    }
                }
            }
            Ok(results)
        })
        .await
        .map_err(|e| RepositoryError::storage("list_applicants", e.to_string()))?
    }

    async fn all_applicants(
        &self,
    ) -> Result<Vec<(ApplicantKey, StoredApplicant)>, RepositoryError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            let mut stmt = conn
                .prepare("SELECT job_id, candidate_email, record_json FROM applicants")
                .map_err(|e| RepositoryError::storage("all_applicants", e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(|e| RepositoryError::storage("all_applicants", e.to_string()))?;

            let mut results = Vec::new();
            for row in rows {
                let (job_id, email, json) = match row {
                    Ok(data) => data,
                    Err(e) => {
                        error!("Failed to read applicant row from SQLite: {}", e);
                        continue;
                    }
                };
                match serde_json::from_str::<StoredApplicant>(&json) {
                    Ok(record) => {
                        results.push((ApplicantKey::new(job_id, email), record));
                    }
                    Err(e) => {
                        warn!("Skipping corrupt applicant record for {}: {}", email, e);
                    }
                }
            }
            Ok(results)
        })
        .await
        .map_err(|e| RepositoryError::storage("all_applicants", e.to_string()))?
    }

    // =========================================================================
    // Audit trail - delegated to events module
    // =========================================================================

    async fn log_applicant_event(
        &self,
        key: &ApplicantKey,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        self.log_applicant_event_impl(key, event_type, payload).await
    }

    async fn applicant_events(
        &self,
        key: &ApplicantKey,
    ) -> Result<Vec<ApplicantEventRow>, RepositoryError> {
        self.applicant_events_impl(key).await
    }

    // =========================================================================
    // Scheduling invitations - delegated to invitations module
    // =========================================================================

    async fn insert_invitation(
        &self,
        invitation: &InvitationRecord,
    ) -> Result<(), RepositoryError> {
        self.insert_invitation_impl(invitation).await
    }

    async fn get_invitation(
        &self,
        webhook_id: &WebhookId,
    ) -> Result<Option<InvitationRecord>, RepositoryError> {
        self.get_invitation_impl(webhook_id).await
    }

    async fn find_pending_invitation(
        &self,
        job_id: &JobId,
        applicant_email: &str,
        round: &str,
    ) -> Result<Option<InvitationRecord>, RepositoryError> {
        self.find_pending_invitation_impl(job_id, applicant_email, round)
            .await
    }

    async fn cancel_pending_invitations(
        &self,
        job_id: &JobId,
        applicant_email: &str,
        round: &str,
        reason: &str,
    ) -> Result<usize, RepositoryError> {
        self.cancel_pending_invitations_impl(job_id, applicant_email, round, reason)
            .await
    }

    async fn booked_slot_ids(
        &self,
        org_email: &str,
        team: &str,
    ) -> Result<Vec<SlotId>, RepositoryError> {
        self.booked_slot_ids_impl(org_email, team).await
    }

    async fn invitation_counts(&self) -> Result<InvitationCounts, RepositoryError> {
        self.invitation_counts_impl().await
    }

    async fn commit_invitation(
        &self,
        webhook_id: &WebhookId,
        selection: &SlotSelection,
        expiry_cutoff: Option<i64>,
    ) -> Result<CommitOutcome, RepositoryError> {
        self.commit_invitation_impl(webhook_id, selection, expiry_cutoff)
            .await
    }

    // =========================================================================
    // Feedback invitations - delegated to feedback module
    // =========================================================================

    async fn insert_feedback_invitation(
        &self,
        feedback: &FeedbackRecord,
    ) -> Result<(), RepositoryError> {
        self.insert_feedback_invitation_impl(feedback).await
    }

    async fn get_feedback_invitation(
        &self,
        feedback_id: &FeedbackId,
    ) -> Result<Option<FeedbackRecord>, RepositoryError> {
        self.get_feedback_invitation_impl(feedback_id).await
    }

    async fn submit_feedback(
        &self,
        feedback_id: &FeedbackId,
        submission: &FeedbackSubmission,
        expiry_cutoff: Option<i64>,
    ) -> Result<FeedbackSubmitOutcome, RepositoryError> {
        self.submit_feedback_impl(feedback_id, submission, expiry_cutoff)
            .await
    }

    async fn reopen_feedback(&self, feedback_id: &FeedbackId) -> Result<(), RepositoryError> {
        self.reopen_feedback_impl(feedback_id).await
    }
}
