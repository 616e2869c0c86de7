use anyhow::Result;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};

use hireflow_server::calendar::HttpCalendarProvider;
use hireflow_server::config::Config;
use hireflow_server::mailer::{Mailer, NoopMailer, SmtpMailer};
use hireflow_server::state_machine::repository::SqliteRepository;
use hireflow_server::status::{health_handler, help_handler, status_handler};
use hireflow_server::{organization, scheduling, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting hireflow server");

    let config =
        Config::from_env().expect("Failed to load configuration from environment variables");

    let db_path = config.state_dir.join("hireflow-state.db");
    info!("Using state database: {}", db_path.display());
    let repository =
        SqliteRepository::new(&db_path).expect("Failed to initialize SQLite database");

    let mailer: Arc<dyn Mailer> = match config.smtp.clone() {
        Some(smtp) => {
            info!("SMTP delivery enabled via {}", smtp.server);
            Arc::new(SmtpMailer::new(smtp))
        }
        None => {
            info!("SMTP not configured; email delivery disabled");
            Arc::new(NoopMailer)
        }
    };

    let calendar = Arc::new(HttpCalendarProvider::new(config.calendar_timeout_secs));
    let port = config.port;

    let app_state = Arc::new(AppState::new(
        config,
        Arc::new(repository),
        mailer,
        calendar,
    ));

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/help", get(help_handler))
        .route("/status", get(status_handler))
        .merge(scheduling::router())
        .merge(organization::router(app_state.clone()))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state);

    let listener = TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    info!("Server listening on port {port}");

    axum::serve(listener, app).await?;

    Ok(())
}
