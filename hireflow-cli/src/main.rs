use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

/// Hireflow: operational command-line client for the hiring server
#[derive(Parser, Debug)]
#[command(name = "hireflow")]
#[command(about = "Operational CLI for the hireflow server", long_about = None)]
struct Cli {
    /// Base URL of the hireflow server
    #[arg(long, env = "HIREFLOW_SERVER_URL", default_value = "http://localhost:3000")]
    server_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the server is up
    Health,
    /// Print the operational status dashboard
    Status(StatusArgs),
    /// Move open jobs whose application window has passed to ongoing
    Sweep(SweepArgs),
}

#[derive(Parser, Debug)]
struct StatusArgs {
    /// Status endpoint token (STATUS_AUTH_TOKEN on the server)
    #[arg(long, env = "STATUS_AUTH_TOKEN")]
    auth_token: String,
}

#[derive(Parser, Debug)]
struct SweepArgs {
    /// Organization bearer token to authenticate the sweep with
    #[arg(long, env = "HIREFLOW_AUTH_TOKEN")]
    auth_token: String,
}

async fn get(url: &str, auth_token: Option<&str>) -> Result<reqwest::Response> {
    let client = reqwest::Client::new();
    let mut request = client.get(url);
    if let Some(token) = auth_token {
        request = request.bearer_auth(token);
    }
    request
        .send()
        .await
        .with_context(|| format!("Failed to reach {url}"))
}

/// Reads a response body and pretty-prints it as JSON, falling back to
/// raw text for non-JSON bodies.
async fn print_body(response: reqwest::Response) -> Result<()> {
    let body = response.text().await.context("Failed to read response body")?;
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}

async fn run_health(server_url: &str) -> Result<()> {
    let response = get(&format!("{server_url}/health"), None).await?;
    if !response.status().is_success() {
        return Err(anyhow!("Server is unhealthy: {}", response.status()));
    }
    println!("ok");
    Ok(())
}

async fn run_status(server_url: &str, args: &StatusArgs) -> Result<()> {
    let response = get(&format!("{server_url}/status"), Some(&args.auth_token)).await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("Status request failed ({status}): {body}"));
    }
    print_body(response).await
}

async fn run_sweep(server_url: &str, args: &SweepArgs) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{server_url}/api/admin/manage-job-status");
    let response = client
        .post(&url)
        .bearer_auth(&args.auth_token)
        .send()
        .await
        .with_context(|| format!("Failed to reach {url}"))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("Sweep failed ({status}): {body}"));
    }
    print_body(response).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let server_url = cli.server_url.trim_end_matches('/');

    match &cli.command {
        Commands::Health => run_health(server_url).await,
        Commands::Status(args) => run_status(server_url, args).await,
        Commands::Sweep(args) => run_sweep(server_url, args).await,
    }
}
