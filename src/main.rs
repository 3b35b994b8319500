//! rustalex - OpenAlex Institution Collaboration Pipeline
//!
//! A Rust microservice for retrieving the home institution's publications
//! from OpenAlex, aggregating collaborating countries and topics, and
//! writing CSV/Markdown report artifacts.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! rustalex works --start 2019 --end 2023
//! rustalex topics --partner-ror https://ror.org/02feahw73 --start 2019 --end 2023
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! rustalex serve --port 3000
//! ```

use anyhow::{Context, Result};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use rustalex::{
    cancel::CancelFlag,
    openalex::CatalogClient,
    pipeline::{self, RunOutcome, YearRange},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Earliest year the drivers accept (catalog coverage sanity bound)
const MIN_YEAR: i32 = 1981;

/// Latest year the drivers accept
const MAX_YEAR: i32 = 2025;

// ============================================================================
// CLI Definition
// ============================================================================

/// OpenAlex Institution Collaboration Pipeline - Rust Microservice
#[derive(Parser)]
#[command(name = "rustalex")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output directory for report artifacts
    #[arg(short, long, global = true, default_value = "./output")]
    output: PathBuf,

    /// Contact email for the OpenAlex polite pool
    #[arg(long, global = true)]
    mailto: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Year range shared by every pipeline action
#[derive(Args)]
struct YearArgs {
    /// First publication year
    #[arg(long, default_value_t = 2019)]
    start: i32,

    /// Last publication year (defaults to the start year)
    #[arg(long)]
    end: Option<i32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the institution's publications and export them as CSV
    Works {
        #[command(flatten)]
        years: YearArgs,
    },

    /// List collaborating countries ranked by publication count
    Collaborators {
        #[command(flatten)]
        years: YearArgs,
    },

    /// Generate the top-10 collaborating-countries report document
    Report {
        #[command(flatten)]
        years: YearArgs,
    },

    /// Rank the topics of publications co-authored with a partner institution
    Topics {
        /// Partner institution ROR URL
        #[arg(long, default_value = "https://ror.org/02feahw73")]
        partner_ror: String,

        #[command(flatten)]
        years: YearArgs,
    },

    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

/// One of the four pipeline actions, resolved from either driver
enum Action {
    Works,
    Collaborators,
    Report,
    Topics { partner_ror: String },
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::Works => "works",
            Action::Collaborators => "collaborators",
            Action::Report => "report",
            Action::Topics { .. } => "topics",
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let client = build_client(cli.mailto.as_deref())?;

    match cli.command {
        Commands::Works { years } => {
            run_cli_action(&client, Action::Works, &years, &cli.output).await
        }
        Commands::Collaborators { years } => {
            run_cli_action(&client, Action::Collaborators, &years, &cli.output).await
        }
        Commands::Report { years } => {
            run_cli_action(&client, Action::Report, &years, &cli.output).await
        }
        Commands::Topics { partner_ror, years } => {
            let partner_ror = partner_ror.trim().to_string();
            if partner_ror.is_empty() {
                anyhow::bail!("A partner ROR identifier is required");
            }
            run_cli_action(&client, Action::Topics { partner_ror }, &years, &cli.output).await
        }
        Commands::Serve { port, host } => run_server(client, host, port, cli.output).await,
    }
}

fn build_client(mailto: Option<&str>) -> Result<CatalogClient> {
    let client = CatalogClient::new().context("Failed to build catalog client")?;
    Ok(match mailto {
        Some(email) => client.with_mailto(email),
        None => client,
    })
}

/// Validate driver-level year bounds and build the range
fn validated_range(years: &YearArgs) -> Result<YearRange> {
    let start = years.start;
    let end = years.end.unwrap_or(start);

    for (label, year) in [("start", start), ("end", end)] {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            anyhow::bail!(
                "The {} year must be between {} and {}",
                label,
                MIN_YEAR,
                MAX_YEAR
            );
        }
    }

    Ok(YearRange::new(start, end)?)
}

// ============================================================================
// CLI Pipeline Runs
// ============================================================================

async fn run_cli_action(
    client: &CatalogClient,
    action: Action,
    years: &YearArgs,
    output_dir: &Path,
) -> Result<()> {
    let range = validated_range(years)?;

    // Timestamped folder per run
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let run_dir = output_dir.join(format!("{}_{}", timestamp, action.name()));
    std::fs::create_dir_all(&run_dir).context("Failed to create output directory")?;

    println!("Output folder: {}", run_dir.display());

    // Ctrl-C requests cooperative cancellation; the current page finishes
    let cancel = CancelFlag::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, cancelling after the current page");
            watcher.cancel();
        }
    });

    match run_action(client, &action, range, &cancel, &run_dir).await {
        Ok(outcome) => {
            println!(
                "Done: {} records, {} artifact(s)",
                outcome.records,
                outcome.artifacts.len()
            );
            for path in &outcome.artifacts {
                println!("  {}", path.display());
            }
            Ok(())
        }
        Err(e) if e.is_interruption() => {
            println!("Run cancelled by user, no artifacts written.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Dispatch one action to its pipeline operation
async fn run_action(
    client: &CatalogClient,
    action: &Action,
    range: YearRange,
    cancel: &CancelFlag,
    run_dir: &Path,
) -> rustalex::Result<RunOutcome> {
    match action {
        Action::Works => pipeline::fetch_works(client, range, cancel, run_dir).await,
        Action::Collaborators => pipeline::list_collaborators(client, range, cancel, run_dir).await,
        Action::Report => pipeline::country_report(client, range, cancel, run_dir).await,
        Action::Topics { partner_ror } => {
            pipeline::collaboration_topics(client, partner_ror, range, cancel, run_dir).await
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(client: CatalogClient, host: String, port: u16, output_dir: PathBuf) -> Result<()> {
    info!(host = %host, port = port, "Starting HTTP server");

    let app_state = Arc::new(AppState {
        client,
        output_dir,
        busy: AtomicBool::new(false),
        cancel: CancelFlag::new(),
    });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/run", post(run_handler))
        .route("/cancel", post(cancel_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

struct AppState {
    client: CatalogClient,
    output_dir: PathBuf,
    /// Gates runs: at most one pipeline run may be in flight
    busy: AtomicBool,
    cancel: CancelFlag,
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Run request body
#[derive(Debug, Deserialize)]
struct RunRequest {
    /// One of: works, collaborators, report, topics
    action: String,
    start_year: i32,
    end_year: Option<i32>,
    partner_ror: Option<String>,
}

/// Run response
#[derive(Debug, Serialize)]
struct RunResponse {
    status: String,
    records: usize,
    artifacts: Vec<String>,
}

impl RunResponse {
    fn failed(status: String) -> Self {
        Self { status, records: 0, artifacts: Vec::new() }
    }
}

/// Run endpoint handler: executes one pipeline action.
///
/// Rejected with a "busy" status while another run is in flight.
async fn run_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RunRequest>,
) -> Json<RunResponse> {
    info!(action = %req.action, start = req.start_year, end = ?req.end_year, "Run request");

    if state
        .busy
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Json(RunResponse::failed("busy: a run is already in flight".to_string()));
    }

    // Fresh cancellation state for this run
    state.cancel.reset();

    let response = execute_run(&state, req).await;

    state.busy.store(false, Ordering::SeqCst);
    Json(response)
}

async fn execute_run(state: &AppState, req: RunRequest) -> RunResponse {
    let action = match resolve_action(&req) {
        Ok(action) => action,
        Err(message) => return RunResponse::failed(format!("error: {}", message)),
    };

    let years = YearArgs { start: req.start_year, end: req.end_year };
    let range = match validated_range(&years) {
        Ok(range) => range,
        Err(e) => return RunResponse::failed(format!("error: {}", e)),
    };

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let run_dir = state.output_dir.join(format!("{}_{}", timestamp, action.name()));
    if let Err(e) = std::fs::create_dir_all(&run_dir) {
        return RunResponse::failed(format!("error: failed to create output directory: {}", e));
    }

    match run_action(&state.client, &action, range, &state.cancel, &run_dir).await {
        Ok(outcome) => RunResponse {
            status: "success".to_string(),
            records: outcome.records,
            artifacts: outcome
                .artifacts
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        },
        Err(e) if e.is_interruption() => RunResponse::failed("cancelled".to_string()),
        Err(e) => {
            error!(error = %e, "Run failed");
            RunResponse::failed(format!("error: {}", e))
        }
    }
}

fn resolve_action(req: &RunRequest) -> std::result::Result<Action, String> {
    match req.action.as_str() {
        "works" => Ok(Action::Works),
        "collaborators" => Ok(Action::Collaborators),
        "report" => Ok(Action::Report),
        "topics" => {
            let partner = req
                .partner_ror
                .as_deref()
                .map(str::trim)
                .unwrap_or_default();
            if partner.is_empty() {
                return Err("a partner_ror is required for the topics action".to_string());
            }
            Ok(Action::Topics { partner_ror: partner.to_string() })
        }
        other => Err(format!("unknown action '{}'", other)),
    }
}

/// Cancel endpoint handler: requests cooperative cancellation of the
/// in-flight run, if any.
async fn cancel_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    if state.busy.load(Ordering::SeqCst) {
        state.cancel.cancel();
        info!("Cancellation requested");
        Json(serde_json::json!({ "status": "cancelling" }))
    } else {
        Json(serde_json::json!({ "status": "idle" }))
    }
}
