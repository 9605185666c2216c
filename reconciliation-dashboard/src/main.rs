//! Reconciliation Dashboard command line entry point.

use anyhow::Context;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use dashboard_core::observability::{init_tracing, shutdown_tracing, LoggingOptions};
use dashboard_core::retry::{Delay, TokioDelay};
use reconciliation_dashboard::aggregate::AggregateView;
use reconciliation_dashboard::config::DashboardConfig;
use reconciliation_dashboard::gateway::{ExportFormat, Gateway, HttpGateway, UploadOptions};
use reconciliation_dashboard::models::ReconcileParams;
use reconciliation_dashboard::services::{get_metrics, init_metrics};
use reconciliation_dashboard::session::{SessionController, SessionEvent};
use reconciliation_dashboard::state::{ActionKey, DashboardState, MessageKind};
use reconciliation_dashboard::{DashboardActions, UploadStatusPoller};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "recon-dashboard")]
#[command(about = "Drive invoice and bank statement reconciliation against the gateway")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON). Defaults to ./dashboard.*
    #[arg(long, global = true, env = "DASHBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Override gateway.base_url
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Dump Prometheus metrics to stdout before exiting
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway and downstream service health
    Health,

    /// Show reconciliation statistics
    Stats,

    /// Show which datasets the gateway currently holds
    Status,

    /// Import invoices for a date range
    FetchInvoices {
        /// First day, YYYY-MM-DD. Defaults to 30 days ago
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day, YYYY-MM-DD. Defaults to today
        #[arg(long)]
        to: Option<NaiveDate>,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Upload a bank statement (.csv, .xlsx, .xls, .pdf)
    Upload {
        file: PathBuf,

        /// Mark the upload as the batch to reconcile against
        #[arg(long)]
        upload_batch_only: bool,

        /// Drop previously uploaded statements first
        #[arg(long)]
        clear_previous: bool,
    },

    /// Run a reconciliation and wait for its results
    Reconcile {
        #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,

        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
        days_back: u32,

        #[arg(long)]
        latest_only: bool,

        /// Reconcile only the most recent upload batch; clears old results first
        #[arg(long)]
        upload_batch_only: bool,
    },

    /// Show the current reconciliation results
    Results,

    /// Delete stored reconciliation results
    Clear,

    /// Download results as CSV or JSON
    Export {
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportArg,

        #[arg(long, short = 'o')]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportArg {
    Csv,
    Json,
}

impl From<ExportArg> for ExportFormat {
    fn from(arg: ExportArg) -> Self {
        match arg {
            ExportArg::Csv => ExportFormat::Csv,
            ExportArg::Json => ExportFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(&LoggingOptions {
        service_name: &config.service_name,
        log_level: &config.log_level,
        json: config.log_json,
        otlp_endpoint: config.otlp_endpoint.as_deref(),
    }) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    init_metrics();

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.gateway.base_url,
        "Configuration loaded"
    );

    let code = match run(&cli, &config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    };

    if cli.print_metrics {
        print!("{}", get_metrics());
    }

    shutdown_tracing();
    code
}

fn load_config(cli: &Cli) -> anyhow::Result<DashboardConfig> {
    let mut config = DashboardConfig::load(cli.config.as_deref())?;
    if let Some(base_url) = &cli.base_url {
        config.gateway.base_url = base_url.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: &Cli, config: &DashboardConfig) -> anyhow::Result<ExitCode> {
    let gateway: Arc<dyn Gateway> = Arc::new(
        HttpGateway::new(config.gateway.clone()).context("Failed to build HTTP client")?,
    );
    let delay: Arc<dyn Delay> = Arc::new(TokioDelay);
    let poller = UploadStatusPoller::new(gateway.clone(), delay.clone(), config.poller.clone());
    let actions = DashboardActions::new(gateway.clone(), poller.clone(), &config.session);
    let mut state = DashboardState::new();

    let key = match &cli.command {
        Commands::Health => {
            actions.check_health(&mut state).await;
            if let Some(report) = state.health() {
                println!("status: {}", report.status);
                for (name, service) in &report.services {
                    let mark = if service.success { "ok" } else { "FAIL" };
                    println!("  {:<24} {:<4} {}", name, mark, service.message);
                }
            }
            ActionKey::Health
        }
        Commands::Stats => {
            actions.load_stats(&mut state).await;
            match state.stats() {
                Some(stats) => {
                    println!("total reconciliations: {}", stats.total_reconciliations);
                    println!("matched:               {}", stats.matched);
                    println!("pending:               {}", stats.pending);
                    println!("average confidence:    {:.1}%", stats.avg_confidence * 100.0);
                }
                None => println!("No statistics available yet."),
            }
            ActionKey::Stats
        }
        Commands::Status => {
            let status = poller.check_status(&mut state, 0).await;
            println!(
                "invoices:        {} ({})",
                yes_no(status.has_invoices),
                status.invoice_count
            );
            println!(
                "bank statements: {} ({})",
                yes_no(status.has_bank_statements),
                status.bank_count
            );
            ActionKey::UploadStatus
        }
        Commands::FetchInvoices { from, to, limit } => {
            let today = Utc::now().date_naive();
            let to = to.unwrap_or(today);
            let from = from.unwrap_or(to - ChronoDuration::days(30));
            actions.fetch_invoices(&mut state, from, to, *limit).await;
            ActionKey::Fetch
        }
        Commands::Upload {
            file,
            upload_batch_only,
            clear_previous,
        } => {
            let options = UploadOptions {
                upload_batch_only: *upload_batch_only,
                clear_previous: *clear_previous,
            };
            actions.upload_bank_statement(&mut state, file, options).await;
            ActionKey::Upload
        }
        Commands::Reconcile {
            limit,
            days_back,
            latest_only,
            upload_batch_only,
        } => {
            let params = ReconcileParams {
                limit: *limit,
                days_back: *days_back,
                latest_only: *latest_only,
                upload_batch_only: *upload_batch_only,
            };
            run_reconciliation(gateway, poller, delay, config, &mut state, params).await;
            if !state.records().is_empty() {
                render_results(&state.aggregate());
            }
            ActionKey::Reconcile
        }
        Commands::Results => {
            actions.refresh_results(&mut state).await;
            render_results(&state.aggregate());
            ActionKey::Results
        }
        Commands::Clear => {
            actions.clear_results(&mut state).await;
            ActionKey::Clear
        }
        Commands::Export { format, output } => {
            actions.export(&mut state, (*format).into(), output).await;
            ActionKey::Export
        }
    };

    let mut failed = false;
    for (message_key, message) in state.messages() {
        if message_key != key && message_key != ActionKey::UploadStatus {
            continue;
        }
        let prefix = match message.kind {
            MessageKind::Success => "ok",
            MessageKind::Error => "error",
            MessageKind::Info => "info",
        };
        eprintln!("[{}] {}", prefix, message.text);
        failed |= message_key == key && message.is_error();
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn run_reconciliation(
    gateway: Arc<dyn Gateway>,
    poller: UploadStatusPoller,
    delay: Arc<dyn Delay>,
    config: &DashboardConfig,
    state: &mut DashboardState,
    params: ReconcileParams,
) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                SessionEvent::Progress(progress) => {
                    eprintln!("  [{:>3}%] {}", progress.percent, progress.stage)
                }
                SessionEvent::PhaseChanged(phase) => tracing::debug!(%phase, "Phase"),
                SessionEvent::ResultsCleared { previous } => {
                    eprintln!("  cleared {} previous results", previous)
                }
                SessionEvent::FocusResults => {}
            }
        }
    });

    let controller =
        SessionController::new(gateway, poller, delay, config.session.clone()).with_events(tx);
    if let Ok(summary) = controller.run_reconciliation(state, params).await {
        tracing::info!(
            session_id = %summary.session_id,
            reconciliation_count = summary.reconciliation_count,
            "Session finished"
        );
    }
    drop(controller);

    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "Progress printer stopped unexpectedly");
    }
}

fn render_results(view: &AggregateView) {
    let summary = &view.summary;
    if summary.total == 0 {
        println!("No reconciliation results.");
        return;
    }

    println!("total matches:      {}", summary.total);
    println!("perfect (>=95%):    {}", summary.perfect);
    println!("good (80-94%):      {}", summary.good);
    println!("needs review (<80%): {}", summary.needs_review);
    if let Some(avg) = summary.average_confidence {
        println!("average confidence: {:.1}%", avg * 100.0);
    }

    println!();
    println!("confidence distribution:");
    for band in &view.confidence_bands {
        println!("  {:<8} {}", band.label, band.count);
    }

    println!();
    println!("match types:");
    for entry in &view.match_types {
        println!("  {:<16} {}", entry.match_type, entry.count);
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
