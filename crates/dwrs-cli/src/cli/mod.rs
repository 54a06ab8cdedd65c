//! CLI for the dwrs downloader.

mod render;

use anyhow::{Context, Result};
use clap::Parser;
use dwrs_core::config::{self, DwrsConfig};
use dwrs_core::input::{self, TaskRequest};
use dwrs_core::orchestrator::{Orchestrator, RunReport};
use std::path::PathBuf;

use render::Renderer;

/// Download files over HTTP(S) in parallel, resuming partial downloads.
#[derive(Debug, Parser)]
#[command(name = "dwrs", version)]
#[command(about = "dwrs: parallel resumable file downloader", long_about = None)]
pub struct Cli {
    /// URLs to download.
    #[arg(value_name = "URL", required_unless_present = "file", conflicts_with = "file")]
    pub urls: Vec<String>,

    /// Output file name, once per URL in the same order.
    #[arg(short, long = "output", value_name = "NAME")]
    pub outputs: Vec<String>,

    /// Read URLs from a file: one `<url> [output]` per line, `#` for comments.
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Number of files downloaded at once (overrides `workers` in the config).
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Continue partially downloaded files instead of starting over.
    #[arg(short = 'c', long = "continue")]
    pub resume: bool,

    /// Directory for downloaded files (default: current directory).
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Attempts per file, including the first (overrides `[retry] max_attempts`).
    #[arg(short, long, value_name = "N")]
    pub retries: Option<u32>,

    /// Config file to use instead of ~/.config/dwrs/config.toml.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Do not draw progress bars.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Process exit status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every file Completed or Skipped.
    Success,
    /// At least one file Failed.
    Failures,
    /// Bad arguments, list file, config, or destination collision.
    InputError,
}

impl RunStatus {
    pub fn code(self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Failures => 1,
            RunStatus::InputError => 2,
        }
    }

    fn from_report(report: &RunReport) -> Self {
        if report.has_failures() {
            RunStatus::Failures
        } else {
            RunStatus::Success
        }
    }
}

impl Cli {
    /// Applies command-line overrides on top of the loaded config.
    fn apply_overrides(&self, cfg: &mut DwrsConfig) {
        if let Some(workers) = self.workers {
            cfg.workers = workers;
        }
        if let Some(retries) = self.retries {
            cfg.retry.max_attempts = retries;
        }
    }

    fn requests(&self) -> Result<Vec<TaskRequest>> {
        let requests = match &self.file {
            Some(path) => input::read_list_file(path)?,
            None => input::requests_from_args(&self.urls, &self.outputs)?,
        };
        Ok(requests)
    }
}

pub async fn run_from_args() -> Result<RunStatus> {
    let cli = Cli::parse();
    run(cli).await
}

pub async fn run(cli: Cli) -> Result<RunStatus> {
    let mut cfg = match &cli.config {
        Some(path) => config::load_from(path)?,
        None => config::load_or_init()?,
    };
    cli.apply_overrides(&mut cfg);
    tracing::debug!("loaded config: {:?}", cfg);

    let requests = cli.requests()?;
    let output_dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    let orch = Orchestrator::from_config(&cfg, output_dir);

    let control = orch.control();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ninterrupted, stopping downloads...");
            control.cancel();
        }
    });

    let renderer = if cli.quiet || cli.json {
        None
    } else {
        Some(Renderer::spawn(&cfg, &requests, orch.progress()))
    };

    let report = orch
        .execute(requests, cfg.workers, cli.resume)
        .await;
    if let Some(renderer) = renderer {
        renderer.finish().await;
    }
    let report = report?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(RunStatus::from_report(&report))
}

fn print_summary(report: &RunReport) {
    for entry in report.failures() {
        let reason = entry
            .state
            .error
            .as_ref()
            .map_or_else(|| "unknown error".to_string(), |e| e.to_string());
        eprintln!("failed: {} ({})", entry.task.source(), reason);
    }
    eprintln!(
        "{} completed, {} skipped, {} failed",
        report.completed(),
        report.skipped(),
        report.failed()
    );
}
