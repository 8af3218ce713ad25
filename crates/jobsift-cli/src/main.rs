use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use jobsift_adapters::{build_search_url, JobTypeFilter, SearchQuery, WorkSettingFilter};
use jobsift_storage::PgJobRepository;
use jobsift_sync::{report_markdown, run_sync_once_from_env, SyncConfig};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "jobsift")]
#[command(about = "Job listing reconciliation and normalization pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run every enabled search in searches.yaml once.
    Sync,
    /// Summarize the most recent runs.
    Report {
        #[arg(long, default_value_t = 5)]
        runs: usize,
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
    /// Print the results URL for a search.
    SearchUrl {
        job_title: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        radius: Option<u32>,
        #[arg(long)]
        days_ago: Option<u32>,
        #[arg(long, value_enum)]
        work_setting: Option<WorkSettingArg>,
        #[arg(long, value_enum)]
        job_type: Option<JobTypeArg>,
    },
    /// Apply database migrations to DATABASE_URL.
    Migrate,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WorkSettingArg {
    Remote,
    Hybrid,
    Onsite,
}

impl From<WorkSettingArg> for WorkSettingFilter {
    fn from(arg: WorkSettingArg) -> Self {
        match arg {
            WorkSettingArg::Remote => WorkSettingFilter::Remote,
            WorkSettingArg::Hybrid => WorkSettingFilter::Hybrid,
            WorkSettingArg::Onsite => WorkSettingFilter::Onsite,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum JobTypeArg {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Internship,
}

impl From<JobTypeArg> for JobTypeFilter {
    fn from(arg: JobTypeArg) -> Self {
        match arg {
            JobTypeArg::FullTime => JobTypeFilter::FullTime,
            JobTypeArg::PartTime => JobTypeFilter::PartTime,
            JobTypeArg::Contract => JobTypeFilter::Contract,
            JobTypeArg::Temporary => JobTypeFilter::Temporary,
            JobTypeArg::Internship => JobTypeFilter::Internship,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,jobsift_sync=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Sync => {
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("received ctrl-c, finishing current page");
                    on_signal.cancel();
                }
            });

            let summary = run_sync_once_from_env(&cancel).await?;
            println!(
                "sync complete: run_id={} new={} duplicate={} invalid={} total={} cancelled={} reports={}",
                summary.run_id,
                summary.totals.new_count,
                summary.totals.duplicate_count,
                summary.totals.invalid_count,
                summary.totals.total_candidates,
                summary.cancelled,
                summary.reports_dir
            );
        }
        Commands::Report { runs, workspace } => {
            let root = workspace.unwrap_or_else(|| SyncConfig::from_env().workspace_root);
            println!("{}", report_markdown(runs, Some(root))?);
        }
        Commands::SearchUrl {
            job_title,
            location,
            radius,
            days_ago,
            work_setting,
            job_type,
        } => {
            let query = SearchQuery {
                location,
                radius,
                days_ago,
                work_setting: work_setting.map(Into::into),
                job_type: job_type.map(Into::into),
                ..SearchQuery::new(job_title)
            };
            println!("{}", build_search_url(&query)?);
        }
        Commands::Migrate => {
            let config = SyncConfig::from_env();
            let url = config
                .database_url
                .context("DATABASE_URL must be set to migrate")?;
            PgJobRepository::connect(&url).await?.migrate().await?;
            println!("migrations applied");
        }
    }

    Ok(())
}
