//! Listing pipeline: duplicate resolution, run assembly and the sync driver
//! that walks configured searches, stores new records and writes reports.

pub mod assembler;
pub mod config;
pub mod export;
pub mod pipeline;
pub mod report;
pub mod resolver;

pub use assembler::{
    assemble, build_record, AssemblerState, ListingAssembler, Outcome, PipelineConfig, RunOutput, StopReason,
};
pub use config::{SearchConfig, SearchRegistry, SyncConfig};
pub use export::{export_snapshot, job_listings_batch, ParquetManifest};
pub use pipeline::{drive_source, run_sync_once_from_env, SearchRunReport, SyncPipeline, SyncRunSummary};
pub use report::{read_jobs_delta, report_markdown, JobsDelta};
pub use resolver::{composite_key, synthetic_job_id, DuplicateReason, DuplicateResolver, Resolution};

pub const CRATE_NAME: &str = "jobsift-sync";
