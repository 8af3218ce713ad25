//! Parquet snapshot of accepted job records.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field as ArrowField, Schema};
use jobsift_core::{JobRecord, EXPORT_COLUMNS};
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParquetManifest {
    pub schema_version: u32,
    pub files: Vec<ParquetManifestFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParquetManifestFile {
    pub name: String,
    pub path: String,
    pub rows: usize,
    pub sha256: String,
    pub bytes: u64,
}

fn is_numeric(column: &str) -> bool {
    matches!(
        column,
        "salary_min" | "salary_max" | "salary_min_yearly" | "salary_max_yearly" | "salary_midpoint_yearly"
    )
}

fn is_required(column: &str) -> bool {
    matches!(column, "job_id" | "source" | "title" | "company" | "work_setting" | "date_scraped")
}

pub fn job_listings_schema() -> Schema {
    Schema::new(
        EXPORT_COLUMNS
            .iter()
            .map(|name| {
                let data_type = if is_numeric(name) {
                    DataType::Float64
                } else {
                    DataType::Utf8
                };
                ArrowField::new(*name, data_type, !is_required(name))
            })
            .collect::<Vec<_>>(),
    )
}

fn text_column(record: &JobRecord, column: &str) -> Option<String> {
    match column {
        "job_id" => Some(record.job_id.clone()),
        "source" => Some(record.source.clone()),
        "title" => Some(record.title.clone()),
        "company" => Some(record.company.clone()),
        "work_setting" => Some(record.work_setting.as_str().to_string()),
        "job_type" => record.job_type.clone(),
        "date_posted" => record.date_posted.map(|d| d.format("%Y-%m-%d").to_string()),
        "date_scraped" => Some(record.date_scraped.to_rfc3339()),
        "city" => record.city.clone(),
        "state" => record.state.clone(),
        "zip_code" => record.zip_code.clone(),
        "salary_period" => record.salary_period.map(|p| p.as_str().to_string()),
        "job_url" => record.job_url.clone(),
        "search_url" => record.search_url.clone(),
        "description" => record.description.clone(),
        _ => None,
    }
}

fn numeric_column(record: &JobRecord, column: &str) -> Option<f64> {
    match column {
        "salary_min" => record.salary_min,
        "salary_max" => record.salary_max,
        "salary_min_yearly" => record.salary_min_yearly,
        "salary_max_yearly" => record.salary_max_yearly,
        "salary_midpoint_yearly" => record.salary_midpoint_yearly,
        _ => None,
    }
}

pub fn job_listings_batch(records: &[JobRecord]) -> Result<RecordBatch> {
    let columns = EXPORT_COLUMNS
        .iter()
        .map(|name| -> ArrayRef {
            if is_numeric(name) {
                Arc::new(Float64Array::from(
                    records.iter().map(|r| numeric_column(r, name)).collect::<Vec<_>>(),
                ))
            } else {
                Arc::new(StringArray::from(
                    records.iter().map(|r| text_column(r, name)).collect::<Vec<_>>(),
                ))
            }
        })
        .collect::<Vec<_>>();
    RecordBatch::try_new(Arc::new(job_listings_schema()), columns).context("building job_listings record batch")
}

fn write_parquet(path: &Path, batch: RecordBatch) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .with_context(|| format!("opening parquet writer {}", path.display()))?;
    writer
        .write(&batch)
        .with_context(|| format!("writing record batch {}", path.display()))?;
    writer
        .close()
        .with_context(|| format!("closing parquet writer {}", path.display()))?;
    Ok(())
}

fn manifest_entry(name: &str, reports_dir: &Path, path: &Path, rows: usize) -> Result<ParquetManifestFile> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let sha256 = hex::encode(Sha256::digest(&bytes));
    let rel = path
        .strip_prefix(reports_dir)
        .unwrap_or(path)
        .display()
        .to_string();
    Ok(ParquetManifestFile {
        name: name.to_string(),
        path: rel,
        rows,
        sha256,
        bytes: bytes.len() as u64,
    })
}

/// Write `snapshots/job_listings.parquet` and its manifest under `reports_dir`.
/// Returns the manifest path.
pub async fn export_snapshot(reports_dir: &Path, records: &[JobRecord]) -> Result<std::path::PathBuf> {
    let snapshot_dir = reports_dir.join("snapshots");
    fs::create_dir_all(&snapshot_dir)
        .await
        .with_context(|| format!("creating {}", snapshot_dir.display()))?;

    let listings_path = snapshot_dir.join("job_listings.parquet");
    write_parquet(&listings_path, job_listings_batch(records)?)?;

    let manifest = ParquetManifest {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        files: vec![manifest_entry("job_listings", reports_dir, &listings_path, records.len())?],
    };
    let manifest_path = snapshot_dir.join("manifest.json");
    let bytes = serde_json::to_vec_pretty(&manifest).context("serializing parquet manifest")?;
    fs::write(&manifest_path, bytes)
        .await
        .with_context(|| format!("writing {}", manifest_path.display()))?;
    Ok(manifest_path)
}
