use std::collections::HashSet;

use anyhow::Context;
use jobsift_core::JobRecord;
use sqlx::{PgPool, Row};
use tracing::info;

/// `job_listings` table access; the database-backed counterpart of the ledger.
#[derive(Debug, Clone)]
pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("connecting to job database")?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .context("running job_listings migrations")?;
        info!("job database migrated");
        Ok(())
    }

    pub async fn known_ids(&self) -> anyhow::Result<HashSet<String>> {
        let rows = sqlx::query("SELECT job_id FROM job_listings")
            .fetch_all(&self.pool)
            .await
            .context("loading stored job ids")?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("job_id").context("reading job_id column"))
            .collect()
    }

    /// Insert records, leaving rows with an existing `job_id` untouched.
    pub async fn insert_records(&self, records: &[JobRecord]) -> anyhow::Result<usize> {
        let mut tx = self.pool.begin().await.context("opening insert transaction")?;
        let mut inserted = 0u64;
        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO job_listings (
                    job_id, source, title, company, location, city, state, zip_code,
                    salary_original, salary_min, salary_max, salary_period,
                    salary_min_yearly, salary_max_yearly, salary_midpoint_yearly,
                    job_type, work_setting, date_posted, date_scraped,
                    job_url, search_url, queried_job_title, description
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                        $16, $17, $18, $19, $20, $21, $22, $23)
                ON CONFLICT (job_id) DO NOTHING
                "#,
            )
            .bind(&record.job_id)
            .bind(&record.source)
            .bind(&record.title)
            .bind(&record.company)
            .bind(&record.location)
            .bind(&record.city)
            .bind(&record.state)
            .bind(&record.zip_code)
            .bind(&record.salary_original)
            .bind(record.salary_min)
            .bind(record.salary_max)
            .bind(record.salary_period.map(|p| p.as_str()))
            .bind(record.salary_min_yearly)
            .bind(record.salary_max_yearly)
            .bind(record.salary_midpoint_yearly)
            .bind(&record.job_type)
            .bind(record.work_setting.as_str())
            .bind(record.date_posted)
            .bind(record.date_scraped)
            .bind(&record.job_url)
            .bind(&record.search_url)
            .bind(&record.queried_job_title)
            .bind(&record.description)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("inserting job {}", record.job_id))?;
            inserted += result.rows_affected();
        }
        tx.commit().await.context("committing job inserts")?;
        Ok(inserted as usize)
    }
}
