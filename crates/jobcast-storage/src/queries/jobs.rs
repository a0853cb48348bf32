// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job posting persistence and broadcast bookkeeping.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use jobcast_core::types::{JobPosting, JobStatus};
use jobcast_core::JobcastError;
use rusqlite::params;

use crate::database::{map_tr_err, timestamp, Database};

fn conversion_err(
    col: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
}

fn row_to_job(row: &rusqlite::Row<'_>) -> Result<JobPosting, rusqlite::Error> {
    let deadline: Option<String> = row.get(6)?;
    let status: String = row.get(9)?;
    let last_broadcast_at: Option<String> = row.get(11)?;

    Ok(JobPosting {
        id: row.get(0)?,
        title: row.get(1)?,
        company: row.get(2)?,
        location: row.get(3)?,
        salary_min: row.get(4)?,
        salary_max: row.get(5)?,
        deadline: deadline
            .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
            .transpose()
            .map_err(|e| conversion_err(6, e))?,
        is_urgent: row.get(7)?,
        broadcast_enabled: row.get(8)?,
        status: JobStatus::from_str(&status).map_err(|e| conversion_err(9, e))?,
        broadcast_count: row.get(10)?,
        last_broadcast_at: last_broadcast_at
            .map(|t| DateTime::parse_from_rfc3339(&t).map(|t| t.with_timezone(&Utc)))
            .transpose()
            .map_err(|e| conversion_err(11, e))?,
    })
}

/// Inserts or updates a job posting's attributes.
///
/// The bookkeeping columns (`broadcast_count`, `last_broadcast_at`) are
/// owned by the broadcast pipeline and never overwritten here.
pub async fn upsert_job(db: &Database, job: &JobPosting) -> Result<(), JobcastError> {
    let job = job.clone();
    let now = timestamp(Utc::now());
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO job_postings
                    (id, title, company, location, salary_min, salary_max, deadline,
                     is_urgent, broadcast_enabled, status, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    company = excluded.company,
                    location = excluded.location,
                    salary_min = excluded.salary_min,
                    salary_max = excluded.salary_max,
                    deadline = excluded.deadline,
                    is_urgent = excluded.is_urgent,
                    broadcast_enabled = excluded.broadcast_enabled,
                    status = excluded.status,
                    updated_at = excluded.updated_at",
                params![
                    job.id,
                    job.title,
                    job.company,
                    job.location,
                    job.salary_min,
                    job.salary_max,
                    job.deadline.map(|d| d.format("%Y-%m-%d").to_string()),
                    job.is_urgent,
                    job.broadcast_enabled,
                    job.status.to_string(),
                    now,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetches a job posting by id.
pub async fn get_job(db: &Database, job_id: &str) -> Result<Option<JobPosting>, JobcastError> {
    let job_id = job_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<JobPosting>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, title, company, location, salary_min, salary_max, deadline,
                        is_urgent, broadcast_enabled, status, broadcast_count, last_broadcast_at
                 FROM job_postings WHERE id = ?1",
            )?;
            match stmt.query_row(params![job_id], row_to_job) {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Removes a job posting. Returns whether a row was deleted.
pub async fn delete_job(db: &Database, job_id: &str) -> Result<bool, JobcastError> {
    let job_id = job_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute("DELETE FROM job_postings WHERE id = ?1", params![job_id])?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn increment_broadcast_count(db: &Database, job_id: &str) -> Result<(), JobcastError> {
    let job_id = job_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE job_postings SET broadcast_count = broadcast_count + 1 WHERE id = ?1",
                params![job_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_last_broadcast_at(
    db: &Database,
    job_id: &str,
    at: DateTime<Utc>,
) -> Result<(), JobcastError> {
    let job_id = job_id.to_string();
    let at = at.to_rfc3339();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE job_postings SET last_broadcast_at = ?1 WHERE id = ?2",
                params![at, job_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
