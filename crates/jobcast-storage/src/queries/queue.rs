// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue operations for durable, delayed, retried task processing.

use std::time::Duration;

use chrono::Utc;
use jobcast_core::types::{FailOutcome, QueueEntry, QueueStats};
use jobcast_core::JobcastError;
use rusqlite::params;

use crate::database::{map_tr_err, timestamp, Database};

fn after(delay: Duration) -> String {
    let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX);
    timestamp(Utc::now().checked_add_signed(delay).unwrap_or(chrono::DateTime::<Utc>::MAX_UTC))
}

/// Enqueue a payload that becomes visible after `delay`. Returns the entry id.
pub async fn enqueue(
    db: &Database,
    queue_name: &str,
    payload: &str,
    delay: Duration,
    max_attempts: u32,
) -> Result<i64, JobcastError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    let available_at = after(delay);
    let max_attempts = i64::from(max_attempts.max(1));
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO queue (queue_name, payload, max_attempts, available_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![queue_name, payload, max_attempts, available_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Claim the next visible entry of the named queue.
///
/// Visible means pending with `available_at` in the past, or processing with
/// an expired lock (the worker holding it died). The claimed entry is marked
/// processing and locked for `lock`. Returns `None` if nothing is visible.
pub async fn dequeue(
    db: &Database,
    queue_name: &str,
    lock: Duration,
) -> Result<Option<QueueEntry>, JobcastError> {
    let queue_name = queue_name.to_string();
    let now = timestamp(Utc::now());
    let locked_until = after(lock);
    db.connection()
        .call(move |conn| -> Result<Option<QueueEntry>, rusqlite::Error> {
            let tx = conn.transaction()?;

            let result = {
                let mut stmt = tx.prepare(
                    "SELECT id, queue_name, payload, status, attempts, max_attempts,
                            available_at, locked_until, last_error, created_at, updated_at
                     FROM queue
                     WHERE queue_name = ?1
                       AND ((status = 'pending' AND available_at <= ?2)
                         OR (status = 'processing' AND locked_until < ?2))
                     ORDER BY available_at ASC, id ASC
                     LIMIT 1",
                )?;
                stmt.query_row(params![queue_name, now], |row| {
                    Ok(QueueEntry {
                        id: row.get(0)?,
                        queue_name: row.get(1)?,
                        payload: row.get(2)?,
                        status: row.get(3)?,
                        attempts: row.get(4)?,
                        max_attempts: row.get(5)?,
                        available_at: row.get(6)?,
                        locked_until: row.get(7)?,
                        last_error: row.get(8)?,
                        created_at: row.get(9)?,
                        updated_at: row.get(10)?,
                    })
                })
            };

            match result {
                Ok(entry) => {
                    tx.execute(
                        "UPDATE queue SET status = 'processing', locked_until = ?1, updated_at = ?2
                         WHERE id = ?3",
                        params![locked_until, now, entry.id],
                    )?;
                    tx.commit()?;
                    Ok(Some(QueueEntry {
                        status: "processing".to_string(),
                        locked_until: Some(locked_until),
                        updated_at: now,
                        ..entry
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an entry completed.
pub async fn ack(db: &Database, id: i64) -> Result<(), JobcastError> {
    let now = timestamp(Utc::now());
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE queue SET status = 'completed', locked_until = NULL, updated_at = ?1
                 WHERE id = ?2",
                params![now, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed attempt.
///
/// Increments attempts. At `max_attempts` the entry is failed for good;
/// otherwise it returns to pending and becomes visible after the backoff
/// delay for this attempt (the last backoff value repeats).
pub async fn fail(
    db: &Database,
    id: i64,
    error: &str,
    backoff: &[Duration],
) -> Result<FailOutcome, JobcastError> {
    let error = error.to_string();
    let backoff = backoff.to_vec();
    let now = timestamp(Utc::now());
    db.connection()
        .call(move |conn| -> Result<FailOutcome, rusqlite::Error> {
            let (attempts, max_attempts): (i32, i32) = conn.query_row(
                "SELECT attempts, max_attempts FROM queue WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let attempts = attempts + 1;
            if attempts >= max_attempts {
                conn.execute(
                    "UPDATE queue SET status = 'failed', attempts = ?1, last_error = ?2,
                     locked_until = NULL, updated_at = ?3
                     WHERE id = ?4",
                    params![attempts, error, now, id],
                )?;
                return Ok(FailOutcome::Failed { attempts });
            }

            let index = usize::try_from(attempts - 1).unwrap_or(0);
            let delay = backoff
                .get(index)
                .or(backoff.last())
                .copied()
                .unwrap_or_default();
            conn.execute(
                "UPDATE queue SET status = 'pending', attempts = ?1, last_error = ?2,
                 available_at = ?3, locked_until = NULL, updated_at = ?4
                 WHERE id = ?5",
                params![attempts, error, after(delay), now, id],
            )?;
            Ok(FailOutcome::Retrying {
                attempt: attempts,
                delay,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an entry failed without further retries.
pub async fn fail_permanently(db: &Database, id: i64, error: &str) -> Result<(), JobcastError> {
    let error = error.to_string();
    let now = timestamp(Utc::now());
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE queue SET status = 'failed', attempts = attempts + 1, last_error = ?1,
                 locked_until = NULL, updated_at = ?2
                 WHERE id = ?3",
                params![error, now, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Count entries of a queue by status.
pub async fn stats(db: &Database, queue_name: &str) -> Result<QueueStats, JobcastError> {
    let queue_name = queue_name.to_string();
    let now = timestamp(Utc::now());
    db.connection()
        .call(move |conn| -> Result<QueueStats, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT status, available_at <= ?2 AS visible, COUNT(*)
                 FROM queue WHERE queue_name = ?1
                 GROUP BY status, visible",
            )?;
            let rows = stmt.query_map(params![queue_name, now], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, bool>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?;

            let mut stats = QueueStats::default();
            for row in rows {
                let (status, visible, count) = row?;
                let count = u64::try_from(count).unwrap_or(0);
                match (status.as_str(), visible) {
                    ("pending", true) => stats.pending += count,
                    ("pending", false) => stats.delayed += count,
                    ("processing", _) => stats.active += count,
                    ("completed", _) => stats.completed += count,
                    ("failed", _) => stats.failed += count,
                    _ => {}
                }
            }
            Ok(stats)
        })
        .await
        .map_err(map_tr_err)
}
