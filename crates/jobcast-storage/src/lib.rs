// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence layer for the Jobcast gateway.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, the durable broadcast queue, the
//! job posting bookkeeping table, and the per-session credential files.

pub mod adapter;
pub mod credentials;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use credentials::CredentialStore;
pub use database::Database;
