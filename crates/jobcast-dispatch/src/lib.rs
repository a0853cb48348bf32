// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message delivery through connected sessions.
//!
//! [`MessageDispatcher`] performs one send; [`BulkSender`] sequences many
//! sends through one session with a fixed pause between them.

pub mod address;
pub mod bulk;
pub mod dispatcher;

pub use address::normalize_address;
pub use bulk::BulkSender;
pub use dispatcher::MessageDispatcher;
