// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the gateway's external collaborators.
//!
//! All adapters use `#[async_trait]` for dynamic dispatch compatibility.

pub mod job_store;
pub mod matching;
pub mod queue;
pub mod transport;

// Re-export all traits at the traits module level for convenience.
pub use job_store::JobStore;
pub use matching::MatchingService;
pub use queue::TaskQueue;
pub use transport::{TransportClient, TransportConnection, TransportConnector};
