// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Jobcast messaging service.
//!
//! Exposes session control, single sends, templated sends, broadcast queue
//! statistics and job lifecycle intake under bearer auth, plus unauthenticated
//! health and Prometheus endpoints.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use error::ApiError;
pub use server::{GatewayState, HealthState, ServerConfig, router, start_server};
