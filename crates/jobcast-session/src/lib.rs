// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle for the Jobcast gateway.
//!
//! A session is one authenticated account on the chat transport. This crate
//! owns the live session registry, drives each session's state machine from
//! its transport events, reconnects dropped sessions, persists credential
//! rotations and relays inbound messages to the host platform.

pub mod bridge;
pub mod fsm;
pub mod manager;
pub mod relay;

pub use bridge::BridgeConnector;
pub use fsm::{SessionFsm, SessionInput};
pub use manager::SessionManager;
pub use relay::{InboundEnvelope, WebhookRelay};
