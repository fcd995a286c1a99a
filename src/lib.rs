// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SDOH Survey Gate - Verify, Validate, Submit handshake service
//!
//! This crate gates the submission of a social-determinants-of-health survey
//! behind a three-step handshake: the participant's identity is resolved,
//! they confirm their address from a shuffled list, and only then is the
//! survey forwarded to the form service.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `cache` - In-memory token cache with TTL and atomic take
//! - `gateways` - Identity resolver and submission gateway clients
//! - `handshake` - The Verify, Validate, Submit state machine
//! - `session` - Session identifiers, states and the typed session store
//! - `survey` - Survey answers, domain flags and the submitted record

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateways;
pub mod handshake;
pub mod logging;
pub mod session;
pub mod state;
pub mod survey;
