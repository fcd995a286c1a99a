// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Model
//!
//! A session scopes all per-attempt state of one participant working through
//! the handshake. It is identified by a random v4 UUID and lives entirely in
//! the token cache; there is no other persistence.
//!
//! ## Lifecycle
//!
//! ```text
//! (no session) --Verify--> AwaitingAddress --Validate--> AwaitingSubmission --Submit--> Complete
//! ```
//!
//! Every value written for a session expires independently after the
//! configured TTL (1 hour by default).

pub mod store;
pub mod tokens;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use store::SessionStore;
pub use tokens::TokenIssuer;

/// Opaque, server-generated session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(SessionId)
    }
}

/// Where a session stands in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Verify succeeded; an address choice is expected.
    AwaitingAddress,
    /// Validate succeeded; a survey submission is expected.
    AwaitingSubmission,
    /// The survey was accepted downstream.
    Complete,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::AwaitingAddress => "awaiting_address",
            SessionState::AwaitingSubmission => "awaiting_submission",
            SessionState::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "awaiting_address" => Some(SessionState::AwaitingAddress),
            "awaiting_submission" => Some(SessionState::AwaitingSubmission),
            "complete" => Some(SessionState::Complete),
            _ => None,
        }
    }

    /// The only legal forward moves. There are no backward transitions.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::AwaitingAddress, SessionState::AwaitingSubmission)
                | (SessionState::AwaitingSubmission, SessionState::Complete)
        )
    }
}

/// Identity fields captured at Verify time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub first_name: String,
    pub last_name: String,
    /// Date of birth exactly as the participant entered it.
    pub dob: String,
}

/// External record identifiers returned by the identity resolver.
///
/// Kept for the downstream record; never re-validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordIds {
    /// Medical record number.
    pub mrn: String,
    /// Financial (encounter) number.
    pub fin: String,
}
