// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # External Gateways
//!
//! The handshake talks to two external systems, both treated as opaque
//! request/response boundaries:
//!
//! - the **identity resolver**, which looks up a participant by name and date
//!   of birth and returns record identifiers plus candidate addresses
//! - the **submission gateway**, which accepts the finished survey record
//!
//! Both are traits so the state machine can be exercised without a network.

pub mod identity;
pub mod submission;

use async_trait::async_trait;
use serde::Serialize;

use crate::session::RecordIds;
use crate::survey::SurveyRecord;

pub use identity::HttpIdentityResolver;
pub use submission::HttpSubmissionGateway;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway configuration invalid: {0}")]
    Config(String),

    #[error("gateway request timed out")]
    Timeout,

    #[error("gateway request failed: {0}")]
    Transport(String),

    #[error("gateway returned HTTP {0}")]
    Status(u16),

    #[error("gateway response was invalid: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// The gateway answered and turned the request down. Any other failure
    /// leaves open whether the request was acted on.
    pub fn is_rejection(&self) -> bool {
        matches!(self, GatewayError::Status(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else if e.is_decode() {
            GatewayError::InvalidResponse(e.to_string())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

/// Identity lookup request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityQuery {
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
}

/// A successful identity lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub record_ids: RecordIds,
    /// The address on record for the participant.
    pub correct_address: String,
    /// Plausible but wrong addresses to mix into the choice list.
    pub decoy_addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityResolution {
    /// The resolver has no matching visit.
    NotFound,
    Resolved(ResolvedIdentity),
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, query: &IdentityQuery) -> Result<IdentityResolution, GatewayError>;
}

#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    /// Forward a completed survey. The confirmation payload is relayed to the
    /// caller unchanged.
    async fn submit(&self, record: &SurveyRecord) -> Result<serde_json::Value, GatewayError>;
}
