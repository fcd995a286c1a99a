// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Handshake failure taxonomy.
//!
//! Every failure is detected at the state-machine boundary and returned to the
//! transport as a structured result. Only gateway and internal failures are
//! operational problems; the rest are ordinary participant outcomes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::cache::CacheError;
use crate::gateways::GatewayError;
use crate::session::tokens::RandomnessError;

/// Where the client should send a participant after a terminal identity failure.
pub const FAILED_IDENTITY_REDIRECT: &str = "/failedpage";

/// Where the client should send a participant after a wrong address choice.
pub const FAILED_VALIDATION_REDIRECT: &str = "/validation-failed";

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// A required field or header was absent or empty.
    #[error("{0} is required")]
    MissingInput(&'static str),

    /// A token or nonce was missing or did not match.
    #[error("{0}")]
    Unauthenticated(&'static str),

    /// No live session for the presented id, or it is past this step.
    #[error("Invalid or expired session")]
    ExpiredOrInvalidSession,

    /// Identity not found; the participant may try again.
    #[error("No matching visit found")]
    RetryableIdentityFailure { tries_remaining: u32 },

    /// Identity not found and the retry budget is spent.
    #[error("Maximum tries exceeded")]
    TerminalIdentityFailure,

    /// The chosen address is not the one on record.
    #[error("Address validation failed")]
    ValidationMismatch,

    /// An external system failed, timed out, or replied with garbage.
    #[error("Upstream service unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Internal error: {0}")]
    InternalFault(String),
}

#[derive(Serialize)]
struct HandshakeErrorBody {
    error: String,
    error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tries: Option<u32>,
    #[serde(rename = "redirectTo", skip_serializing_if = "Option::is_none")]
    redirect_to: Option<&'static str>,
}

impl HandshakeError {
    pub fn error_code(&self) -> &'static str {
        match self {
            HandshakeError::MissingInput(_) => "missing_input",
            HandshakeError::Unauthenticated(_) => "unauthenticated",
            HandshakeError::ExpiredOrInvalidSession => "expired_or_invalid_session",
            HandshakeError::RetryableIdentityFailure { .. } => "identity_not_found",
            HandshakeError::TerminalIdentityFailure => "identity_tries_exhausted",
            HandshakeError::ValidationMismatch => "validation_mismatch",
            HandshakeError::GatewayUnavailable(_) => "gateway_unavailable",
            HandshakeError::InternalFault(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            HandshakeError::MissingInput(_)
            | HandshakeError::ExpiredOrInvalidSession
            | HandshakeError::RetryableIdentityFailure { .. }
            | HandshakeError::TerminalIdentityFailure
            | HandshakeError::ValidationMismatch => StatusCode::BAD_REQUEST,
            HandshakeError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            HandshakeError::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            HandshakeError::InternalFault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this outcome deserves operator attention.
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            HandshakeError::GatewayUnavailable(_) | HandshakeError::InternalFault(_)
        )
    }

    fn redirect_to(&self) -> Option<&'static str> {
        match self {
            HandshakeError::TerminalIdentityFailure => Some(FAILED_IDENTITY_REDIRECT),
            HandshakeError::ValidationMismatch => Some(FAILED_VALIDATION_REDIRECT),
            _ => None,
        }
    }
}

impl From<CacheError> for HandshakeError {
    fn from(e: CacheError) -> Self {
        HandshakeError::InternalFault(e.to_string())
    }
}

impl From<RandomnessError> for HandshakeError {
    fn from(e: RandomnessError) -> Self {
        HandshakeError::InternalFault(e.to_string())
    }
}

impl From<GatewayError> for HandshakeError {
    fn from(e: GatewayError) -> Self {
        HandshakeError::GatewayUnavailable(e.to_string())
    }
}

impl IntoResponse for HandshakeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal details stay in the logs.
        let message = match &self {
            HandshakeError::GatewayUnavailable(_) => "Upstream service unavailable".to_string(),
            HandshakeError::InternalFault(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let tries = match &self {
            HandshakeError::RetryableIdentityFailure { tries_remaining } => Some(*tries_remaining),
            _ => None,
        };
        let body = Json(HandshakeErrorBody {
            error: message,
            error_code: self.error_code(),
            tries,
            redirect_to: self.redirect_to(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: HandshakeError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn retryable_failure_reports_remaining_tries() {
        let (status, body) =
            body_of(HandshakeError::RetryableIdentityFailure { tries_remaining: 2 }).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "identity_not_found");
        assert_eq!(body["tries"], 2);
        assert!(body.get("redirectTo").is_none());
    }

    #[tokio::test]
    async fn terminal_failure_redirects_to_restart() {
        let (status, body) = body_of(HandshakeError::TerminalIdentityFailure).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["redirectTo"], FAILED_IDENTITY_REDIRECT);
    }

    #[tokio::test]
    async fn unauthenticated_returns_401() {
        let (status, body) = body_of(HandshakeError::Unauthenticated("Invalid nonce")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid nonce");
    }

    #[tokio::test]
    async fn gateway_details_are_not_leaked() {
        let (status, body) =
            body_of(HandshakeError::GatewayUnavailable("10.0.0.5 refused".into())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Upstream service unavailable");
    }

    #[test]
    fn only_gateway_and_internal_are_operational() {
        assert!(HandshakeError::GatewayUnavailable("x".into()).is_operational());
        assert!(HandshakeError::InternalFault("x".into()).is_operational());
        assert!(!HandshakeError::ValidationMismatch.is_operational());
        assert!(!HandshakeError::MissingInput("address").is_operational());
    }
}
