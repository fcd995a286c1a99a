// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Header guards for the handshake endpoints.
//!
//! Each guard reads the headers a step needs and hands the handler a typed
//! context. Guards only check that headers are readable; presence and
//! validity are decided by the state machine so every step reports its
//! failures in one fixed order.
//!
//! ```rust,ignore
//! async fn validate(
//!     VerificationGuard(credentials): VerificationGuard,
//!     State(state): State<AppState>,
//!     Json(body): Json<ValidateRequest>,
//! ) -> Result<Response, HandshakeError> {
//!     // credentials.session_id, credentials.verification_token, credentials.nonce
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::handshake::{HandshakeError, ValidationCredentials, VerificationCredentials};

pub const SESSION_ID_HEADER: &str = "session-id";
pub const VERIFICATION_TOKEN_HEADER: &str = "verification-token";
pub const VALIDATION_TOKEN_HEADER: &str = "validation-token";
pub const CSP_NONCE_HEADER: &str = "x-csp-nonce";

/// Header value as text. Absent headers read as empty; headers that are not
/// visible ASCII are rejected outright.
fn header_text(headers: &HeaderMap, name: &'static str) -> Result<String, HandshakeError> {
    match headers.get(name) {
        None => Ok(String::new()),
        Some(value) => value
            .to_str()
            .map(|s| s.trim().to_string())
            .map_err(|_| HandshakeError::Unauthenticated("Malformed header value")),
    }
}

/// Pre-session placeholder sent with Verify. Keys the tries counter.
pub struct VerifyGuard(pub String);

impl<S: Send + Sync> FromRequestParts<S> for VerifyGuard {
    type Rejection = HandshakeError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(VerifyGuard(header_text(&parts.headers, SESSION_ID_HEADER)?))
    }
}

/// Credentials issued by Verify, presented to Validate.
pub struct VerificationGuard(pub VerificationCredentials);

impl<S: Send + Sync> FromRequestParts<S> for VerificationGuard {
    type Rejection = HandshakeError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        let nonce = header_text(headers, CSP_NONCE_HEADER)?;
        Ok(VerificationGuard(VerificationCredentials {
            session_id: header_text(headers, SESSION_ID_HEADER)?,
            verification_token: header_text(headers, VERIFICATION_TOKEN_HEADER)?,
            nonce: (!nonce.is_empty()).then_some(nonce),
        }))
    }
}

/// Credentials issued by Validate, presented to Submit.
pub struct ValidationGuard(pub ValidationCredentials);

impl<S: Send + Sync> FromRequestParts<S> for ValidationGuard {
    type Rejection = HandshakeError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        Ok(ValidationGuard(ValidationCredentials {
            session_id: header_text(headers, SESSION_ID_HEADER)?,
            validation_token: header_text(headers, VALIDATION_TOKEN_HEADER)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/validate");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn verification_guard_reads_all_three_headers() {
        let mut parts = parts(&[
            ("Session-ID", " 6a1f "),
            ("Verification-Token", "vt"),
            ("X-CSP-Nonce", "n1"),
        ]);
        let VerificationGuard(creds) = VerificationGuard::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(creds.session_id, "6a1f");
        assert_eq!(creds.verification_token, "vt");
        assert_eq!(creds.nonce.as_deref(), Some("n1"));
    }

    #[tokio::test]
    async fn absent_headers_read_as_empty() {
        let mut parts = parts(&[]);
        let VerificationGuard(creds) = VerificationGuard::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(creds.session_id.is_empty());
        assert!(creds.nonce.is_none());

        let ValidationGuard(creds) = ValidationGuard::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(creds.validation_token.is_empty());
    }

    #[tokio::test]
    async fn non_ascii_header_is_rejected() {
        let mut parts = parts(&[]);
        parts.headers.insert(
            SESSION_ID_HEADER,
            axum::http::HeaderValue::from_bytes(b"caf\xe9").unwrap(),
        );
        assert!(matches!(
            VerifyGuard::from_request_parts(&mut parts, &()).await,
            Err(HandshakeError::Unauthenticated(_))
        ));
    }
}
