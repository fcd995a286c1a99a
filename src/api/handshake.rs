// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verify, Validate and Submit endpoints.

use axum::{
    extract::State,
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::extract::{ValidationGuard, VerificationGuard, VerifyGuard, CSP_NONCE_HEADER};
use crate::{
    error::ApiJson,
    handshake::{HandshakeError, VerifyRequest},
    state::AppState,
    survey::SurveyAnswers,
};

/// Where the client goes after a successful Verify.
pub const VERIFIED_REDIRECT: &str = "/success";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyResponse {
    pub message: String,
    pub session_id: String,
    /// The address on record plus decoys, in random order.
    pub addresses: Vec<String>,
    #[serde(rename = "isVerified")]
    pub is_verified: bool,
    #[serde(rename = "verificationToken")]
    pub verification_token: String,
    /// Nonce to present as `X-CSP-Nonce` on Validate.
    pub verify_nonce: String,
    #[serde(rename = "redirectTo")]
    pub redirect_to: String,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ValidateRequest {
    /// The address the participant picked, compared verbatim.
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidateResponse {
    pub message: String,
    pub session_id: String,
    #[serde(rename = "isValidated")]
    pub is_validated: bool,
    #[serde(rename = "validationToken")]
    pub validation_token: String,
    /// Rotated nonce, also sent in the `X-CSP-Nonce` header.
    pub nonce: String,
}

#[utoipa::path(
    post,
    path = "/api/verify",
    request_body = VerifyRequest,
    tag = "Handshake",
    params(("Session-ID" = String, Header, description = "Client attempt identifier")),
    responses(
        (status = 200, description = "Identity resolved, session opened", body = VerifyResponse),
        (status = 400, description = "Missing input or identity not found"),
        (status = 502, description = "Identity resolver unavailable")
    )
)]
pub async fn verify(
    VerifyGuard(attempt): VerifyGuard,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifyRequest>,
) -> Result<Json<VerifyResponse>, HandshakeError> {
    let outcome = state.handshake.verify(&attempt, &request).await?;

    Ok(Json(VerifyResponse {
        message: "Verification successful".to_string(),
        session_id: outcome.session_id.to_string(),
        addresses: outcome.addresses,
        is_verified: true,
        verification_token: outcome.verification_token,
        verify_nonce: outcome.nonce,
        redirect_to: VERIFIED_REDIRECT.to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/validate",
    request_body = ValidateRequest,
    tag = "Handshake",
    params(
        ("Session-ID" = String, Header, description = "Session issued by verify"),
        ("Verification-Token" = String, Header, description = "Token issued by verify"),
        ("X-CSP-Nonce" = String, Header, description = "Nonce issued by verify")
    ),
    responses(
        (status = 200, description = "Address confirmed", body = ValidateResponse),
        (status = 400, description = "Missing input, wrong address or expired session"),
        (status = 401, description = "Token or nonce rejected")
    )
)]
pub async fn validate(
    VerificationGuard(credentials): VerificationGuard,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ValidateRequest>,
) -> Result<Response, HandshakeError> {
    let outcome = state
        .handshake
        .validate(&credentials, request.address.as_deref())
        .await?;

    let nonce_header = HeaderValue::from_str(&outcome.nonce)
        .map_err(|e| HandshakeError::InternalFault(format!("nonce is not a header value: {e}")))?;
    let body = Json(ValidateResponse {
        message: "Validation successful".to_string(),
        session_id: outcome.session_id.to_string(),
        is_validated: true,
        validation_token: outcome.validation_token,
        nonce: outcome.nonce,
    });

    Ok((
        [(HeaderName::from_static(CSP_NONCE_HEADER), nonce_header)],
        body,
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/submit",
    request_body = SurveyAnswers,
    tag = "Handshake",
    params(
        ("Session-ID" = String, Header, description = "Session issued by verify"),
        ("Validation-Token" = String, Header, description = "Token issued by validate")
    ),
    responses(
        (status = 200, description = "Submission confirmation relayed from the form service"),
        (status = 400, description = "Missing input or expired session"),
        (status = 401, description = "Validation token rejected or already used"),
        (status = 502, description = "Form service unavailable")
    )
)]
pub async fn submit(
    ValidationGuard(credentials): ValidationGuard,
    State(state): State<AppState>,
    ApiJson(answers): ApiJson<SurveyAnswers>,
) -> Result<Json<serde_json::Value>, HandshakeError> {
    let confirmation = state.handshake.submit(&credentials, &answers).await?;
    Ok(Json(confirmation))
}
