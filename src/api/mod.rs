// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    handshake::VerifyRequest,
    state::AppState,
    survey::{DomainFlag, DomainFlags, SurveyAnswers},
};

pub mod extract;
pub mod handshake;
pub mod health;

const CORS_MAX_AGE: Duration = Duration::from_secs(600);

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let api_routes = Router::new()
        .route("/verify", post(handshake::verify))
        .route("/validate", post(handshake::validate))
        .route("/submit", post(handshake::submit))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .route("/health/live", get(health::liveness))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(allowed_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Cross-origin policy: only the configured origins, only the handshake
/// headers, credentials allowed.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(extract::SESSION_ID_HEADER),
            HeaderName::from_static(extract::VERIFICATION_TOKEN_HEADER),
            HeaderName::from_static(extract::VALIDATION_TOKEN_HEADER),
            HeaderName::from_static(extract::CSP_NONCE_HEADER),
        ])
        .expose_headers([HeaderName::from_static(extract::CSP_NONCE_HEADER)])
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handshake::verify,
        handshake::validate,
        handshake::submit,
        health::liveness
    ),
    components(
        schemas(
            VerifyRequest,
            handshake::VerifyResponse,
            handshake::ValidateRequest,
            handshake::ValidateResponse,
            SurveyAnswers,
            DomainFlag,
            DomainFlags,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Handshake", description = "Verify, validate and submit a survey"),
        (name = "Health", description = "Service probes")
    )
)]
struct ApiDoc;
