// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Handshake
//!
//! The three-step state machine gating survey submission:
//!
//! 1. **Verify** resolves the participant's identity, opens a session and
//!    issues a verification token, a nonce and a shuffled address list.
//! 2. **Validate** consumes the nonce and verification token, checks the
//!    address choice (single attempt) and issues a validation token plus a
//!    rotated nonce.
//! 3. **Submit** redeems the validation token (single use) and forwards the
//!    composed survey record downstream.
//!
//! Every precondition failure returns immediately with a specific
//! [`HandshakeError`]. The only retry budget is the tries counter on Verify.
//!
//! All read-and-invalidate steps go through atomic cache primitives, so two
//! concurrent requests for one session can never both consume the same
//! nonce, address or token.

pub mod error;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use crate::config::{DEFAULT_GATEWAY_TIMEOUT, DEFAULT_MAX_TRIES, DEFAULT_UTC_OFFSET_MINUTES};
use crate::gateways::{
    GatewayError, IdentityQuery, IdentityResolution, IdentityResolver, ResolvedIdentity,
    SubmissionGateway,
};
use crate::session::{Identity, SessionId, SessionState, SessionStore, TokenIssuer};
use crate::survey::{SurveyAnswers, SurveyRecord};

pub use error::HandshakeError;

/// Identity fields posted to Verify.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct VerifyRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    /// Reset the tries counter before counting this attempt.
    pub freshen: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub session_id: SessionId,
    /// Correct address plus decoys, shuffled.
    pub addresses: Vec<String>,
    pub verification_token: String,
    pub nonce: String,
}

/// Credentials presented to Validate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationCredentials {
    pub session_id: String,
    pub verification_token: String,
    pub nonce: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateOutcome {
    pub session_id: SessionId,
    pub validation_token: String,
    /// Rotated nonce for the next step.
    pub nonce: String,
}

/// Credentials presented to Submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationCredentials {
    pub session_id: String,
    pub validation_token: String,
}

#[derive(Debug, Clone, Copy)]
pub struct HandshakeSettings {
    pub max_tries: u32,
    pub gateway_timeout: Duration,
    /// Timezone used for the submission date and time.
    pub reporting_offset: FixedOffset,
}

impl Default for HandshakeSettings {
    fn default() -> Self {
        Self {
            max_tries: DEFAULT_MAX_TRIES,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            reporting_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60)
                .unwrap_or(Utc.fix()),
        }
    }
}

pub struct Handshake {
    sessions: SessionStore,
    issuer: TokenIssuer,
    resolver: Arc<dyn IdentityResolver>,
    submitter: Arc<dyn SubmissionGateway>,
    settings: HandshakeSettings,
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, HandshakeError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(HandshakeError::MissingInput(name)),
    }
}

fn log_failure(step: &'static str, err: &HandshakeError) {
    if err.is_operational() {
        error!(step, error = %err, "Handshake step failed");
    } else {
        debug!(step, error_code = err.error_code(), "Handshake step rejected");
    }
}

impl Handshake {
    pub fn new(
        sessions: SessionStore,
        resolver: Arc<dyn IdentityResolver>,
        submitter: Arc<dyn SubmissionGateway>,
        settings: HandshakeSettings,
    ) -> Self {
        Self {
            sessions,
            issuer: TokenIssuer::new(),
            resolver,
            submitter,
            settings,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Bound an outbound call by the gateway timeout.
    async fn bounded<T, F>(&self, call: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        tokio::time::timeout(self.settings.gateway_timeout, call)
            .await
            .unwrap_or(Err(GatewayError::Timeout))
    }

    /// Move a session along the handshake, refusing any illegal transition.
    fn advance(
        &self,
        session: &SessionId,
        from: SessionState,
        to: SessionState,
    ) -> Result<(), HandshakeError> {
        if !from.can_transition_to(to) {
            return Err(HandshakeError::InternalFault(format!(
                "illegal session transition {} -> {}",
                from.as_str(),
                to.as_str()
            )));
        }
        self.sessions.put_state(session, to)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Verify
    // -------------------------------------------------------------------------

    /// Resolve the participant and open a session.
    ///
    /// `attempt` is the caller's pre-session placeholder; it keys the tries
    /// counter until a session exists.
    pub async fn verify(
        &self,
        attempt: &str,
        request: &VerifyRequest,
    ) -> Result<VerifyOutcome, HandshakeError> {
        self.verify_inner(attempt, request)
            .await
            .inspect_err(|e| log_failure("verify", e))
    }

    async fn verify_inner(
        &self,
        attempt: &str,
        request: &VerifyRequest,
    ) -> Result<VerifyOutcome, HandshakeError> {
        let first_name = required(request.first_name.as_deref(), "firstName")?;
        let last_name = required(request.last_name.as_deref(), "lastName")?;
        let dob = required(request.dob.as_deref(), "dob")?;
        let attempt = required(Some(attempt), "Session-ID")?;

        let query = IdentityQuery {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            dob: dob.to_string(),
        };

        let resolution = self.bounded(self.resolver.resolve(&query)).await?;
        match resolution {
            IdentityResolution::NotFound => {
                Err(self.count_failed_attempt(attempt, request.freshen)?)
            }
            IdentityResolution::Resolved(resolved) => self.open_session(attempt, query, resolved),
        }
    }

    /// Charge one failed lookup to the attempt's retry budget and return the
    /// failure to report.
    fn count_failed_attempt(
        &self,
        attempt: &str,
        freshen: bool,
    ) -> Result<HandshakeError, HandshakeError> {
        let max = self.settings.max_tries;
        let tries = match self.sessions.tries(attempt)? {
            // First miss starts the budget.
            None => max,
            Some(_) if freshen => max.saturating_sub(1),
            Some(current) => current.saturating_sub(1),
        };

        if tries > 0 {
            self.sessions.put_tries(attempt, tries)?;
            Ok(HandshakeError::RetryableIdentityFailure {
                tries_remaining: tries,
            })
        } else {
            self.sessions.clear_tries(attempt)?;
            Ok(HandshakeError::TerminalIdentityFailure)
        }
    }

    fn open_session(
        &self,
        attempt: &str,
        query: IdentityQuery,
        resolved: ResolvedIdentity,
    ) -> Result<VerifyOutcome, HandshakeError> {
        let session_id = SessionId::generate();
        let identity = Identity {
            first_name: query.first_name,
            last_name: query.last_name,
            dob: query.dob,
        };

        let ResolvedIdentity {
            record_ids,
            correct_address,
            decoy_addresses,
        } = resolved;

        let mut addresses = Vec::with_capacity(decoy_addresses.len() + 1);
        addresses.push(correct_address.clone());
        addresses.extend(
            decoy_addresses
                .into_iter()
                .filter(|decoy| *decoy != correct_address),
        );
        addresses.shuffle(&mut rand::thread_rng());

        let verification_token = self.issuer.token()?;
        let nonce = self.issuer.nonce()?;

        let store = &self.sessions;
        store.put_identity(&session_id, &identity)?;
        store.put_record_ids(&session_id, &record_ids)?;
        store.put_correct_address(&session_id, &correct_address)?;
        store.put_verification_token(&session_id, &verification_token)?;
        store.put_nonce(&session_id, &nonce)?;
        store.put_attempt(&session_id, attempt)?;
        store.put_state(&session_id, SessionState::AwaitingAddress)?;
        store.clear_tries(attempt)?;

        info!(session_id = %session_id, choices = addresses.len(), "Session opened");

        Ok(VerifyOutcome {
            session_id,
            addresses,
            verification_token,
            nonce,
        })
    }

    // -------------------------------------------------------------------------
    // Validate
    // -------------------------------------------------------------------------

    /// Check the participant's address choice. One attempt per session.
    pub async fn validate(
        &self,
        credentials: &VerificationCredentials,
        address_choice: Option<&str>,
    ) -> Result<ValidateOutcome, HandshakeError> {
        self.validate_inner(credentials, address_choice)
            .inspect_err(|e| log_failure("validate", e))
    }

    fn validate_inner(
        &self,
        credentials: &VerificationCredentials,
        address_choice: Option<&str>,
    ) -> Result<ValidateOutcome, HandshakeError> {
        let verification_token =
            required(Some(credentials.verification_token.as_str()), "Verification-Token")?;
        let raw_session = required(Some(credentials.session_id.as_str()), "Session-ID")?;
        // Compared verbatim below; only presence is checked here.
        let address_choice = match address_choice {
            Some(a) if !a.is_empty() => a,
            _ => return Err(HandshakeError::MissingInput("address")),
        };

        let session: SessionId = raw_session
            .parse()
            .map_err(|_| HandshakeError::ExpiredOrInvalidSession)?;
        if self.sessions.state(&session)? != Some(SessionState::AwaitingAddress) {
            return Err(HandshakeError::ExpiredOrInvalidSession);
        }

        let nonce = credentials
            .nonce
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or(HandshakeError::Unauthenticated("Missing nonce"))?;
        if !self.sessions.consume_nonce(&session, nonce)? {
            return Err(HandshakeError::Unauthenticated("Invalid or expired nonce"));
        }

        if !self
            .sessions
            .retire_verification_token(&session, verification_token)?
        {
            return Err(HandshakeError::Unauthenticated(
                "Invalid or expired verification token",
            ));
        }

        let Some(correct_address) = self.sessions.take_correct_address(&session)? else {
            return Err(HandshakeError::ExpiredOrInvalidSession);
        };

        if address_choice != correct_address {
            // The single attempt is spent; the session cannot be validated again.
            self.sessions.clear_state(&session)?;
            return Err(HandshakeError::ValidationMismatch);
        }

        self.advance(
            &session,
            SessionState::AwaitingAddress,
            SessionState::AwaitingSubmission,
        )?;
        if let Some(attempt) = self.sessions.attempt(&session)? {
            self.sessions.clear_tries(&attempt)?;
        }

        let validation_token = self.issuer.token()?;
        let nonce = self.issuer.nonce()?;
        self.sessions.put_validation_token(&session, &validation_token)?;
        self.sessions.put_nonce(&session, &nonce)?;

        info!(session_id = %session, "Session validated");

        Ok(ValidateOutcome {
            session_id: session,
            validation_token,
            nonce,
        })
    }

    // -------------------------------------------------------------------------
    // Submit
    // -------------------------------------------------------------------------

    /// Redeem the validation token and forward the survey downstream.
    ///
    /// Returns the submission gateway's confirmation unchanged.
    pub async fn submit(
        &self,
        credentials: &ValidationCredentials,
        answers: &SurveyAnswers,
    ) -> Result<serde_json::Value, HandshakeError> {
        self.submit_inner(credentials, answers)
            .await
            .inspect_err(|e| log_failure("submit", e))
    }

    async fn submit_inner(
        &self,
        credentials: &ValidationCredentials,
        answers: &SurveyAnswers,
    ) -> Result<serde_json::Value, HandshakeError> {
        let raw_session = required(Some(credentials.session_id.as_str()), "Session-ID")?;
        let token = credentials.validation_token.trim();
        if token.is_empty() {
            return Err(HandshakeError::Unauthenticated("Missing validation token"));
        }

        let invalid = HandshakeError::Unauthenticated("Invalid or expired validation token");
        let Ok(session) = raw_session.parse::<SessionId>() else {
            return Err(invalid);
        };
        if !self.sessions.redeem_validation_token(&session, token)? {
            return Err(invalid);
        }

        if self.sessions.state(&session)? != Some(SessionState::AwaitingSubmission) {
            return Err(HandshakeError::ExpiredOrInvalidSession);
        }
        let (Some(identity), Some(record_ids)) = (
            self.sessions.identity(&session)?,
            self.sessions.record_ids(&session)?,
        ) else {
            return Err(HandshakeError::ExpiredOrInvalidSession);
        };

        let submitted_at = Utc::now().with_timezone(&self.settings.reporting_offset);
        let record = SurveyRecord::compose(identity, record_ids, answers, submitted_at);

        match self.bounded(self.submitter.submit(&record)).await {
            Ok(confirmation) => {
                self.advance(
                    &session,
                    SessionState::AwaitingSubmission,
                    SessionState::Complete,
                )?;
                info!(session_id = %session, "Survey submitted");
                Ok(confirmation)
            }
            Err(err) if err.is_rejection() => {
                // Nothing was stored downstream; the same token may retry.
                if let Err(e) = self.sessions.put_validation_token(&session, token) {
                    warn!(session_id = %session, error = %e, "Failed to reinstate validation token");
                }
                Err(err.into())
            }
            Err(err) => {
                // The record may have landed. A retry could file it twice.
                warn!(session_id = %session, error = %err, "Submission outcome unknown; token stays spent");
                Err(err.into())
            }
        }
    }
}
