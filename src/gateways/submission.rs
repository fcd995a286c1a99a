// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP submission gateway for the survey form service.
//!
//! The form service addresses every input by its numeric field id, so the
//! record is flattened into [`FormSubmission`] before it is posted.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use url::Url;

use super::{GatewayError, SubmissionGateway};
use crate::survey::{record::ParticipantName, DomainFlag, SurveyRecord};

#[derive(Debug, Clone)]
pub struct HttpSubmissionGateway {
    endpoint: Url,
    bearer_token: String,
    http: Client,
}

impl HttpSubmissionGateway {
    pub fn new(
        endpoint: Url,
        bearer_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let bearer_token = bearer_token.into();
        if bearer_token.trim().is_empty() {
            return Err(GatewayError::Config("submission bearer token is empty".to_string()));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            endpoint,
            bearer_token,
            http,
        })
    }
}

/// Wire body for the survey form, keyed by the form's field ids.
#[derive(Debug, Serialize)]
pub struct FormSubmission<'a> {
    #[serde(rename = "field_169568839")]
    name: &'a ParticipantName,
    #[serde(rename = "field_169568836")]
    result_date: &'a str,
    #[serde(rename = "field_169568837")]
    result_time: &'a str,
    #[serde(rename = "field_169568834")]
    mrn: &'a str,
    #[serde(rename = "field_169568835")]
    fin: &'a str,
    #[serde(rename = "field_169568840")]
    dob: &'a str,

    #[serde(rename = "field_169568841")]
    housing_security: Option<&'a str>,
    #[serde(rename = "field_169568842")]
    housing_condition: &'a str,
    #[serde(rename = "field_169568843")]
    food_security: Option<&'a str>,
    #[serde(rename = "field_169568844")]
    food_access: Option<&'a str>,
    #[serde(rename = "field_169568845")]
    healthcare_access: Option<&'a str>,
    #[serde(rename = "field_169568846")]
    utility_security: Option<&'a str>,
    #[serde(rename = "field_169568847")]
    childcare_access: Option<&'a str>,
    #[serde(rename = "field_169568848")]
    occupation_access: Option<&'a str>,
    #[serde(rename = "field_169568849")]
    education_access: Option<&'a str>,
    #[serde(rename = "field_169568850")]
    financial_security: Option<&'a str>,
    #[serde(rename = "field_169568851")]
    physical_security: Option<&'a str>,
    #[serde(rename = "field_169568852")]
    emotional_security: Option<&'a str>,
    #[serde(rename = "field_169568853")]
    safety_security: Option<&'a str>,
    #[serde(rename = "field_169568854")]
    wellbeing_security: Option<&'a str>,
    #[serde(rename = "field_174042542")]
    legal_status: Option<&'a str>,
    #[serde(rename = "field_174042555")]
    refuge_security: Option<&'a str>,
    #[serde(rename = "field_174042557")]
    military_service: Option<&'a str>,
    #[serde(rename = "field_169568855")]
    request_help: Option<&'a str>,
    #[serde(rename = "field_172501608")]
    sdoh_consent_program: Option<&'a str>,
    #[serde(rename = "field_171471885")]
    sdoh_consent_help: Option<&'a str>,

    #[serde(rename = "field_173550269")]
    domain_financial: DomainFlag,
    #[serde(rename = "field_173549876")]
    domain_childcare: DomainFlag,
    #[serde(rename = "field_173549893")]
    domain_food: DomainFlag,
    #[serde(rename = "field_173549892")]
    domain_housing: DomainFlag,
    #[serde(rename = "field_173549880")]
    domain_safety: DomainFlag,
    #[serde(rename = "field_173549879")]
    domain_transport: DomainFlag,
    #[serde(rename = "field_173550241")]
    domain_utility: DomainFlag,
    #[serde(rename = "field_174042914")]
    domain_employment: DomainFlag,
    #[serde(rename = "field_174042915")]
    domain_education: DomainFlag,
    #[serde(rename = "field_174042910")]
    domain_additional_factors: DomainFlag,
    #[serde(rename = "field_173550244")]
    safety_score: u32,
}

impl<'a> From<&'a SurveyRecord> for FormSubmission<'a> {
    fn from(record: &'a SurveyRecord) -> Self {
        let answers = &record.answers;
        let domains = &record.domains;
        Self {
            name: &record.name,
            result_date: &record.result_date,
            result_time: &record.result_time,
            mrn: &record.mrn,
            fin: &record.fin,
            dob: &record.dob,
            housing_security: answers.housing_security.as_deref(),
            housing_condition: &answers.housing_condition,
            food_security: answers.food_security.as_deref(),
            food_access: answers.food_access.as_deref(),
            healthcare_access: answers.healthcare_access.as_deref(),
            utility_security: answers.utility_security.as_deref(),
            childcare_access: answers.childcare_access.as_deref(),
            occupation_access: answers.occupation_access.as_deref(),
            education_access: answers.education_access.as_deref(),
            financial_security: answers.financial_security.as_deref(),
            physical_security: answers.physical_security.as_deref(),
            emotional_security: answers.emotional_security.as_deref(),
            safety_security: answers.safety_security.as_deref(),
            wellbeing_security: answers.wellbeing_security.as_deref(),
            legal_status: answers.legal_status.as_deref(),
            refuge_security: answers.refuge_security.as_deref(),
            military_service: answers.military_service.as_deref(),
            request_help: answers.request_help.as_deref(),
            sdoh_consent_program: answers.sdoh_consent_program.as_deref(),
            sdoh_consent_help: answers.sdoh_consent_help.as_deref(),
            domain_financial: domains.financial,
            domain_childcare: domains.childcare,
            domain_food: domains.food,
            domain_housing: domains.housing,
            domain_safety: domains.safety,
            domain_transport: domains.transport,
            domain_utility: domains.utility,
            domain_employment: domains.employment,
            domain_education: domains.education,
            domain_additional_factors: domains.additional_factors,
            safety_score: record.safety_score,
        }
    }
}

/// Only these statuses mean the form service stored the submission.
fn is_accepted(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::CREATED
}

#[async_trait]
impl SubmissionGateway for HttpSubmissionGateway {
    async fn submit(&self, record: &SurveyRecord) -> Result<Value, GatewayError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(header::ACCEPT, "application/json")
            .bearer_auth(&self.bearer_token)
            .json(&FormSubmission::from(record))
            .send()
            .await?;

        let status = response.status();
        if !is_accepted(status) {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let confirmation: Value = response.json().await?;
        info!(status = status.as_u16(), "Survey submission accepted");
        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};
    use serde_json::json;

    use super::*;
    use crate::session::{Identity, RecordIds};
    use crate::survey::SurveyAnswers;

    fn record(answers: &SurveyAnswers) -> SurveyRecord {
        let submitted_at = FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 4, 9, 7, 0)
            .unwrap();
        SurveyRecord::compose(
            Identity {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                dob: "1815-12-10".into(),
            },
            RecordIds {
                mrn: "M1".into(),
                fin: "F1".into(),
            },
            answers,
            submitted_at,
        )
    }

    #[test]
    fn form_body_uses_field_ids() {
        let answers = SurveyAnswers {
            participation: Some("I choose to participate".into()),
            housing_condition: vec!["Mold".into(), "Water leaks".into()],
            food_security: Some("Often true".into()),
            sdoh_consent_help: Some("I agree".into()),
            ..Default::default()
        };
        let record = record(&answers);

        let body = serde_json::to_value(FormSubmission::from(&record)).unwrap();

        assert_eq!(body["field_169568839"], json!({ "first": "Ada", "last": "Lovelace" }));
        assert_eq!(body["field_169568836"], "2026-03-04");
        assert_eq!(body["field_169568837"], "09:07");
        assert_eq!(body["field_169568834"], "M1");
        assert_eq!(body["field_169568835"], "F1");
        assert_eq!(body["field_169568840"], "1815-12-10");
        assert_eq!(body["field_169568842"], "Mold\nWater leaks");
        assert_eq!(body["field_169568843"], "Often true");
        assert_eq!(body["field_171471885"], "I agree");
        assert_eq!(body["field_173549893"], "POSITIVE");
        assert_eq!(body["field_173549892"], "POSITIVE");
        assert_eq!(body["field_173550269"], "negative");
        assert_eq!(body["field_173550244"], record.safety_score);
        // Unanswered questions are sent as explicit nulls.
        assert_eq!(body["field_169568845"], Value::Null);
        assert!(body.as_object().unwrap().contains_key("field_169568845"));
    }

    #[test]
    fn form_body_has_every_field_and_nothing_else() {
        let record = record(&SurveyAnswers::default());
        let body = serde_json::to_value(FormSubmission::from(&record)).unwrap();

        let mut keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        let mut expected = vec![
            "field_169568834", "field_169568835", "field_169568836", "field_169568837",
            "field_169568839", "field_169568840", "field_169568841", "field_169568842",
            "field_169568843", "field_169568844", "field_169568845", "field_169568846",
            "field_169568847", "field_169568848", "field_169568849", "field_169568850",
            "field_169568851", "field_169568852", "field_169568853", "field_169568854",
            "field_169568855", "field_171471885", "field_172501608", "field_173549876",
            "field_173549879", "field_173549880", "field_173549892", "field_173549893",
            "field_173550241", "field_173550244", "field_173550269", "field_174042542",
            "field_174042555", "field_174042557", "field_174042910", "field_174042914",
            "field_174042915",
        ];
        expected.sort_unstable();
        assert_eq!(keys, expected);
    }

    #[test]
    fn only_200_and_201_are_accepted() {
        assert!(is_accepted(StatusCode::OK));
        assert!(is_accepted(StatusCode::CREATED));
        assert!(!is_accepted(StatusCode::ACCEPTED));
        assert!(!is_accepted(StatusCode::BAD_REQUEST));
        assert!(!is_accepted(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn empty_bearer_token_is_rejected() {
        let url = Url::parse("https://forms.example.org/submission.json").unwrap();
        let result = HttpSubmissionGateway::new(url, "  ", Duration::from_secs(5));
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }
}
