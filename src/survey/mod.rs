// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Survey Model
//!
//! Participant answers as submitted by the client, the domain flags derived
//! from them, and the composed record forwarded to the form service.
//!
//! Answers are free-form strings; the derivation in [`domains`] matches them
//! against the exact option labels shown on the form.

pub mod domains;
pub mod record;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use domains::{assess, DomainAssessment, DomainFlag, DomainFlags};
pub use record::SurveyRecord;

/// Participation answer that opts out of the whole survey.
pub const DECLINE_PARTICIPATION: &str = "I choose not to participate";

/// Value recorded for every answer of a participant who declined.
pub const DECLINED_ANSWER: &str = "I choose not to answer";

/// Consent value recorded for a participant who declined.
pub const CONSENT_WITHHELD: &str = "I do not agree";

/// Help-request value recorded for a participant who declined.
pub const HELP_NOT_REQUESTED: &str = "no";

/// Raw survey answers. Every field is optional; absent answers count as
/// "not indicated" for every domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct SurveyAnswers {
    /// `"I choose to participate"` or `"I choose not to participate"`.
    pub participation: Option<String>,
    pub housing_security: Option<String>,
    /// Problems with the current home, any number selected.
    pub housing_condition: Vec<String>,
    pub food_security: Option<String>,
    pub food_access: Option<String>,
    /// Whether lack of transportation kept the participant from care.
    pub healthcare_access: Option<String>,
    pub utility_security: Option<String>,
    pub childcare_access: Option<String>,
    pub occupation_access: Option<String>,
    pub education_access: Option<String>,
    pub financial_security: Option<String>,
    pub physical_security: Option<String>,
    pub emotional_security: Option<String>,
    pub safety_security: Option<String>,
    pub wellbeing_security: Option<String>,
    pub legal_status: Option<String>,
    pub refuge_security: Option<String>,
    pub military_service: Option<String>,
    pub request_help: Option<String>,
    pub sdoh_consent_program: Option<String>,
    pub sdoh_consent_help: Option<String>,
}

impl SurveyAnswers {
    pub fn declined(&self) -> bool {
        self.participation.as_deref() == Some(DECLINE_PARTICIPATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_deserialize_from_camel_case_with_defaults() {
        let answers: SurveyAnswers = serde_json::from_value(serde_json::json!({
            "participation": "I choose to participate",
            "foodSecurity": "Often true",
            "housingCondition": ["Mold"]
        }))
        .unwrap();

        assert_eq!(answers.food_security.as_deref(), Some("Often true"));
        assert_eq!(answers.housing_condition, vec!["Mold".to_string()]);
        assert!(answers.childcare_access.is_none());
        assert!(!answers.declined());
    }

    #[test]
    fn decline_is_detected_exactly() {
        let answers = SurveyAnswers {
            participation: Some(DECLINE_PARTICIPATION.to_string()),
            ..Default::default()
        };
        assert!(answers.declined());

        let answers = SurveyAnswers {
            participation: Some("i choose not to participate".to_string()),
            ..Default::default()
        };
        assert!(!answers.declined());
    }
}
