// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The composed record forwarded to the form service. The submission
//! gateway maps it onto the form's field ids.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::{
    assess, DomainFlags, SurveyAnswers, CONSENT_WITHHELD, DECLINED_ANSWER, HELP_NOT_REQUESTED,
};
use crate::session::{Identity, RecordIds};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantName {
    pub first: String,
    pub last: String,
}

/// Answers as they are recorded downstream: housing conditions joined into a
/// single text block, declined surveys carrying the sentinel everywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAnswers {
    pub housing_security: Option<String>,
    pub housing_condition: String,
    pub food_security: Option<String>,
    pub food_access: Option<String>,
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

impl RecordedAnswers {
    fn declined() -> Self {
        let declined = || Some(DECLINED_ANSWER.to_string());
        Self {
            housing_security: declined(),
            housing_condition: DECLINED_ANSWER.to_string(),
            food_security: declined(),
            food_access: declined(),
            healthcare_access: declined(),
            utility_security: declined(),
            childcare_access: declined(),
            occupation_access: declined(),
            education_access: declined(),
            financial_security: declined(),
            physical_security: declined(),
            emotional_security: declined(),
            safety_security: declined(),
            wellbeing_security: declined(),
            legal_status: declined(),
            refuge_security: declined(),
            military_service: declined(),
            request_help: Some(HELP_NOT_REQUESTED.to_string()),
            sdoh_consent_program: Some(CONSENT_WITHHELD.to_string()),
            sdoh_consent_help: Some(CONSENT_WITHHELD.to_string()),
        }
    }

    fn from_answers(answers: &SurveyAnswers) -> Self {
        Self {
            housing_security: answers.housing_security.clone(),
            housing_condition: answers.housing_condition.join("\n"),
            food_security: answers.food_security.clone(),
            food_access: answers.food_access.clone(),
            healthcare_access: answers.healthcare_access.clone(),
            utility_security: answers.utility_security.clone(),
            childcare_access: answers.childcare_access.clone(),
            occupation_access: answers.occupation_access.clone(),
            education_access: answers.education_access.clone(),
            financial_security: answers.financial_security.clone(),
            physical_security: answers.physical_security.clone(),
            emotional_security: answers.emotional_security.clone(),
            safety_security: answers.safety_security.clone(),
            wellbeing_security: answers.wellbeing_security.clone(),
            legal_status: answers.legal_status.clone(),
            refuge_security: answers.refuge_security.clone(),
            military_service: answers.military_service.clone(),
            request_help: answers.request_help.clone(),
            sdoh_consent_program: answers.sdoh_consent_program.clone(),
            sdoh_consent_help: answers.sdoh_consent_help.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyRecord {
    pub name: ParticipantName,
    pub dob: String,
    pub mrn: String,
    pub fin: String,
    /// `YYYY-MM-DD` in the reporting timezone.
    pub result_date: String,
    /// `HH:MM` in the reporting timezone.
    pub result_time: String,
    pub answers: RecordedAnswers,
    pub domains: DomainFlags,
    pub safety_score: u32,
}

impl SurveyRecord {
    pub fn compose(
        identity: Identity,
        ids: RecordIds,
        answers: &SurveyAnswers,
        submitted_at: DateTime<FixedOffset>,
    ) -> Self {
        let assessment = assess(answers);
        let recorded = if answers.declined() {
            RecordedAnswers::declined()
        } else {
            RecordedAnswers::from_answers(answers)
        };

        Self {
            name: ParticipantName {
                first: identity.first_name,
                last: identity.last_name,
            },
            dob: identity.dob,
            mrn: ids.mrn,
            fin: ids.fin,
            result_date: submitted_at.format("%Y-%m-%d").to_string(),
            result_time: submitted_at.format("%H:%M").to_string(),
            answers: recorded,
            domains: assessment.flags,
            safety_score: assessment.safety_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::{DomainFlag, DECLINE_PARTICIPATION};
    use chrono::TimeZone;

    fn identity() -> Identity {
        Identity {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            dob: "1815-12-10".into(),
        }
    }

    fn ids() -> RecordIds {
        RecordIds {
            mrn: "M1".into(),
            fin: "F1".into(),
        }
    }

    fn eastern_morning() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 4, 9, 7, 0)
            .unwrap()
    }

    #[test]
    fn compose_carries_identity_ids_and_timestamp() {
        let answers = SurveyAnswers {
            participation: Some("I choose to participate".into()),
            housing_condition: vec!["Mold".into(), "Water leaks".into()],
            childcare_access: Some("Yes".into()),
            ..Default::default()
        };

        let record = SurveyRecord::compose(identity(), ids(), &answers, eastern_morning());

        assert_eq!(record.name.first, "Ada");
        assert_eq!(record.mrn, "M1");
        assert_eq!(record.result_date, "2026-03-04");
        assert_eq!(record.result_time, "09:07");
        assert_eq!(record.answers.housing_condition, "Mold\nWater leaks");
        assert_eq!(record.answers.childcare_access.as_deref(), Some("Yes"));
        assert_eq!(record.domains.housing, DomainFlag::Positive);
        assert_eq!(record.domains.childcare, DomainFlag::Positive);
    }

    #[test]
    fn declined_survey_withholds_everything() {
        let answers = SurveyAnswers {
            participation: Some(DECLINE_PARTICIPATION.into()),
            food_security: Some("Often true".into()),
            sdoh_consent_program: Some("I agree".into()),
            ..Default::default()
        };

        let record = SurveyRecord::compose(identity(), ids(), &answers, eastern_morning());

        assert_eq!(record.answers.food_security.as_deref(), Some(DECLINED_ANSWER));
        assert_eq!(record.answers.housing_condition, DECLINED_ANSWER);
        assert_eq!(record.answers.request_help.as_deref(), Some("no"));
        assert_eq!(
            record.answers.sdoh_consent_program.as_deref(),
            Some(CONSENT_WITHHELD)
        );
        assert_eq!(record.domains.food, DomainFlag::Declined);
        assert_eq!(record.safety_score, 0);
    }
}
