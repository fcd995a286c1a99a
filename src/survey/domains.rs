// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Domain flag derivation.
//!
//! A pure function of the answers: no session state, no clock, no I/O.
//!
//! | Domain | Positive when |
//! |--------|---------------|
//! | financial | `financialSecurity` is Sometimes / Fairly often / Frequently |
//! | childcare | `childcareAccess` is Yes |
//! | food | `foodSecurity` or `foodAccess` is Sometimes true / Often true |
//! | housing | `housingSecurity` is Yes, or a concerning `housingCondition` is selected |
//! | safety | safety score > 10 |
//! | transport | `healthcareAccess` is Yes |
//! | utility | `utilitySecurity` is Yes / Already shut off |
//! | employment | `occupationAccess` is No |
//! | education | `educationAccess` is No |
//! | additional factors | legal or refugee concern, or a veteran |

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{SurveyAnswers, DECLINED_ANSWER};

const FREQUENT_TRUE: &[&str] = &["Sometimes true", "Often true"];
const FREQUENT: &[&str] = &["Sometimes", "Fairly often", "Frequently"];
const UTILITY_AT_RISK: &[&str] = &["Yes", "Already shut off"];
const VETERAN: &[&str] = &[
    "Veteran/Honorably discharged",
    "Veteran/Dishonorably discharged",
];

const CONCERNING_HOUSING_CONDITIONS: &[&str] = &[
    "Bug infestation",
    "Mold",
    "Lead paint or pipes",
    "Inadequate heat",
    "Oven or stove not working",
    "No or not working smoke detectors",
    "Water leaks",
];

/// Safety flag is raised strictly above this score.
pub const SAFETY_THRESHOLD: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DomainFlag {
    #[serde(rename = "POSITIVE")]
    Positive,
    #[serde(rename = "negative")]
    Negative,
    /// The participant declined the survey.
    #[serde(rename = "I choose not to answer")]
    Declined,
}

impl DomainFlag {
    fn from_bool(positive: bool) -> Self {
        if positive {
            DomainFlag::Positive
        } else {
            DomainFlag::Negative
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainFlags {
    pub financial: DomainFlag,
    pub childcare: DomainFlag,
    pub food: DomainFlag,
    pub housing: DomainFlag,
    pub safety: DomainFlag,
    pub transport: DomainFlag,
    pub utility: DomainFlag,
    pub employment: DomainFlag,
    pub education: DomainFlag,
    pub additional_factors: DomainFlag,
}

impl DomainFlags {
    fn all(flag: DomainFlag) -> Self {
        Self {
            financial: flag,
            childcare: flag,
            food: flag,
            housing: flag,
            safety: flag,
            transport: flag,
            utility: flag,
            employment: flag,
            education: flag,
            additional_factors: flag,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainAssessment {
    pub flags: DomainFlags,
    pub safety_score: u32,
}

/// Ordinal value of a frequency answer. Unknown or absent answers score 0.
pub fn answer_score(answer: Option<&str>) -> u32 {
    match answer {
        Some("Never") => 1,
        Some("Rarely") => 2,
        Some("Sometimes") => 3,
        Some("Fairly often") => 4,
        Some("Frequently") => 5,
        Some(DECLINED_ANSWER) => 0,
        _ => 0,
    }
}

/// Sum of the four personal-safety frequency answers.
pub fn safety_score(answers: &SurveyAnswers) -> u32 {
    [
        &answers.physical_security,
        &answers.emotional_security,
        &answers.safety_security,
        &answers.wellbeing_security,
    ]
    .into_iter()
    .map(|a| answer_score(a.as_deref()))
    .sum()
}

fn is_one_of(answer: &Option<String>, options: &[&str]) -> bool {
    answer.as_deref().is_some_and(|a| options.contains(&a))
}

fn is(answer: &Option<String>, expected: &str) -> bool {
    answer.as_deref() == Some(expected)
}

/// Derive the domain flags and safety score for a set of answers.
///
/// Declined participation short-circuits: no answer is read and every flag
/// is [`DomainFlag::Declined`].
pub fn assess(answers: &SurveyAnswers) -> DomainAssessment {
    if answers.declined() {
        return DomainAssessment {
            flags: DomainFlags::all(DomainFlag::Declined),
            safety_score: 0,
        };
    }

    let safety_score = safety_score(answers);
    let has_concerning_condition = answers
        .housing_condition
        .iter()
        .any(|c| CONCERNING_HOUSING_CONDITIONS.contains(&c.as_str()));

    let flags = DomainFlags {
        financial: DomainFlag::from_bool(is_one_of(&answers.financial_security, FREQUENT)),
        childcare: DomainFlag::from_bool(is(&answers.childcare_access, "Yes")),
        food: DomainFlag::from_bool(
            is_one_of(&answers.food_access, FREQUENT_TRUE)
                || is_one_of(&answers.food_security, FREQUENT_TRUE),
        ),
        housing: DomainFlag::from_bool(
            is(&answers.housing_security, "Yes") || has_concerning_condition,
        ),
        safety: DomainFlag::from_bool(safety_score > SAFETY_THRESHOLD),
        transport: DomainFlag::from_bool(is(&answers.healthcare_access, "Yes")),
        utility: DomainFlag::from_bool(is_one_of(&answers.utility_security, UTILITY_AT_RISK)),
        employment: DomainFlag::from_bool(is(&answers.occupation_access, "No")),
        education: DomainFlag::from_bool(is(&answers.education_access, "No")),
        additional_factors: DomainFlag::from_bool(
            is(&answers.legal_status, "Yes")
                || is(&answers.refuge_security, "Yes")
                || is_one_of(&answers.military_service, VETERAN),
        ),
    };

    DomainAssessment {
        flags,
        safety_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::DECLINE_PARTICIPATION;

    fn participating() -> SurveyAnswers {
        SurveyAnswers {
            participation: Some("I choose to participate".to_string()),
            ..Default::default()
        }
    }

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn food_and_childcare_positive_and_repeatable() {
        let answers = SurveyAnswers {
            food_security: some("Often true"),
            childcare_access: some("Yes"),
            ..participating()
        };

        let first = assess(&answers);
        assert_eq!(first.flags.food, DomainFlag::Positive);
        assert_eq!(first.flags.childcare, DomainFlag::Positive);
        assert_eq!(first.flags.housing, DomainFlag::Negative);
        assert_eq!(assess(&answers), first);
    }

    #[test]
    fn safety_score_example_is_positive() {
        let answers = SurveyAnswers {
            physical_security: some("Fairly often"),
            emotional_security: some("Frequently"),
            safety_security: some("Sometimes"),
            wellbeing_security: some("Never"),
            ..participating()
        };

        let assessment = assess(&answers);
        assert_eq!(assessment.safety_score, 13);
        assert_eq!(assessment.flags.safety, DomainFlag::Positive);
    }

    #[test]
    fn safety_score_of_exactly_ten_is_negative() {
        let answers = SurveyAnswers {
            physical_security: some("Fairly often"),
            emotional_security: some("Sometimes"),
            safety_security: some("Rarely"),
            wellbeing_security: some("Never"),
            ..participating()
        };

        let assessment = assess(&answers);
        assert_eq!(assessment.safety_score, 10);
        assert_eq!(assessment.flags.safety, DomainFlag::Negative);
    }

    #[test]
    fn unknown_and_declined_frequencies_score_zero() {
        assert_eq!(answer_score(Some(DECLINED_ANSWER)), 0);
        assert_eq!(answer_score(Some("Always")), 0);
        assert_eq!(answer_score(None), 0);
    }

    #[test]
    fn housing_flag_from_condition_list() {
        let answers = SurveyAnswers {
            housing_security: some("No"),
            housing_condition: vec!["None of the above".into(), "Water leaks".into()],
            ..participating()
        };
        assert_eq!(assess(&answers).flags.housing, DomainFlag::Positive);

        let answers = SurveyAnswers {
            housing_condition: vec!["None of the above".into()],
            ..participating()
        };
        assert_eq!(assess(&answers).flags.housing, DomainFlag::Negative);
    }

    #[test]
    fn predicate_table_covers_remaining_domains() {
        let answers = SurveyAnswers {
            financial_security: some("Sometimes"),
            healthcare_access: some("Yes"),
            utility_security: some("Already shut off"),
            occupation_access: some("No"),
            education_access: some("No"),
            military_service: some("Veteran/Dishonorably discharged"),
            ..participating()
        };
        let flags = assess(&answers).flags;
        assert_eq!(flags.financial, DomainFlag::Positive);
        assert_eq!(flags.transport, DomainFlag::Positive);
        assert_eq!(flags.utility, DomainFlag::Positive);
        assert_eq!(flags.employment, DomainFlag::Positive);
        assert_eq!(flags.education, DomainFlag::Positive);
        assert_eq!(flags.additional_factors, DomainFlag::Positive);
        assert_eq!(flags.food, DomainFlag::Negative);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let answers = SurveyAnswers {
            childcare_access: some("yes"),
            financial_security: some("rarely"),
            ..participating()
        };
        let flags = assess(&answers).flags;
        assert_eq!(flags.childcare, DomainFlag::Negative);
        assert_eq!(flags.financial, DomainFlag::Negative);
    }

    #[test]
    fn empty_answers_are_all_negative() {
        let assessment = assess(&SurveyAnswers::default());
        assert_eq!(assessment.flags, DomainFlags::all(DomainFlag::Negative));
        assert_eq!(assessment.safety_score, 0);
    }

    #[test]
    fn declined_forces_sentinel_and_ignores_answers() {
        let answers = SurveyAnswers {
            participation: some(DECLINE_PARTICIPATION),
            food_security: some("Often true"),
            physical_security: some("Frequently"),
            emotional_security: some("Frequently"),
            safety_security: some("Frequently"),
            ..Default::default()
        };

        let assessment = assess(&answers);
        assert_eq!(assessment.flags, DomainFlags::all(DomainFlag::Declined));
        assert_eq!(assessment.safety_score, 0);
    }

    #[test]
    fn flags_serialize_with_form_labels() {
        assert_eq!(
            serde_json::to_value(DomainFlag::Positive).unwrap(),
            serde_json::json!("POSITIVE")
        );
        assert_eq!(
            serde_json::to_value(DomainFlag::Negative).unwrap(),
            serde_json::json!("negative")
        );
        assert_eq!(
            serde_json::to_value(DomainFlag::Declined).unwrap(),
            serde_json::json!(DECLINED_ANSWER)
        );
    }
}
