use serde::{Deserialize, Deserializer, Serialize};

use crate::features::{FeatureVector, FEATURE_NAMES};
use crate::inference::Assessment;
use crate::risk::{RiskTier, HIGH_RISK_THRESHOLD, MEDIUM_RISK_THRESHOLD};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HomeOwnership {
    Own,
    Rent,
}

impl HomeOwnership {
    pub const ALL: [HomeOwnership; 2] = [HomeOwnership::Own, HomeOwnership::Rent];

    pub fn as_str(&self) -> &'static str {
        match self {
            HomeOwnership::Own => "own",
            HomeOwnership::Rent => "rent",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoanPurpose {
    Education,
    Home,
    Medical,
    Personal,
}

impl LoanPurpose {
    pub const ALL: [LoanPurpose; 4] = [
        LoanPurpose::Education,
        LoanPurpose::Home,
        LoanPurpose::Medical,
        LoanPurpose::Personal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanPurpose::Education => "education",
            LoanPurpose::Home => "home",
            LoanPurpose::Medical => "medical",
            LoanPurpose::Personal => "personal",
        }
    }
}

pub const AGE_RANGE: (u32, u32) = (18, 100);
pub const INCOME_RANGE: (f64, f64) = (0.0, 10_000_000.0);
pub const EMPLOYMENT_LENGTH_RANGE: (u32, u32) = (0, 50);
pub const LOAN_AMOUNT_RANGE: (f64, f64) = (0.0, 5_000_000.0);
pub const INTEREST_RATE_RANGE: (f64, f64) = (0.0, 40.0);
pub const CREDIT_HISTORY_RANGE: (u32, u32) = (0, 50);

/// Raw applicant attributes as entered on the form.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ApplicantInput {
    #[serde(deserialize_with = "whole_number")]
    pub age: u32,
    pub income: f64,
    #[serde(deserialize_with = "whole_number")]
    pub employment_length: u32,
    pub loan_amount: f64,
    /// Annual rate in percent.
    pub interest_rate: f64,
    #[serde(deserialize_with = "whole_number")]
    pub credit_history_length: u32,
    pub home_ownership: HomeOwnership,
    pub loan_purpose: LoanPurpose,
}

impl Default for ApplicantInput {
    fn default() -> Self {
        ApplicantInput {
            age: 30,
            income: 500_000.0,
            employment_length: 5,
            loan_amount: 200_000.0,
            interest_rate: 12.0,
            credit_history_length: 8,
            home_ownership: HomeOwnership::Own,
            loan_purpose: LoanPurpose::Education,
        }
    }
}

impl ApplicantInput {
    /// Clamps every numeric field into its form domain. Non-finite amounts
    /// collapse to the lower bound.
    pub fn clamped(&self) -> Self {
        ApplicantInput {
            age: self.age.clamp(AGE_RANGE.0, AGE_RANGE.1),
            income: clamp_real(self.income, INCOME_RANGE),
            employment_length: self
                .employment_length
                .clamp(EMPLOYMENT_LENGTH_RANGE.0, EMPLOYMENT_LENGTH_RANGE.1),
            loan_amount: clamp_real(self.loan_amount, LOAN_AMOUNT_RANGE),
            interest_rate: clamp_real(self.interest_rate, INTEREST_RATE_RANGE),
            credit_history_length: self
                .credit_history_length
                .clamp(CREDIT_HISTORY_RANGE.0, CREDIT_HISTORY_RANGE.1),
            home_ownership: self.home_ownership,
            loan_purpose: self.loan_purpose,
        }
    }
}

/// Years and ages arrive as any JSON number: rounded, then saturated into
/// `u32` so that `clamped()` gets to see negative or oversized values.
fn whole_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(clamp_real(value.round(), (0.0, f64::from(u32::MAX))) as u32)
}

fn clamp_real(value: f64, (min, max): (f64, f64)) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        min
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct PredictionResult {
    /// Probability of the default class.
    pub probability: f64,
    pub probability_percent: String,
    pub tier: RiskTier,
    pub message: String,
    pub features: FeatureVector,
    pub model_version: String,
    pub timestamp: String,
}

impl PredictionResult {
    pub fn new(assessment: Assessment, model_version: &str) -> Self {
        let probability = assessment.probability.value();
        PredictionResult {
            probability,
            probability_percent: format_percent(probability),
            tier: assessment.tier,
            message: assessment.tier.message().to_string(),
            features: assessment.features,
            model_version: model_version.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Renders `0.375` as `"37.50%"`.
pub fn format_percent(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Thresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            high: HIGH_RISK_THRESHOLD,
            medium: MEDIUM_RISK_THRESHOLD,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ModelInfo {
    pub kind: String,
    pub version: String,
    pub artifact: String,
    pub features: Vec<String>,
    pub thresholds: Thresholds,
}

impl ModelInfo {
    pub fn new(kind: &str, version: &str, artifact: &str) -> Self {
        ModelInfo {
            kind: kind.to_string(),
            version: version.to_string(),
            artifact: artifact.to_string(),
            features: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            thresholds: Thresholds::default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: String,
    pub execution_time_ms: Option<u64>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            execution_time_ms: None,
        }
    }

    pub fn error(message: &str) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
            execution_time_ms: None,
        }
    }

    pub fn timed(mut self, start: std::time::Instant) -> Self {
        self.execution_time_ms = Some(start.elapsed().as_millis() as u64);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_domain_input_is_unchanged_by_clamping() {
        let input = ApplicantInput::default();
        assert_eq!(input.clamped(), input);
    }

    #[test]
    fn out_of_domain_fields_are_clamped() {
        let input = ApplicantInput {
            age: 7,
            income: -10.0,
            employment_length: 80,
            loan_amount: 9_000_000.0,
            interest_rate: f64::NAN,
            credit_history_length: 51,
            ..ApplicantInput::default()
        };
        let clamped = input.clamped();
        assert_eq!(clamped.age, 18);
        assert_eq!(clamped.income, 0.0);
        assert_eq!(clamped.employment_length, 50);
        assert_eq!(clamped.loan_amount, 5_000_000.0);
        assert_eq!(clamped.interest_rate, 0.0);
        assert_eq!(clamped.credit_history_length, 50);
    }

    #[test]
    fn categorical_values_use_lowercase_names() {
        let input: ApplicantInput = serde_json::from_value(serde_json::json!({
            "age": 40,
            "income": 1000.0,
            "employment_length": 2,
            "loan_amount": 500.0,
            "interest_rate": 7.5,
            "credit_history_length": 3,
            "home_ownership": "rent",
            "loan_purpose": "medical"
        }))
        .unwrap();
        assert_eq!(input.home_ownership, HomeOwnership::Rent);
        assert_eq!(input.loan_purpose, LoanPurpose::Medical);
    }

    #[test]
    fn whole_number_fields_accept_any_number() {
        let input: ApplicantInput = serde_json::from_value(serde_json::json!({
            "age": -5,
            "income": 1000.0,
            "employment_length": 4.6,
            "loan_amount": 500.0,
            "interest_rate": 7.5,
            "credit_history_length": 1e12,
            "home_ownership": "own",
            "loan_purpose": "home"
        }))
        .unwrap();
        assert_eq!(input.age, 0);
        assert_eq!(input.employment_length, 5);
        assert_eq!(input.credit_history_length, u32::MAX);

        let clamped = input.clamped();
        assert_eq!(clamped.age, 18);
        assert_eq!(clamped.employment_length, 5);
        assert_eq!(clamped.credit_history_length, 50);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let parsed = serde_json::from_value::<ApplicantInput>(serde_json::json!({
            "age": 40,
            "income": 1000.0,
            "employment_length": 2,
            "loan_amount": 500.0,
            "interest_rate": 7.5,
            "credit_history_length": 3,
            "home_ownership": "mortgage",
            "loan_purpose": "medical"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn percent_has_two_decimals() {
        assert_eq!(format_percent(0.375), "37.50%");
        assert_eq!(format_percent(1.0), "100.00%");
        assert_eq!(format_percent(0.0), "0.00%");
    }
}
