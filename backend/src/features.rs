//! Feature encoding for the credit risk model.
//!
//! The model was trained on a single-row frame with the columns in
//! [`FEATURE_NAMES`]; both the names and their order are part of that contract.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::models::{ApplicantInput, HomeOwnership, LoanPurpose};

pub const FEATURE_COUNT: usize = 12;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "income",
    "employment_length",
    "loan_amount",
    "interest_rate",
    "credit_history_length",
    "home_ownership_own",
    "home_ownership_rent",
    "loan_purpose_education",
    "loan_purpose_home",
    "loan_purpose_medical",
    "loan_purpose_personal",
];

/// One encoded applicant, values aligned with [`FEATURE_NAMES`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    /// Row in model input precision.
    pub fn to_f32_row(&self) -> [f32; FEATURE_COUNT] {
        self.values.map(|v| v as f32)
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

fn indicator(hit: bool) -> f64 {
    if hit {
        1.0
    } else {
        0.0
    }
}

/// Builds the model row: numeric fields verbatim, then the one-hot groups.
pub fn encode(input: &ApplicantInput) -> FeatureVector {
    let own = input.home_ownership;
    let purpose = input.loan_purpose;

    FeatureVector {
        values: [
            f64::from(input.age),
            input.income,
            f64::from(input.employment_length),
            input.loan_amount,
            input.interest_rate,
            f64::from(input.credit_history_length),
            indicator(own == HomeOwnership::Own),
            indicator(own == HomeOwnership::Rent),
            indicator(purpose == LoanPurpose::Education),
            indicator(purpose == LoanPurpose::Home),
            indicator(purpose == LoanPurpose::Medical),
            indicator(purpose == LoanPurpose::Personal),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> ApplicantInput {
        ApplicantInput {
            age: 30,
            income: 500_000.0,
            employment_length: 5,
            loan_amount: 200_000.0,
            interest_rate: 12.0,
            credit_history_length: 8,
            home_ownership: HomeOwnership::Own,
            loan_purpose: LoanPurpose::Personal,
        }
    }

    #[test]
    fn encodes_exactly_the_schema_columns() {
        let encoded = encode(&scenario());
        let names: Vec<&str> = encoded.iter().map(|(name, _)| name).collect();
        assert_eq!(names, FEATURE_NAMES.to_vec());
    }

    #[test]
    fn one_indicator_per_group_for_every_category() {
        for own in HomeOwnership::ALL {
            for purpose in LoanPurpose::ALL {
                let input = ApplicantInput {
                    home_ownership: own,
                    loan_purpose: purpose,
                    ..scenario()
                };
                let encoded = encode(&input);

                let ownership: Vec<f64> = HomeOwnership::ALL
                    .iter()
                    .map(|o| encoded.get(&format!("home_ownership_{}", o.as_str())).unwrap())
                    .collect();
                assert_eq!(ownership.iter().sum::<f64>(), 1.0);
                let own_key = format!("home_ownership_{}", own.as_str());
                assert_eq!(encoded.get(&own_key), Some(1.0));

                let purposes: Vec<f64> = LoanPurpose::ALL
                    .iter()
                    .map(|p| encoded.get(&format!("loan_purpose_{}", p.as_str())).unwrap())
                    .collect();
                assert_eq!(purposes.iter().sum::<f64>(), 1.0);
                let purpose_key = format!("loan_purpose_{}", purpose.as_str());
                assert_eq!(encoded.get(&purpose_key), Some(1.0));
            }
        }
    }

    #[test]
    fn numeric_fields_pass_through() {
        let input = ApplicantInput {
            age: 57,
            income: 123_456.789,
            employment_length: 13,
            loan_amount: 4_999_999.99,
            interest_rate: 17.25,
            credit_history_length: 21,
            ..scenario()
        };
        let encoded = encode(&input);
        assert_eq!(encoded.get("age"), Some(57.0));
        assert_eq!(encoded.get("income"), Some(123_456.789));
        assert_eq!(encoded.get("employment_length"), Some(13.0));
        assert_eq!(encoded.get("loan_amount"), Some(4_999_999.99));
        assert_eq!(encoded.get("interest_rate"), Some(17.25));
        assert_eq!(encoded.get("credit_history_length"), Some(21.0));
    }

    #[test]
    fn reference_applicant_row() {
        let encoded = encode(&scenario());
        assert_eq!(
            encoded.values(),
            &[30.0, 500_000.0, 5.0, 200_000.0, 12.0, 8.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn unknown_feature_name_is_none() {
        assert_eq!(encode(&scenario()).get("home_ownership_mortgage"), None);
    }

    #[test]
    fn serializes_as_ordered_object() {
        let json = serde_json::to_string(&encode(&scenario())).unwrap();
        assert!(json.starts_with("{\"age\":30.0,\"income\":500000.0,"));
        assert!(json.ends_with("\"loan_purpose_personal\":1.0}"));
    }
}
