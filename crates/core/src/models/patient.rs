//! Patient records.
//!
//! A patient is identified externally by the hospital-assigned `patient_id` and
//! internally by the surrogate `id` used in URLs and as the entry foreign key.

use super::entry::Entry;
use super::Choice;
use crate::constants::{PATIENT_ID_MAX_CHARS, PATIENT_NAME_MAX_CHARS};
use crate::validation::{FieldErrors, FieldReader};
use chrono::{NaiveDate, NaiveTime};
use nicu_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Birth weight relative to gestational age.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum GrowthCategory {
    /// Appropriate for gestational age.
    #[serde(rename = "AGA")]
    Aga,
    /// Small for gestational age.
    #[serde(rename = "SGA")]
    Sga,
    /// Large for gestational age.
    #[serde(rename = "LGA")]
    Lga,
}

impl Choice for GrowthCategory {
    const ALL: &'static [Self] = &[Self::Aga, Self::Sga, Self::Lga];

    fn as_str(self) -> &'static str {
        match self {
            GrowthCategory::Aga => "AGA",
            GrowthCategory::Sga => "SGA",
            GrowthCategory::Lga => "LGA",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Sex {
    Male,
    Female,
    /// Ambiguous genitalia; sex not yet assigned.
    Ambiguous,
}

impl Choice for Sex {
    const ALL: &'static [Self] = &[Self::Male, Self::Female, Self::Ambiguous];

    fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
            Sex::Ambiguous => "Ambiguous",
        }
    }
}

/// Validated patient fields, as accepted on create and update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientData {
    /// Hospital-assigned identifier; unique across patients.
    #[schema(value_type = String, example = "NICU-2024-001")]
    pub patient_id: NonEmptyText,
    #[schema(value_type = String)]
    pub name: NonEmptyText,
    /// Gestational age at birth, in weeks.
    pub ga: f64,
    /// Birth weight, in grams.
    pub weight: f64,
    pub aga_sga_lga: GrowthCategory,
    pub sex: Sex,
    #[schema(value_type = String, format = Date)]
    pub dob: NaiveDate,
    #[schema(value_type = Option<String>, example = "14:35:00")]
    pub tob: Option<NaiveTime>,
}

impl PatientData {
    /// Builds patient fields from a JSON request body.
    ///
    /// Every field is checked before returning, so the error map lists all
    /// problems at once. Unknown keys (including read-only `id` and `entries`)
    /// are ignored.
    pub fn from_json(body: &Value) -> Result<Self, FieldErrors> {
        let mut reader = FieldReader::new(body)?;

        let patient_id = reader.required_text("patient_id", PATIENT_ID_MAX_CHARS);
        let name = reader.required_text("name", PATIENT_NAME_MAX_CHARS);
        let ga = reader.required_number("ga");
        let weight = reader.required_number("weight");
        let aga_sga_lga = reader.required_choice::<GrowthCategory>("aga_sga_lga");
        let sex = reader.required_choice::<Sex>("sex");
        let dob = reader.required_date("dob");
        let tob = reader.optional_time("tob");

        match (patient_id, name, ga, weight, aga_sga_lga, sex, dob) {
            (
                Some(patient_id),
                Some(name),
                Some(ga),
                Some(weight),
                Some(aga_sga_lga),
                Some(sex),
                Some(dob),
            ) if reader.is_clean() => Ok(Self {
                patient_id,
                name,
                ga,
                weight,
                aga_sga_lga,
                sex,
                dob,
                tob,
            }),
            _ => Err(reader.into_errors()),
        }
    }
}

/// A stored patient without its entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Patient {
    pub id: i64,
    #[serde(flatten)]
    pub data: PatientData,
}

/// Wire form of a patient: the stored fields plus its entries, nested read-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientRecord {
    #[serde(flatten)]
    pub patient: Patient,
    pub entries: Vec<Entry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_body() -> Value {
        json!({
            "patient_id": "NICU-001",
            "name": "Baby of Asha",
            "ga": 32.5,
            "weight": 1450,
            "aga_sga_lga": "SGA",
            "sex": "Female",
            "dob": "2024-03-01",
            "tob": "06:45"
        })
    }

    #[test]
    fn test_from_json_accepts_valid_body() {
        let data = PatientData::from_json(&valid_body()).expect("body should be valid");
        assert_eq!(data.patient_id.as_str(), "NICU-001");
        assert_eq!(data.weight, 1450.0);
        assert_eq!(data.aga_sga_lga, GrowthCategory::Sga);
        assert_eq!(data.tob, NaiveTime::from_hms_opt(6, 45, 0));
    }

    #[test]
    fn test_from_json_accepts_numeric_strings() {
        let mut body = valid_body();
        body["ga"] = json!("30");
        body["weight"] = json!(" 1200.5 ");
        let data = PatientData::from_json(&body).expect("numeric strings should parse");
        assert_eq!(data.ga, 30.0);
        assert_eq!(data.weight, 1200.5);
    }

    #[test]
    fn test_from_json_reports_every_missing_field() {
        let errors = PatientData::from_json(&json!({})).unwrap_err();
        for field in ["patient_id", "name", "ga", "weight", "aga_sga_lga", "sex", "dob"] {
            assert_eq!(
                errors.get(field),
                Some(&["This field is required.".to_string()][..]),
                "{field} should be required"
            );
        }
        assert!(errors.get("tob").is_none());
    }

    #[test]
    fn test_from_json_rejects_unknown_choice() {
        let mut body = valid_body();
        body["aga_sga_lga"] = json!("XGA");
        let errors = PatientData::from_json(&body).unwrap_err();
        assert_eq!(
            errors.get("aga_sga_lga"),
            Some(&["\"XGA\" is not a valid choice.".to_string()][..])
        );
    }

    #[test]
    fn test_from_json_ignores_read_only_keys() {
        let mut body = valid_body();
        body["id"] = json!(99);
        body["entries"] = json!([{ "date": "2024-03-02" }]);
        assert!(PatientData::from_json(&body).is_ok());
    }

    #[test]
    fn test_record_serialises_flat() {
        let data = PatientData::from_json(&valid_body()).unwrap();
        let record = PatientRecord {
            patient: Patient { id: 7, data },
            entries: vec![],
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], json!(7));
        assert_eq!(value["patient_id"], json!("NICU-001"));
        assert_eq!(value["dob"], json!("2024-03-01"));
        assert_eq!(value["tob"], json!("06:45:00"));
        assert_eq!(value["entries"], json!([]));
    }
}
