//! Daily clinical entries.
//!
//! One entry records a patient's nutrition, supplements and clinical status for a
//! single day. Most fields are free text as charted on the ward; only the fields
//! that are plotted or summed (`kmc`, `cal`, `protein`, `weight`, `dol`, `pma`) are
//! numeric.

use super::Choice;
use crate::constants::ENTRY_TEXT_MAX_CHARS;
use crate::validation::{FieldErrors, FieldReader};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TypeOfMilk {
    /// Mother's own milk.
    #[serde(rename = "MOM")]
    Mom,
    /// Donor human milk.
    #[serde(rename = "DHM")]
    Dhm,
    /// Formula feed.
    #[serde(rename = "FF")]
    Ff,
    #[serde(rename = "MIXED")]
    Mixed,
}

impl Choice for TypeOfMilk {
    const ALL: &'static [Self] = &[Self::Mom, Self::Dhm, Self::Ff, Self::Mixed];

    fn as_str(self) -> &'static str {
        match self {
            TypeOfMilk::Mom => "MOM",
            TypeOfMilk::Dhm => "DHM",
            TypeOfMilk::Ff => "FF",
            TypeOfMilk::Mixed => "MIXED",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ModeOfFeeding {
    /// Nil per os.
    #[serde(rename = "NPO")]
    Npo,
    /// Orogastric tube.
    #[serde(rename = "OG")]
    Og,
    /// Nasogastric tube.
    #[serde(rename = "NG")]
    Ng,
    #[serde(rename = "PALADAI")]
    Paladai,
    #[serde(rename = "SPOON")]
    Spoon,
    #[serde(rename = "BREAST")]
    Breast,
    #[serde(rename = "BOTTLE")]
    Bottle,
    #[serde(rename = "MIXED")]
    Mixed,
}

impl Choice for ModeOfFeeding {
    const ALL: &'static [Self] = &[
        Self::Npo,
        Self::Og,
        Self::Ng,
        Self::Paladai,
        Self::Spoon,
        Self::Breast,
        Self::Bottle,
        Self::Mixed,
    ];

    fn as_str(self) -> &'static str {
        match self {
            ModeOfFeeding::Npo => "NPO",
            ModeOfFeeding::Og => "OG",
            ModeOfFeeding::Ng => "NG",
            ModeOfFeeding::Paladai => "PALADAI",
            ModeOfFeeding::Spoon => "SPOON",
            ModeOfFeeding::Breast => "BREAST",
            ModeOfFeeding::Bottle => "BOTTLE",
            ModeOfFeeding::Mixed => "MIXED",
        }
    }
}

/// Validated entry fields, as accepted on create and update.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EntryData {
    /// Internal `id` of the owning patient.
    pub patient: i64,

    // Basic
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    /// Day of life.
    pub dol: Option<i64>,
    /// Post-menstrual age, in weeks.
    pub pma: Option<f64>,

    // Nutrition
    pub kmc: Option<f64>,
    pub cal: Option<f64>,
    pub protein: Option<f64>,
    pub weight: Option<f64>,
    pub feeds: Option<String>,
    pub type_of_milk: Option<TypeOfMilk>,
    pub hmf: Option<String>,

    // Supplements
    pub calcium: Option<String>,
    pub phosphorus: Option<String>,
    pub vit_d: Option<String>,
    pub iron: Option<String>,
    pub zinc: Option<String>,
    pub caffeine: Option<String>,

    // Clinical status
    pub resp_support: Option<String>,
    pub desaturations: Option<String>,
    pub acute_events: Option<String>,
    pub piomi: Option<String>,

    // Other
    pub tfr: Option<String>,
    pub nns: Option<String>,
    pub gain_loss: Option<String>,
    pub early_intervention: Option<String>,
    pub mode_of_feeding: Option<ModeOfFeeding>,
}

impl EntryData {
    /// Builds entry fields from a JSON request body.
    ///
    /// Only the shape of `patient` is checked here; whether it names an existing
    /// patient is a storage question answered by the entry service.
    pub fn from_json(body: &Value) -> Result<Self, FieldErrors> {
        let mut r = FieldReader::new(body)?;
        let max = ENTRY_TEXT_MAX_CHARS;

        let patient = r.required_pk("patient");
        let date = r.required_date("date");

        // Optional fields are read even when a required one failed so that the
        // caller sees every error in one response.
        let entry = Self {
            patient: patient.unwrap_or_default(),
            date: date.unwrap_or_default(),
            dol: r.optional_integer("dol"),
            pma: r.optional_number("pma"),
            kmc: r.optional_number("kmc"),
            cal: r.optional_number("cal"),
            protein: r.optional_number("protein"),
            weight: r.optional_number("weight"),
            feeds: r.optional_text("feeds", max),
            type_of_milk: r.optional_choice("type_of_milk"),
            hmf: r.optional_text("hmf", max),
            calcium: r.optional_text("calcium", max),
            phosphorus: r.optional_text("phosphorus", max),
            vit_d: r.optional_text("vit_d", max),
            iron: r.optional_text("iron", max),
            zinc: r.optional_text("zinc", max),
            caffeine: r.optional_text("caffeine", max),
            resp_support: r.optional_text("resp_support", max),
            desaturations: r.optional_text("desaturations", max),
            acute_events: r.optional_text("acute_events", max),
            piomi: r.optional_text("piomi", max),
            tfr: r.optional_text("tfr", max),
            nns: r.optional_text("nns", max),
            gain_loss: r.optional_text("gain_loss", max),
            early_intervention: r.optional_text("early_intervention", max),
            mode_of_feeding: r.optional_choice("mode_of_feeding"),
        };

        if patient.is_some() && date.is_some() && r.is_clean() {
            Ok(entry)
        } else {
            Err(r.into_errors())
        }
    }
}

/// A stored entry. This is also its wire form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Entry {
    pub id: i64,
    #[serde(flatten)]
    pub data: EntryData,
}
