//! Patient record service.
//!
//! Patients are listed and returned with their entries nested. The nested entries
//! are read-only: any `entries` key in a create or update body is ignored, and
//! entries are only ever changed through the entry service.

use super::{choice_filter, paginate, Listing, Paging};
use crate::config::CoreConfig;
use crate::error::{RecordError, RecordKind, RecordResult};
use crate::models::{GrowthCategory, Patient, PatientData, PatientRecord, Sex};
use crate::store::entries::{count_entries, entries_for_patients, EntryFilter};
use crate::store::patients::{self, PatientFilter, PatientSort};
use crate::store::{Database, SortOrder};
use crate::validation::{merge_patch, FieldErrors};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use utoipa::IntoParams;

const DUPLICATE_PATIENT_ID: &str = "patient with this patient id already exists.";

/// Query parameters accepted when listing patients.
#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientQuery {
    /// Case-insensitive substring of `patient_id` or `name`.
    pub search: Option<String>,
    /// Exact growth category (`AGA`, `SGA`, `LGA`).
    pub aga_sga_lga: Option<String>,
    /// Exact sex (`Male`, `Female`, `Ambiguous`).
    pub sex: Option<String>,
    /// `id`, `patient_id`, `name` or `dob`; prefix with `-` for descending.
    pub ordering: Option<String>,
    /// 1-based page number. Supplying `page` or `page_size` switches the
    /// response to a page envelope.
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl PatientQuery {
    fn filter(&self) -> Result<PatientFilter, FieldErrors> {
        let mut errors = FieldErrors::new();
        let growth =
            choice_filter::<GrowthCategory>(&mut errors, "aga_sga_lga", self.aga_sga_lga.as_deref());
        let sex = choice_filter::<Sex>(&mut errors, "sex", self.sex.as_deref());
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(PatientFilter {
            search: self.search.clone(),
            growth,
            sex,
        })
    }
}

/// CRUD operations over patients.
#[derive(Clone)]
pub struct PatientService {
    cfg: Arc<CoreConfig>,
    db: Database,
}

impl PatientService {
    pub fn new(cfg: Arc<CoreConfig>, db: Database) -> Self {
        Self { cfg, db }
    }

    /// Lists patients matching `query`, each with its entries.
    ///
    /// # Errors
    ///
    /// - `RecordError::Validation` if a choice filter names an unknown value
    /// - `RecordError::InvalidPage` if the requested page does not exist
    pub fn list(&self, query: &PatientQuery) -> RecordResult<Listing<PatientRecord>> {
        let filter = query.filter()?;
        let order = SortOrder::<PatientSort>::parse(query.ordering.as_deref());
        let paging = Paging::resolve(
            query.page.as_deref(),
            query.page_size.as_deref(),
            self.cfg.default_page_size(),
        )?;

        self.db.read(|conn| {
            paginate(
                paging,
                || Ok(patients::count_patients(conn, &filter)?),
                |window| {
                    let found = patients::list_patients(conn, &filter, order, window)?;
                    with_entries(conn, found)
                },
            )
        })
    }

    /// Creates a patient from a JSON body.
    ///
    /// # Errors
    ///
    /// `RecordError::Validation` if a field is missing or malformed, or if
    /// `patient_id` is already in use.
    pub fn create(&self, body: &Value) -> RecordResult<PatientRecord> {
        let data = PatientData::from_json(body)?;

        let patient = self.db.write(|tx| -> RecordResult<Patient> {
            ensure_patient_id_free(tx, &data, None)?;
            let id = patients::insert_patient(tx, &data)?;
            Ok(Patient { id, data })
        })?;

        tracing::info!(id = patient.id, "patient created");
        Ok(PatientRecord {
            patient,
            entries: Vec::new(),
        })
    }

    /// Returns one patient with its entries.
    ///
    /// # Errors
    ///
    /// `RecordError::NotFound` if no patient has internal id `id`.
    pub fn retrieve(&self, id: i64) -> RecordResult<PatientRecord> {
        self.db.read(|conn| -> RecordResult<PatientRecord> {
            let patient = patients::get_patient(conn, id)?.ok_or_else(|| not_found(id))?;
            let mut records = with_entries(conn, vec![patient])?;
            records.pop().ok_or_else(|| not_found(id))
        })
    }

    /// Full update. Required fields missing from `body` are errors, exactly as on
    /// create; an omitted optional field keeps its stored value and an explicit
    /// `null` clears it.
    pub fn update(&self, id: i64, body: &Value) -> RecordResult<PatientRecord> {
        self.save(id, body, false)
    }

    /// Changes only the fields present in `body`.
    pub fn partial_update(&self, id: i64, body: &Value) -> RecordResult<PatientRecord> {
        self.save(id, body, true)
    }

    fn save(&self, id: i64, body: &Value, partial: bool) -> RecordResult<PatientRecord> {
        let record = self.db.write(|tx| -> RecordResult<PatientRecord> {
            let existing = patients::get_patient(tx, id)?.ok_or_else(|| not_found(id))?;

            if !partial {
                PatientData::from_json(body)?;
            }
            let merged = merge_patch(serde_json::to_value(&existing.data)?, body)?;
            let data = PatientData::from_json(&merged)?;

            ensure_patient_id_free(tx, &data, Some(id))?;
            patients::update_patient(tx, id, &data)?;

            let mut records = with_entries(tx, vec![Patient { id, data }])?;
            records.pop().ok_or_else(|| not_found(id))
        })?;

        tracing::info!(id, partial, "patient updated");
        Ok(record)
    }

    /// Deletes a patient together with all of its entries.
    ///
    /// # Errors
    ///
    /// `RecordError::NotFound` if no patient has internal id `id`.
    pub fn delete(&self, id: i64) -> RecordResult<()> {
        let removed_entries = self.db.write(|tx| -> RecordResult<u64> {
            let owned = EntryFilter {
                patient: Some(id),
                ..EntryFilter::default()
            };
            let removed_entries = count_entries(tx, &owned)?;
            if !patients::delete_patient(tx, id)? {
                return Err(not_found(id));
            }
            Ok(removed_entries)
        })?;

        tracing::info!(id, removed_entries, "patient deleted");
        Ok(())
    }
}

fn not_found(id: i64) -> RecordError {
    RecordError::NotFound {
        kind: RecordKind::Patient,
        id,
    }
}

fn ensure_patient_id_free(
    conn: &Connection,
    data: &PatientData,
    exclude: Option<i64>,
) -> RecordResult<()> {
    if patients::patient_id_taken(conn, data.patient_id.as_str(), exclude)? {
        tracing::debug!(patient_id = %data.patient_id, "duplicate patient_id rejected");
        return Err(FieldErrors::single("patient_id", DUPLICATE_PATIENT_ID).into());
    }
    Ok(())
}

fn with_entries(conn: &Connection, found: Vec<Patient>) -> RecordResult<Vec<PatientRecord>> {
    let ids: Vec<i64> = found.iter().map(|p| p.id).collect();
    let mut entries = entries_for_patients(conn, &ids)?;
    Ok(found
        .into_iter()
        .map(|patient| PatientRecord {
            entries: entries.remove(&patient.id).unwrap_or_default(),
            patient,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::EntryService;
    use serde_json::json;

    fn services() -> (PatientService, EntryService) {
        let cfg = Arc::new(CoreConfig::default());
        let db = Database::open_in_memory().expect("in-memory database should open");
        (
            PatientService::new(cfg.clone(), db.clone()),
            EntryService::new(cfg, db),
        )
    }

    fn patient_body(patient_id: &str) -> Value {
        json!({
            "patient_id": patient_id,
            "name": "Baby of Meena",
            "ga": 29.5,
            "weight": 1100,
            "aga_sga_lga": "AGA",
            "sex": "Male",
            "dob": "2024-05-10",
            "tob": "22:15:00"
        })
    }

    #[test]
    fn test_create_then_retrieve_round_trips_fields() {
        let (patients, _) = services();
        let created = patients.create(&patient_body("NICU-7")).unwrap();
        let fetched = patients.retrieve(created.patient.id).unwrap();

        assert_eq!(fetched, created);
        let wire = serde_json::to_value(&fetched).unwrap();
        for (key, value) in patient_body("NICU-7").as_object().unwrap() {
            if key == "weight" {
                assert_eq!(wire[key], json!(1100.0));
            } else {
                assert_eq!(&wire[key], value, "{key} should round-trip");
            }
        }
    }

    #[test]
    fn test_create_rejects_duplicate_patient_id() {
        let (patients, _) = services();
        patients.create(&patient_body("NICU-7")).unwrap();
        let err = patients.create(&patient_body("NICU-7")).unwrap_err();
        match err {
            RecordError::Validation(errors) => assert_eq!(
                errors.get("patient_id"),
                Some(&[DUPLICATE_PATIENT_ID.to_string()][..])
            ),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_update_keeps_own_patient_id_and_ignores_nested_entries() {
        let (patients, entries) = services();
        let created = patients.create(&patient_body("NICU-7")).unwrap();
        let id = created.patient.id;
        entries
            .create(&json!({ "patient": id, "date": "2024-05-11", "cal": 60 }))
            .unwrap();

        let mut body = patient_body("NICU-7");
        body["name"] = json!("Aarav");
        body["entries"] = json!([]);
        let updated = patients.update(id, &body).unwrap();

        assert_eq!(updated.patient.data.name.as_str(), "Aarav");
        assert_eq!(updated.entries.len(), 1, "nested entries are read-only");
        assert_eq!(patients.retrieve(id).unwrap().entries.len(), 1);
    }

    #[test]
    fn test_update_rejects_patient_id_of_another_patient() {
        let (patients, _) = services();
        patients.create(&patient_body("NICU-1")).unwrap();
        let second = patients.create(&patient_body("NICU-2")).unwrap();
        let err = patients
            .update(second.patient.id, &patient_body("NICU-1"))
            .unwrap_err();
        assert!(matches!(err, RecordError::Validation(_)));
    }

    #[test]
    fn test_put_requires_required_fields_but_patch_does_not() {
        let (patients, _) = services();
        let id = patients.create(&patient_body("NICU-7")).unwrap().patient.id;

        let err = patients.update(id, &json!({ "weight": 1200 })).unwrap_err();
        assert!(matches!(err, RecordError::Validation(_)));

        let patched = patients
            .partial_update(id, &json!({ "weight": 1200, "tob": null }))
            .unwrap();
        assert_eq!(patched.patient.data.weight, 1200.0);
        assert_eq!(patched.patient.data.tob, None);
        assert_eq!(patched.patient.data.patient_id.as_str(), "NICU-7");
    }

    #[test]
    fn test_put_keeps_omitted_time_of_birth() {
        let (patients, _) = services();
        let id = patients.create(&patient_body("NICU-7")).unwrap().patient.id;

        let mut body = patient_body("NICU-7");
        body.as_object_mut().unwrap().remove("tob");
        body["name"] = json!("Aarav");
        let updated = patients.update(id, &body).unwrap();
        assert_eq!(updated.patient.data.name.as_str(), "Aarav");
        assert_eq!(
            updated.patient.data.tob.map(|t| t.to_string()).as_deref(),
            Some("22:15:00")
        );

        body["tob"] = Value::Null;
        let cleared = patients.update(id, &body).unwrap();
        assert_eq!(cleared.patient.data.tob, None);
        assert_eq!(patients.retrieve(id).unwrap().patient.data.tob, None);
    }

    #[test]
    fn test_missing_patient_is_not_found_before_validation() {
        let (patients, _) = services();
        assert!(matches!(
            patients.retrieve(42),
            Err(RecordError::NotFound { kind: RecordKind::Patient, id: 42 })
        ));
        assert!(matches!(
            patients.update(42, &json!({})),
            Err(RecordError::NotFound { .. })
        ));
        assert!(matches!(patients.delete(42), Err(RecordError::NotFound { .. })));
    }

    #[test]
    fn test_delete_cascades_to_entries() {
        let (patients, entries) = services();
        let id = patients.create(&patient_body("NICU-7")).unwrap().patient.id;
        let entry = entries
            .create(&json!({ "patient": id, "date": "2024-05-11" }))
            .unwrap();

        patients.delete(id).unwrap();

        assert!(matches!(
            entries.retrieve(entry.id),
            Err(RecordError::NotFound { .. })
        ));
    }

    #[test]
    fn test_list_searches_filters_and_pages() {
        let (patients, _) = services();
        for n in 1..=3 {
            patients.create(&patient_body(&format!("NICU-{n}"))).unwrap();
        }
        let mut girl = patient_body("NICU-9");
        girl["sex"] = json!("Female");
        girl["name"] = json!("Baby of Kavya");
        patients.create(&girl).unwrap();

        let all = patients.list(&PatientQuery::default()).unwrap();
        assert!(matches!(all, Listing::All(ref v) if v.len() == 4));

        let females = PatientQuery {
            sex: Some("Female".into()),
            ..PatientQuery::default()
        };
        assert_eq!(patients.list(&females).unwrap().records().len(), 1);

        let search = PatientQuery {
            search: Some("kavya".into()),
            ..PatientQuery::default()
        };
        assert_eq!(patients.list(&search).unwrap().records().len(), 1);

        let paged = PatientQuery {
            ordering: Some("-patient_id".into()),
            page: Some("1".into()),
            page_size: Some("3".into()),
            ..PatientQuery::default()
        };
        match patients.list(&paged).unwrap() {
            Listing::Page(page) => {
                assert_eq!(page.count, 4);
                assert_eq!(page.next, Some(2));
                assert_eq!(page.previous, None);
                assert_eq!(page.results[0].patient.data.patient_id.as_str(), "NICU-9");
            }
            other => panic!("expected a page, got {other:?}"),
        }
    }

    #[test]
    fn test_list_rejects_unknown_choice_filter() {
        let (patients, _) = services();
        let query = PatientQuery {
            aga_sga_lga: Some("XXL".into()),
            ..PatientQuery::default()
        };
        assert!(matches!(
            patients.list(&query),
            Err(RecordError::Validation(_))
        ));
    }
}
