//! Daily entry service.

use super::{choice_filter, paginate, Listing, Paging};
use crate::config::CoreConfig;
use crate::error::{RecordError, RecordKind, RecordResult};
use crate::models::{Entry, EntryData, ModeOfFeeding, TypeOfMilk};
use crate::store::entries::{self, EntryFilter, EntrySort};
use crate::store::patients::patient_exists;
use crate::store::{Database, SortOrder};
use crate::validation::{merge_patch, FieldErrors};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use utoipa::IntoParams;

const UNKNOWN_PATIENT_FILTER: &str =
    "Select a valid choice. That choice is not one of the available choices.";
const INVALID_DATE_FILTER: &str = "Enter a valid date.";

/// Query parameters accepted when listing entries.
#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EntryQuery {
    /// Internal id of the owning patient.
    pub patient: Option<String>,
    /// Exact entry date, `YYYY-MM-DD`.
    pub date: Option<String>,
    pub type_of_milk: Option<String>,
    pub mode_of_feeding: Option<String>,
    /// Case-insensitive substring of the patient's `patient_id` or `name`, or of
    /// the entry's `tfr` or `feeds`.
    pub search: Option<String>,
    /// `id`, `date` or `dol`; prefix with `-` for descending.
    pub ordering: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl EntryQuery {
    fn filter(&self, conn: &Connection) -> RecordResult<EntryFilter> {
        let mut errors = FieldErrors::new();

        let patient = match non_blank(self.patient.as_deref()) {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) if patient_exists(conn, id)? => Some(id),
                _ => {
                    errors.add("patient", UNKNOWN_PATIENT_FILTER);
                    None
                }
            },
        };
        let date = match non_blank(self.date.as_deref()) {
            None => None,
            Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.add("date", INVALID_DATE_FILTER);
                    None
                }
            },
        };
        let type_of_milk =
            choice_filter::<TypeOfMilk>(&mut errors, "type_of_milk", self.type_of_milk.as_deref());
        let mode_of_feeding = choice_filter::<ModeOfFeeding>(
            &mut errors,
            "mode_of_feeding",
            self.mode_of_feeding.as_deref(),
        );

        if !errors.is_empty() {
            return Err(errors.into());
        }
        Ok(EntryFilter {
            patient,
            date,
            type_of_milk,
            mode_of_feeding,
            search: self.search.clone(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// CRUD operations over daily entries.
#[derive(Clone)]
pub struct EntryService {
    cfg: Arc<CoreConfig>,
    db: Database,
}

impl EntryService {
    pub fn new(cfg: Arc<CoreConfig>, db: Database) -> Self {
        Self { cfg, db }
    }

    /// Lists entries matching `query`.
    ///
    /// # Errors
    ///
    /// - `RecordError::Validation` if a filter value is malformed or names an
    ///   unknown patient
    /// - `RecordError::InvalidPage` if the requested page does not exist
    pub fn list(&self, query: &EntryQuery) -> RecordResult<Listing<Entry>> {
        let order = SortOrder::<EntrySort>::parse(query.ordering.as_deref());
        let paging = Paging::resolve(
            query.page.as_deref(),
            query.page_size.as_deref(),
            self.cfg.default_page_size(),
        )?;

        self.db.read(|conn| {
            let filter = query.filter(conn)?;
            paginate(
                paging,
                || Ok(entries::count_entries(conn, &filter)?),
                |window| Ok(entries::list_entries(conn, &filter, order, window)?),
            )
        })
    }

    /// Creates an entry from a JSON body.
    ///
    /// # Errors
    ///
    /// `RecordError::Validation` if a field is malformed or `patient` does not
    /// name an existing patient.
    pub fn create(&self, body: &Value) -> RecordResult<Entry> {
        let data = EntryData::from_json(body)?;

        let entry = self.db.write(|tx| -> RecordResult<Entry> {
            ensure_patient_exists(tx, data.patient)?;
            let id = entries::insert_entry(tx, &data)?;
            Ok(Entry { id, data })
        })?;

        tracing::info!(id = entry.id, patient = entry.data.patient, "entry created");
        Ok(entry)
    }

    /// # Errors
    ///
    /// `RecordError::NotFound` if no entry has id `id`.
    pub fn retrieve(&self, id: i64) -> RecordResult<Entry> {
        self.db.read(|conn| -> RecordResult<Entry> {
            entries::get_entry(conn, id)?.ok_or_else(|| not_found(id))
        })
    }

    /// Full update. `patient` and `date` must be supplied; an omitted optional
    /// field keeps its stored value and an explicit `null` clears it.
    pub fn update(&self, id: i64, body: &Value) -> RecordResult<Entry> {
        self.save(id, body, false)
    }

    /// Changes only the fields present in `body`. A `null` clears an optional field.
    pub fn partial_update(&self, id: i64, body: &Value) -> RecordResult<Entry> {
        self.save(id, body, true)
    }

    fn save(&self, id: i64, body: &Value, partial: bool) -> RecordResult<Entry> {
        let entry = self.db.write(|tx| -> RecordResult<Entry> {
            let existing = entries::get_entry(tx, id)?.ok_or_else(|| not_found(id))?;

            if !partial {
                EntryData::from_json(body)?;
            }
            let merged = merge_patch(serde_json::to_value(&existing.data)?, body)?;
            let data = EntryData::from_json(&merged)?;

            ensure_patient_exists(tx, data.patient)?;
            entries::update_entry(tx, id, &data)?;
            Ok(Entry { id, data })
        })?;

        tracing::info!(id, partial, "entry updated");
        Ok(entry)
    }

    /// # Errors
    ///
    /// `RecordError::NotFound` if no entry has id `id`.
    pub fn delete(&self, id: i64) -> RecordResult<()> {
        let deleted = self.db.write(|tx| entries::delete_entry(tx, id))?;
        if !deleted {
            return Err(not_found(id));
        }
        tracing::info!(id, "entry deleted");
        Ok(())
    }
}

fn not_found(id: i64) -> RecordError {
    RecordError::NotFound {
        kind: RecordKind::Entry,
        id,
    }
}

fn ensure_patient_exists(conn: &Connection, patient: i64) -> RecordResult<()> {
    if !patient_exists(conn, patient)? {
        tracing::debug!(patient, "entry references unknown patient");
        return Err(FieldErrors::single(
            "patient",
            format!("Invalid pk \"{}\" - object does not exist.", patient),
        )
        .into());
    }
    Ok(())
}
