//! Entry database operations.

use std::collections::HashMap;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{
    contains_pattern, optional_choice_column, Conditions, DbResult, SortField, SortOrder, Window,
};
use crate::models::{Choice, Entry, EntryData, ModeOfFeeding, TypeOfMilk};
use chrono::NaiveDate;

const ENTRY_COLUMNS: &str = "e.id, e.patient_id, e.date, e.dol, e.pma, \
    e.kmc, e.cal, e.protein, e.weight, e.feeds, e.type_of_milk, e.hmf, \
    e.calcium, e.phosphorus, e.vit_d, e.iron, e.zinc, e.caffeine, \
    e.resp_support, e.desaturations, e.acute_events, e.piomi, \
    e.tfr, e.nns, e.gain_loss, e.early_intervention, e.mode_of_feeding";

/// Number of ids bound per `IN (...)` query when loading entries for many patients.
const PATIENT_BATCH: usize = 500;

/// Filters applied when listing entries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntryFilter {
    pub patient: Option<i64>,
    pub date: Option<NaiveDate>,
    pub type_of_milk: Option<TypeOfMilk>,
    pub mode_of_feeding: Option<ModeOfFeeding>,
    /// Case-insensitive substring of the owning patient's `patient_id`/`name`,
    /// or of the entry's `tfr`/`feeds`.
    pub search: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EntrySort {
    #[default]
    Id,
    Date,
    Dol,
}

impl SortField for EntrySort {
    fn from_param(name: &str) -> Option<Self> {
        match name {
            "id" => Some(EntrySort::Id),
            "date" => Some(EntrySort::Date),
            "dol" => Some(EntrySort::Dol),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            EntrySort::Id => "e.id",
            EntrySort::Date => "e.date",
            EntrySort::Dol => "e.dol",
        }
    }
}

/// Insert a new entry, returning its assigned `id`.
///
/// The caller is expected to have checked that `data.patient` exists; the
/// foreign key rejects the insert otherwise.
pub fn insert_entry(conn: &Connection, data: &EntryData) -> DbResult<i64> {
    conn.execute(
        r#"
        INSERT INTO entries (
            patient_id, date, dol, pma,
            kmc, cal, protein, weight, feeds, type_of_milk, hmf,
            calcium, phosphorus, vit_d, iron, zinc, caffeine,
            resp_support, desaturations, acute_events, piomi,
            tfr, nns, gain_loss, early_intervention, mode_of_feeding
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6, ?7, ?8, ?9, ?10, ?11,
            ?12, ?13, ?14, ?15, ?16, ?17,
            ?18, ?19, ?20, ?21,
            ?22, ?23, ?24, ?25, ?26
        )
        "#,
        params![
            data.patient,
            data.date,
            data.dol,
            data.pma,
            data.kmc,
            data.cal,
            data.protein,
            data.weight,
            data.feeds,
            data.type_of_milk.map(Choice::as_str),
            data.hmf,
            data.calcium,
            data.phosphorus,
            data.vit_d,
            data.iron,
            data.zinc,
            data.caffeine,
            data.resp_support,
            data.desaturations,
            data.acute_events,
            data.piomi,
            data.tfr,
            data.nns,
            data.gain_loss,
            data.early_intervention,
            data.mode_of_feeding.map(Choice::as_str),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Replace every field of an existing entry. Returns `false` if `id` does not exist.
pub fn update_entry(conn: &Connection, id: i64, data: &EntryData) -> DbResult<bool> {
    let rows_affected = conn.execute(
        r#"
        UPDATE entries SET
            patient_id = ?2, date = ?3, dol = ?4, pma = ?5,
            kmc = ?6, cal = ?7, protein = ?8, weight = ?9,
            feeds = ?10, type_of_milk = ?11, hmf = ?12,
            calcium = ?13, phosphorus = ?14, vit_d = ?15,
            iron = ?16, zinc = ?17, caffeine = ?18,
            resp_support = ?19, desaturations = ?20,
            acute_events = ?21, piomi = ?22,
            tfr = ?23, nns = ?24, gain_loss = ?25,
            early_intervention = ?26, mode_of_feeding = ?27,
            updated_at = datetime('now')
        WHERE id = ?1
        "#,
        params![
            id,
            data.patient,
            data.date,
            data.dol,
            data.pma,
            data.kmc,
            data.cal,
            data.protein,
            data.weight,
            data.feeds,
            data.type_of_milk.map(Choice::as_str),
            data.hmf,
            data.calcium,
            data.phosphorus,
            data.vit_d,
            data.iron,
            data.zinc,
            data.caffeine,
            data.resp_support,
            data.desaturations,
            data.acute_events,
            data.piomi,
            data.tfr,
            data.nns,
            data.gain_loss,
            data.early_intervention,
            data.mode_of_feeding.map(Choice::as_str),
        ],
    )?;
    Ok(rows_affected > 0)
}

/// Get an entry by id.
pub fn get_entry(conn: &Connection, id: i64) -> DbResult<Option<Entry>> {
    let sql = format!("SELECT {} FROM entries e WHERE e.id = ?", ENTRY_COLUMNS);
    Ok(conn.query_row(&sql, [id], entry_from_row).optional()?)
}

pub fn delete_entry(conn: &Connection, id: i64) -> DbResult<bool> {
    let rows_affected = conn.execute("DELETE FROM entries WHERE id = ?", [id])?;
    Ok(rows_affected > 0)
}

pub fn count_entries(conn: &Connection, filter: &EntryFilter) -> DbResult<u64> {
    let conditions = conditions(filter);
    let sql = format!(
        "SELECT COUNT(*) FROM entries e JOIN patients p ON p.id = e.patient_id{}",
        conditions.sql()
    );
    let count: i64 = conn.query_row(&sql, params_from_iter(conditions.params.iter()), |row| {
        row.get(0)
    })?;
    Ok(u64::try_from(count).unwrap_or_default())
}

pub fn list_entries(
    conn: &Connection,
    filter: &EntryFilter,
    order: SortOrder<EntrySort>,
    window: Option<Window>,
) -> DbResult<Vec<Entry>> {
    let conditions = conditions(filter);
    let sql = format!(
        "SELECT {} FROM entries e JOIN patients p ON p.id = e.patient_id{}{}{}",
        ENTRY_COLUMNS,
        conditions.sql(),
        order.sql("e.id"),
        Window::sql(window)
    );
    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map(params_from_iter(conditions.params.iter()), entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// Loads the entries of each listed patient, keyed by patient id, in chart order
/// (by date, then by id).
///
/// Patients without entries are absent from the map.
pub fn entries_for_patients(
    conn: &Connection,
    patient_ids: &[i64],
) -> DbResult<HashMap<i64, Vec<Entry>>> {
    let mut by_patient: HashMap<i64, Vec<Entry>> = HashMap::new();
    for batch in patient_ids.chunks(PATIENT_BATCH) {
        let placeholders = vec!["?"; batch.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM entries e WHERE e.patient_id IN ({}) ORDER BY e.date, e.id",
            ENTRY_COLUMNS, placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(batch.iter()), entry_from_row)?;
        for entry in rows {
            let entry = entry?;
            by_patient.entry(entry.data.patient).or_default().push(entry);
        }
    }
    Ok(by_patient)
}

fn conditions(filter: &EntryFilter) -> Conditions {
    let mut conditions = Conditions::default();
    if let Some(patient) = filter.patient {
        conditions.push("e.patient_id = ?", [SqlValue::Integer(patient)]);
    }
    if let Some(date) = filter.date {
        conditions.push(
            "e.date = ?",
            [SqlValue::Text(date.format("%Y-%m-%d").to_string())],
        );
    }
    if let Some(milk) = filter.type_of_milk {
        conditions.push(
            "e.type_of_milk = ?",
            [SqlValue::Text(milk.as_str().to_string())],
        );
    }
    if let Some(mode) = filter.mode_of_feeding {
        conditions.push(
            "e.mode_of_feeding = ?",
            [SqlValue::Text(mode.as_str().to_string())],
        );
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = contains_pattern(term);
        conditions.push(
            r"(p.patient_id LIKE ? ESCAPE '\' OR p.name LIKE ? ESCAPE '\'
               OR e.tfr LIKE ? ESCAPE '\' OR e.feeds LIKE ? ESCAPE '\')",
            [pattern.clone(), pattern.clone(), pattern.clone(), pattern],
        );
    }
    conditions
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        data: EntryData {
            patient: row.get(1)?,
            date: row.get(2)?,
            dol: row.get(3)?,
            pma: row.get(4)?,
            kmc: row.get(5)?,
            cal: row.get(6)?,
            protein: row.get(7)?,
            weight: row.get(8)?,
            feeds: row.get(9)?,
            type_of_milk: optional_choice_column(row, 10)?,
            hmf: row.get(11)?,
            calcium: row.get(12)?,
            phosphorus: row.get(13)?,
            vit_d: row.get(14)?,
            iron: row.get(15)?,
            zinc: row.get(16)?,
            caffeine: row.get(17)?,
            resp_support: row.get(18)?,
            desaturations: row.get(19)?,
            acute_events: row.get(20)?,
            piomi: row.get(21)?,
            tfr: row.get(22)?,
            nns: row.get(23)?,
            gain_loss: row.get(24)?,
            early_intervention: row.get(25)?,
            mode_of_feeding: optional_choice_column(row, 26)?,
        },
    })
}
