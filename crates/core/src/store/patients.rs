//! Patient database operations.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{
    choice_column, contains_pattern, text_column, Conditions, DbResult, SortField, SortOrder,
    Window,
};
use crate::models::{Choice, GrowthCategory, Patient, PatientData, Sex};

const PATIENT_COLUMNS: &str = "id, patient_id, name, ga, weight, aga_sga_lga, sex, dob, tob";

/// Filters applied when listing patients.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatientFilter {
    /// Case-insensitive substring of `patient_id` or `name`.
    pub search: Option<String>,
    pub growth: Option<GrowthCategory>,
    pub sex: Option<Sex>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PatientSort {
    #[default]
    Id,
    PatientId,
    Name,
    Dob,
}

impl SortField for PatientSort {
    fn from_param(name: &str) -> Option<Self> {
        match name {
            "id" => Some(PatientSort::Id),
            "patient_id" => Some(PatientSort::PatientId),
            "name" => Some(PatientSort::Name),
            "dob" => Some(PatientSort::Dob),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            PatientSort::Id => "id",
            PatientSort::PatientId => "patient_id",
            PatientSort::Name => "name",
            PatientSort::Dob => "dob",
        }
    }
}

/// Insert a new patient, returning its assigned `id`.
pub fn insert_patient(conn: &Connection, data: &PatientData) -> DbResult<i64> {
    conn.execute(
        r#"
        INSERT INTO patients (
            patient_id, name, ga, weight, aga_sga_lga, sex, dob, tob
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            data.patient_id.as_str(),
            data.name.as_str(),
            data.ga,
            data.weight,
            data.aga_sga_lga.as_str(),
            data.sex.as_str(),
            data.dob,
            data.tob,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Replace every field of an existing patient. Returns `false` if `id` does not exist.
pub fn update_patient(conn: &Connection, id: i64, data: &PatientData) -> DbResult<bool> {
    let rows_affected = conn.execute(
        r#"
        UPDATE patients SET
            patient_id = ?2,
            name = ?3,
            ga = ?4,
            weight = ?5,
            aga_sga_lga = ?6,
            sex = ?7,
            dob = ?8,
            tob = ?9,
            updated_at = datetime('now')
        WHERE id = ?1
        "#,
        params![
            id,
            data.patient_id.as_str(),
            data.name.as_str(),
            data.ga,
            data.weight,
            data.aga_sga_lga.as_str(),
            data.sex.as_str(),
            data.dob,
            data.tob,
        ],
    )?;
    Ok(rows_affected > 0)
}

/// Get a patient by internal id.
pub fn get_patient(conn: &Connection, id: i64) -> DbResult<Option<Patient>> {
    let sql = format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS);
    Ok(conn.query_row(&sql, [id], patient_from_row).optional()?)
}

pub fn patient_exists(conn: &Connection, id: i64) -> DbResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM patients WHERE id = ?", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Whether another patient already holds `patient_id`.
///
/// `exclude` skips the patient being updated so that saving a record unchanged
/// does not collide with itself.
pub fn patient_id_taken(
    conn: &Connection,
    patient_id: &str,
    exclude: Option<i64>,
) -> DbResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM patients WHERE patient_id = ?1 AND (?2 IS NULL OR id != ?2)",
            params![patient_id, exclude],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Delete a patient. Entries go with it (`ON DELETE CASCADE`).
pub fn delete_patient(conn: &Connection, id: i64) -> DbResult<bool> {
    let rows_affected = conn.execute("DELETE FROM patients WHERE id = ?", [id])?;
    Ok(rows_affected > 0)
}

pub fn count_patients(conn: &Connection, filter: &PatientFilter) -> DbResult<u64> {
    let conditions = conditions(filter);
    let sql = format!("SELECT COUNT(*) FROM patients{}", conditions.sql());
    let count: i64 = conn.query_row(&sql, params_from_iter(conditions.params.iter()), |row| {
        row.get(0)
    })?;
    Ok(u64::try_from(count).unwrap_or_default())
}

pub fn list_patients(
    conn: &Connection,
    filter: &PatientFilter,
    order: SortOrder<PatientSort>,
    window: Option<Window>,
) -> DbResult<Vec<Patient>> {
    let conditions = conditions(filter);
    let sql = format!(
        "SELECT {} FROM patients{}{}{}",
        PATIENT_COLUMNS,
        conditions.sql(),
        order.sql("id"),
        Window::sql(window)
    );
    let mut stmt = conn.prepare(&sql)?;
    let patients = stmt
        .query_map(params_from_iter(conditions.params.iter()), patient_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(patients)
}

fn conditions(filter: &PatientFilter) -> Conditions {
    let mut conditions = Conditions::default();
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = contains_pattern(term);
        conditions.push(
            r"(patient_id LIKE ? ESCAPE '\' OR name LIKE ? ESCAPE '\')",
            [pattern.clone(), pattern],
        );
    }
    if let Some(growth) = filter.growth {
        conditions.push(
            "aga_sga_lga = ?",
            [SqlValue::Text(growth.as_str().to_string())],
        );
    }
    if let Some(sex) = filter.sex {
        conditions.push("sex = ?", [SqlValue::Text(sex.as_str().to_string())]);
    }
    conditions
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        data: PatientData {
            patient_id: text_column(row, 1)?,
            name: text_column(row, 2)?,
            ga: row.get(3)?,
            weight: row.get(4)?,
            aga_sga_lga: choice_column(row, 5)?,
            sex: choice_column(row, 6)?,
            dob: row.get(7)?,
            tob: row.get(8)?,
        },
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::Database;
    use chrono::{NaiveDate, NaiveTime};
    use nicu_types::NonEmptyText;

    pub(crate) fn sample_patient(patient_id: &str, name: &str) -> PatientData {
        PatientData {
            patient_id: NonEmptyText::new(patient_id).unwrap(),
            name: NonEmptyText::new(name).unwrap(),
            ga: 31.0,
            weight: 1380.0,
            aga_sga_lga: GrowthCategory::Aga,
            sex: Sex::Male,
            dob: NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(),
            tob: NaiveTime::from_hms_opt(3, 20, 0),
        }
    }

    #[test]
    fn test_insert_and_get_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let data = sample_patient("P-1", "Baby Rao");
        let fetched = db
            .write(|tx| -> DbResult<Option<Patient>> {
                let id = insert_patient(tx, &data)?;
                get_patient(tx, id)
            })
            .unwrap()
            .expect("patient should exist");
        assert_eq!(fetched.data, data);
    }

    #[test]
    fn test_patient_id_taken_excludes_self() {
        let db = Database::open_in_memory().unwrap();
        db.write(|tx| -> DbResult<()> {
            let id = insert_patient(tx, &sample_patient("P-1", "Baby Rao"))?;
            assert!(patient_id_taken(tx, "P-1", None)?);
            assert!(!patient_id_taken(tx, "P-1", Some(id))?);
            assert!(!patient_id_taken(tx, "P-2", None)?);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_unique_constraint_backs_up_service_check() {
        let db = Database::open_in_memory().unwrap();
        let result = db.write(|tx| -> DbResult<()> {
            insert_patient(tx, &sample_patient("P-1", "A"))?;
            insert_patient(tx, &sample_patient("P-1", "B"))?;
            Ok(())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_list_filters_and_orders() {
        let db = Database::open_in_memory().unwrap();
        let mut girl = sample_patient("P-2", "Baby Iyer");
        girl.sex = Sex::Female;
        girl.aga_sga_lga = GrowthCategory::Sga;

        db.write(|tx| -> DbResult<()> {
            insert_patient(tx, &sample_patient("P-3", "Baby Rao"))?;
            insert_patient(tx, &girl)?;
            insert_patient(tx, &sample_patient("P-1", "Baby_Khan"))?;

            let by_pid = list_patients(
                tx,
                &PatientFilter::default(),
                SortOrder::parse(Some("patient_id")),
                None,
            )?;
            let ids: Vec<&str> = by_pid.iter().map(|p| p.data.patient_id.as_str()).collect();
            assert_eq!(ids, vec!["P-1", "P-2", "P-3"]);

            let females = PatientFilter {
                sex: Some(Sex::Female),
                ..PatientFilter::default()
            };
            assert_eq!(count_patients(tx, &females)?, 1);

            let search = PatientFilter {
                search: Some("rao".into()),
                ..PatientFilter::default()
            };
            assert_eq!(count_patients(tx, &search)?, 1);

            // '_' is matched literally, not as a single-character wildcard.
            let literal = PatientFilter {
                search: Some("y_K".into()),
                ..PatientFilter::default()
            };
            assert_eq!(count_patients(tx, &literal)?, 1);

            let page = list_patients(
                tx,
                &PatientFilter::default(),
                SortOrder::parse(Some("-id")),
                Some(Window {
                    limit: 2,
                    offset: 0,
                }),
            )?;
            let ids: Vec<&str> = page.iter().map(|p| p.data.patient_id.as_str()).collect();
            assert_eq!(ids, vec!["P-1", "P-2"]);
            Ok(())
        })
        .unwrap();
    }
}
