//! SQLite persistence for patients and entries.
//!
//! The store owns a single connection behind a mutex. Every service operation
//! runs inside [`Database::read`] or [`Database::write`], which hold the lock for
//! the whole closure, so a check followed by a write (unique `patient_id`, entry
//! foreign key) cannot interleave with another request.
//!
//! Row-level functions in [`patients`] and [`entries`] take a plain
//! `&Connection`; a `Transaction` dereferences to one.

pub mod entries;
pub mod patients;
mod schema;

pub use schema::SCHEMA;

use crate::models::Choice;
use nicu_types::NonEmptyText;
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{Connection, Row, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Database errors.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database lock poisoned by a panicked request")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Shared handle to the record database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open database at path, creating it and the schema if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        Self::initialise(conn)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialise(conn)
    }

    fn initialise(conn: Connection) -> DbResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    /// Runs `f` with exclusive access to the connection.
    pub fn read<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Runs `f` inside a transaction, committing only if it returns `Ok`.
    pub fn write<T, E>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(DbError::from)?;
        let value = f(&tx)?;
        tx.commit().map_err(DbError::from)?;
        Ok(value)
    }
}

/// Sort direction and key for list queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortOrder<F> {
    pub field: F,
    pub descending: bool,
}

/// A column that list queries may be ordered by.
pub trait SortField: Copy + Default {
    /// Parses the client-facing name (without any `-` prefix).
    fn from_param(name: &str) -> Option<Self>;

    /// Qualified SQL column.
    fn column(self) -> &'static str;
}

impl<F: SortField> SortOrder<F> {
    /// Parses `field` or `-field`. Unknown names fall back to the default order.
    pub fn parse(param: Option<&str>) -> Self {
        let param = param.map(str::trim).unwrap_or_default();
        let (name, descending) = match param.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (param, false),
        };
        match F::from_param(name) {
            Some(field) => Self { field, descending },
            None => Self::default(),
        }
    }

    fn sql(&self, id_column: &str) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        format!(
            " ORDER BY {} {}, {} {}",
            self.field.column(),
            direction,
            id_column,
            direction
        )
    }
}

impl<F: SortField> Default for SortOrder<F> {
    fn default() -> Self {
        Self {
            field: F::default(),
            descending: false,
        }
    }
}

/// A slice of a result set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub limit: u32,
    pub offset: u64,
}

impl Window {
    fn sql(window: Option<Window>) -> String {
        match window {
            Some(w) => format!(" LIMIT {} OFFSET {}", w.limit, w.offset),
            None => String::new(),
        }
    }
}

/// `WHERE` clause assembled from optional filters.
#[derive(Default)]
struct Conditions {
    clauses: Vec<String>,
    params: Vec<SqlValue>,
}

impl Conditions {
    fn push(&mut self, clause: impl Into<String>, params: impl IntoIterator<Item = SqlValue>) {
        self.clauses.push(clause.into());
        self.params.extend(params);
    }

    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Builds a `LIKE` pattern matching `term` anywhere, with `\` as the escape.
fn contains_pattern(term: &str) -> SqlValue {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    SqlValue::Text(escaped)
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn choice_column<T: Choice>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    T::from_wire(&raw).ok_or_else(|| conversion_error(idx, format!("unknown value {:?}", raw)))
}

fn optional_choice_column<T: Choice>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        T::from_wire(&raw).ok_or_else(|| conversion_error(idx, format!("unknown value {:?}", raw)))
    })
    .transpose()
}

fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NonEmptyText> {
    let raw: String = row.get(idx)?;
    NonEmptyText::new(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialised() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .read(|conn| -> DbResult<Vec<String>> {
                let mut stmt = conn
                    .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .unwrap();

        assert!(tables.contains(&"patients".to_string()));
        assert!(tables.contains(&"entries".to_string()));
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let db = Database::open_in_memory().unwrap();
        let enabled: i64 = db
            .read(|conn| -> DbResult<i64> {
                Ok(conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_write_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<(), DbError> = db.write(|tx| {
            tx.execute(
                "INSERT INTO patients (patient_id, name, ga, weight, aga_sga_lga, sex, dob)
                 VALUES ('P1', 'A', 30, 1200, 'AGA', 'Male', '2024-01-01')",
                [],
            )?;
            Err(DbError::LockPoisoned)
        });
        assert!(result.is_err());

        let count: i64 = db
            .read(|conn| -> DbResult<i64> {
                Ok(conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(
            contains_pattern("50%_a\\b"),
            SqlValue::Text("%50\\%\\_a\\\\b%".to_string())
        );
    }

    #[test]
    fn test_open_file_backed_database_persists() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("nicu.sqlite3");
        {
            let db = Database::open(&path).unwrap();
            db.write(|tx| -> DbResult<()> {
                tx.execute(
                    "INSERT INTO patients (patient_id, name, ga, weight, aga_sga_lga, sex, dob)
                     VALUES ('P1', 'A', 30, 1200, 'AGA', 'Male', '2024-01-01')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        }
        let reopened = Database::open(&path).unwrap();
        let count: i64 = reopened
            .read(|conn| -> DbResult<i64> {
                Ok(conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 1);
    }
}
