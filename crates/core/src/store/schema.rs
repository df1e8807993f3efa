//! SQLite schema definition.

/// Complete database schema.
///
/// Safe to apply to an existing database: every statement is `IF NOT EXISTS`.
pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    ga REAL NOT NULL,                             -- weeks
    weight REAL NOT NULL,                         -- grams
    aga_sga_lga TEXT NOT NULL,
    sex TEXT NOT NULL,
    dob TEXT NOT NULL,                            -- YYYY-MM-DD
    tob TEXT,                                     -- HH:MM:SS
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name);

-- ============================================================================
-- Daily entries
-- ============================================================================

CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    date TEXT NOT NULL,
    dol INTEGER,
    pma REAL,
    kmc REAL,
    cal REAL,
    protein REAL,
    weight REAL,
    feeds TEXT,
    type_of_milk TEXT,
    hmf TEXT,
    calcium TEXT,
    phosphorus TEXT,
    vit_d TEXT,
    iron TEXT,
    zinc TEXT,
    caffeine TEXT,
    resp_support TEXT,
    desaturations TEXT,
    acute_events TEXT,
    piomi TEXT,
    tfr TEXT,
    nns TEXT,
    gain_loss TEXT,
    early_intervention TEXT,
    mode_of_feeding TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_entries_patient_date ON entries(patient_id, date);
CREATE INDEX IF NOT EXISTS idx_entries_date ON entries(date);
"#;
