//! Constants used throughout the NICU core crate.
//!
//! Field limits live here so that the validation layer, the SQLite schema and
//! the CLI agree on them.

/// Default SQLite database file when no explicit path is configured.
pub const DEFAULT_DATABASE_PATH: &str = "nicu.sqlite3";

/// Default number of records per page when a client asks for a page without a size.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound on `page_size`; larger requests are clamped.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Maximum length of a patient's hospital identifier.
pub const PATIENT_ID_MAX_CHARS: usize = 50;

/// Maximum length of a patient's name.
pub const PATIENT_NAME_MAX_CHARS: usize = 100;

/// Maximum length of any free-text entry field.
pub const ENTRY_TEXT_MAX_CHARS: usize = 255;
