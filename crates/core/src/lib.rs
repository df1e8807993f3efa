//! # NICU Core
//!
//! Record logic for the NICU patient tracker.
//!
//! This crate contains the data model, validation and SQLite persistence:
//! - Patients and their daily entries
//! - Field-level validation of JSON bodies with client-facing messages
//! - Filtering, ordering and pagination of list queries
//!
//! **No API concerns**: authentication and HTTP belong in `api-rest` and `api-shared`.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod validation;

pub use config::CoreConfig;
pub use error::{RecordError, RecordKind, RecordResult};
pub use models::{
    Entry, EntryData, GrowthCategory, ModeOfFeeding, Patient, PatientData, PatientRecord, Sex,
    TypeOfMilk,
};
pub use nicu_types::NonEmptyText;
pub use services::{
    EntryPage, EntryQuery, EntryService, Listing, Page, PatientPage, PatientQuery, PatientService,
};
pub use store::{Database, DbError};
pub use validation::{FieldErrors, NON_FIELD_ERRORS};
