//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core
//! services, so request handling never reads process-wide environment variables.

use crate::constants::{DEFAULT_DATABASE_PATH, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::{RecordError, RecordResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    database_path: PathBuf,
    default_page_size: u32,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidInput` if `default_page_size` is zero or larger
    /// than [`MAX_PAGE_SIZE`].
    pub fn new(database_path: PathBuf, default_page_size: u32) -> RecordResult<Self> {
        if default_page_size == 0 || default_page_size > MAX_PAGE_SIZE {
            return Err(RecordError::InvalidInput(format!(
                "default page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if database_path.as_os_str().is_empty() {
            return Err(RecordError::InvalidInput(
                "database path cannot be empty".into(),
            ));
        }

        Ok(Self {
            database_path,
            default_page_size,
        })
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn default_page_size(&self) -> u32 {
        self.default_page_size
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Resolve the database path from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_DATABASE_PATH`].
pub fn database_path_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH))
}

/// Parse the default page size from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_PAGE_SIZE`].
pub fn page_size_from_env_value(value: Option<String>) -> RecordResult<u32> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    match value {
        None => Ok(DEFAULT_PAGE_SIZE),
        Some(v) => v
            .parse::<u32>()
            .map_err(|_| RecordError::InvalidInput(format!("invalid page size: {}", v))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_defaults_when_unset_or_blank() {
        assert_eq!(page_size_from_env_value(None).unwrap(), DEFAULT_PAGE_SIZE);
        assert_eq!(
            page_size_from_env_value(Some("  ".into())).unwrap(),
            DEFAULT_PAGE_SIZE
        );
        assert_eq!(page_size_from_env_value(Some("50".into())).unwrap(), 50);
    }

    #[test]
    fn test_page_size_rejects_garbage() {
        assert!(matches!(
            page_size_from_env_value(Some("ten".into())),
            Err(RecordError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_new_rejects_out_of_range_page_size() {
        assert!(CoreConfig::new(PathBuf::from("x.db"), 0).is_err());
        assert!(CoreConfig::new(PathBuf::from("x.db"), MAX_PAGE_SIZE + 1).is_err());
        assert!(CoreConfig::new(PathBuf::from("x.db"), MAX_PAGE_SIZE).is_ok());
    }

    #[test]
    fn test_database_path_falls_back_to_default() {
        assert_eq!(
            database_path_from_env_value(Some("".into())),
            PathBuf::from(DEFAULT_DATABASE_PATH)
        );
        assert_eq!(
            database_path_from_env_value(Some("/var/lib/nicu/records.db".into())),
            PathBuf::from("/var/lib/nicu/records.db")
        );
    }
}
