//! Record services: the CRUD operations behind the REST resources and the CLI.
//!
//! Services take JSON bodies and typed list queries, run validation, and hold the
//! store lock for the whole of each operation. They know nothing about HTTP.

pub mod entries;
pub mod patients;

pub use entries::{EntryQuery, EntryService};
pub use patients::{PatientQuery, PatientService};

use crate::constants::MAX_PAGE_SIZE;
use crate::models::{Choice, Entry, PatientRecord};
use crate::store::Window;
use crate::validation::FieldErrors;
use crate::{RecordError, RecordResult};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One page of a list result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[aliases(PatientPage = Page<PatientRecord>, EntryPage = Page<Entry>)]
pub struct Page<T> {
    /// Number of records matching the query across all pages.
    pub count: u64,
    /// Page number of the next page, if there is one.
    pub next: Option<u32>,
    /// Page number of the previous page, if there is one.
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

/// List result: a plain array when the client did not ask for a page, otherwise
/// a [`Page`] envelope.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Listing<T> {
    All(Vec<T>),
    Page(Page<T>),
}

impl<T> Listing<T> {
    /// The records in this listing, whichever shape it has.
    pub fn records(&self) -> &[T] {
        match self {
            Listing::All(records) => records,
            Listing::Page(page) => &page.results,
        }
    }
}

/// Resolved pagination parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Paging {
    page: u32,
    size: u32,
}

impl Paging {
    /// Resolves raw `page`/`page_size` query values.
    ///
    /// Returns `None` (no pagination) when neither is supplied. A `page` that is
    /// not a positive integer is an [`RecordError::InvalidPage`]; an unusable
    /// `page_size` falls back to `default_size`, and large sizes are clamped.
    pub(crate) fn resolve(
        page: Option<&str>,
        page_size: Option<&str>,
        default_size: u32,
    ) -> RecordResult<Option<Self>> {
        let page = page.map(str::trim).filter(|p| !p.is_empty());
        let page_size = page_size.map(str::trim).filter(|p| !p.is_empty());
        if page.is_none() && page_size.is_none() {
            return Ok(None);
        }

        let page = match page {
            None => 1,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => return Err(RecordError::InvalidPage),
            },
        };
        let size = page_size
            .and_then(|raw| raw.parse::<u32>().ok())
            .filter(|n| *n >= 1)
            .map(|n| n.min(MAX_PAGE_SIZE))
            .unwrap_or(default_size);

        Ok(Some(Self { page, size }))
    }

    fn window(self) -> Window {
        Window {
            limit: self.size,
            offset: u64::from(self.page - 1) * u64::from(self.size),
        }
    }
}

/// Runs a list query with optional pagination.
///
/// `count` is only consulted when paginating. Asking for a page past the end is
/// an error, except for page 1, which is always valid (and empty when nothing
/// matches).
pub(crate) fn paginate<T>(
    paging: Option<Paging>,
    count: impl FnOnce() -> RecordResult<u64>,
    fetch: impl FnOnce(Option<Window>) -> RecordResult<Vec<T>>,
) -> RecordResult<Listing<T>> {
    let Some(paging) = paging else {
        return Ok(Listing::All(fetch(None)?));
    };

    let total = count()?;
    let window = paging.window();
    if paging.page > 1 && window.offset >= total {
        return Err(RecordError::InvalidPage);
    }

    let results = fetch(Some(window))?;
    let shown = window.offset + results.len() as u64;
    Ok(Listing::Page(Page {
        count: total,
        next: (shown < total).then_some(paging.page + 1),
        previous: (paging.page > 1).then_some(paging.page - 1),
        results,
    }))
}

/// Parses an exact-match choice filter. Blank values mean "no filter".
pub(crate) fn choice_filter<T: Choice>(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
) -> Option<T> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    let parsed = T::from_wire(value);
    if parsed.is_none() {
        errors.add(
            field,
            format!(
                "Select a valid choice. {} is not one of the available choices.",
                value
            ),
        );
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_without_params_is_unpaginated() {
        assert_eq!(Paging::resolve(None, None, 20).unwrap(), None);
        assert_eq!(Paging::resolve(Some(" "), Some(""), 20).unwrap(), None);
    }

    #[test]
    fn test_resolve_clamps_and_defaults_size() {
        let paging = Paging::resolve(Some("2"), Some("1000"), 20).unwrap().unwrap();
        assert_eq!(paging, Paging { page: 2, size: MAX_PAGE_SIZE });

        let paging = Paging::resolve(None, Some("abc"), 20).unwrap().unwrap();
        assert_eq!(paging, Paging { page: 1, size: 20 });
    }

    #[test]
    fn test_resolve_rejects_page_zero() {
        assert!(matches!(
            Paging::resolve(Some("0"), None, 20),
            Err(RecordError::InvalidPage)
        ));
    }

    #[test]
    fn test_paginate_links_pages() {
        let rows: Vec<u32> = (1..=5).collect();
        let fetch = |window: Option<Window>| -> RecordResult<Vec<u32>> {
            let w = window.expect("paged fetch");
            Ok(rows
                .iter()
                .copied()
                .skip(w.offset as usize)
                .take(w.limit as usize)
                .collect())
        };

        let paging = Paging::resolve(Some("2"), Some("2"), 20).unwrap();
        let listing = paginate(paging, || Ok(5), fetch).unwrap();
        assert_eq!(
            listing,
            Listing::Page(Page {
                count: 5,
                next: Some(3),
                previous: Some(1),
                results: vec![3, 4],
            })
        );
    }

    #[test]
    fn test_paginate_rejects_page_past_end_but_allows_empty_first_page() {
        let empty = |_: Option<Window>| -> RecordResult<Vec<u32>> { Ok(vec![]) };

        let first = Paging::resolve(Some("1"), None, 20).unwrap();
        let listing = paginate(first, || Ok(0), empty).unwrap();
        assert_eq!(listing.records().len(), 0);

        let third = Paging::resolve(Some("3"), None, 20).unwrap();
        assert!(matches!(
            paginate(third, || Ok(0), empty),
            Err(RecordError::InvalidPage)
        ));
    }
}
