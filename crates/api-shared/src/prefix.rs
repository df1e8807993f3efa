//! Where the record endpoints are mounted.

pub const DEFAULT_API_PREFIX: &str = "/api";

/// Resolve the API prefix from an optional env var value (`NICU_API_PREFIX`).
pub fn api_prefix_from_env_value(value: Option<String>) -> String {
    match value {
        Some(raw) => normalise_prefix(&raw),
        None => DEFAULT_API_PREFIX.to_string(),
    }
}

/// Normalises a prefix to either `""` or `/segment[/segment...]` with no
/// trailing slash.
pub fn normalise_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_normalisation() {
        assert_eq!(normalise_prefix("/api"), "/api");
        assert_eq!(normalise_prefix("api"), "/api");
        assert_eq!(normalise_prefix("api/"), "/api");
        assert_eq!(normalise_prefix(" /v1/nicu/ "), "/v1/nicu");
        assert_eq!(normalise_prefix("/"), "");
        assert_eq!(normalise_prefix(""), "");
    }

    #[test]
    fn test_api_prefix_from_env_value() {
        assert_eq!(api_prefix_from_env_value(None), "/api");
        assert_eq!(api_prefix_from_env_value(Some("".into())), "");
        assert_eq!(api_prefix_from_env_value(Some("records".into())), "/records");
    }
}
