use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication credentials were not provided.")]
    MissingCredentials,
    #[error("Invalid token.")]
    InvalidToken,
}

/// Decides whether a bearer token belongs to an authenticated caller.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<(), AuthError>;
}

/// Accepts any token from a fixed set, typically loaded from `NICU_API_TOKENS`.
///
/// An empty set rejects every request.
#[derive(Clone, Debug, Default)]
pub struct TokenAuthenticator {
    tokens: HashSet<String>,
}

impl TokenAuthenticator {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
        }
    }

    /// Parses a comma-separated token list. Whitespace around tokens is ignored.
    pub fn from_env_value(value: Option<String>) -> Self {
        let raw = value.unwrap_or_default();
        Self::new(raw.split(',').map(str::trim))
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Authenticator for TokenAuthenticator {
    fn authenticate(&self, token: &str) -> Result<(), AuthError> {
        if self.tokens.contains(token) {
            Ok(())
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}

/// Extracts the token from an `Authorization` header value.
///
/// Accepts `Bearer <token>` and, for clients written against token auth,
/// `Token <token>`. The scheme is case-insensitive.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.map(str::trim).filter(|h| !h.is_empty());
    let Some(header) = header else {
        return Err(AuthError::MissingCredentials);
    };

    let (scheme, token) = header.split_once(' ').ok_or(AuthError::InvalidToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") && !scheme.eq_ignore_ascii_case("token") {
        return Err(AuthError::MissingCredentials);
    }
    let token = token.trim();
    if token.is_empty() || token.contains(' ') {
        return Err(AuthError::InvalidToken);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_authenticator_accepts_configured_tokens() {
        let auth = TokenAuthenticator::from_env_value(Some("alpha, beta,,".into()));
        assert!(auth.authenticate("alpha").is_ok());
        assert!(auth.authenticate("beta").is_ok());
        assert_eq!(auth.authenticate("gamma"), Err(AuthError::InvalidToken));
        assert_eq!(auth.authenticate(""), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_unset_tokens_reject_everything() {
        let auth = TokenAuthenticator::from_env_value(None);
        assert!(auth.is_empty());
        assert!(auth.authenticate("anything").is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(Some("token abc")), Ok("abc"));
        assert_eq!(bearer_token(None), Err(AuthError::MissingCredentials));
        assert_eq!(bearer_token(Some("  ")), Err(AuthError::MissingCredentials));
        assert_eq!(
            bearer_token(Some("Basic dXNlcjpwYXNz")),
            Err(AuthError::MissingCredentials)
        );
        assert_eq!(bearer_token(Some("Bearer")), Err(AuthError::InvalidToken));
        assert_eq!(bearer_token(Some("Bearer a b")), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_auth_error_messages() {
        assert_eq!(
            AuthError::MissingCredentials.to_string(),
            "Authentication credentials were not provided."
        );
        assert_eq!(AuthError::InvalidToken.to_string(), "Invalid token.");
    }
}
