//! # API Shared
//!
//! Shared utilities and definitions for the NICU APIs.
//!
//! Contains:
//! - The status payload (`StatusService`), also printed by the CLI
//! - Bearer-token authentication (`Authenticator`, `TokenAuthenticator`)
//! - API prefix resolution, so the server and the CLI agree on where the API lives
//! - The `{detail}` error body used by every non-validation error response

pub mod auth;
pub mod prefix;
pub mod status;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use auth::{bearer_token, AuthError, Authenticator, TokenAuthenticator};
pub use prefix::{api_prefix_from_env_value, normalise_prefix, DEFAULT_API_PREFIX};
pub use status::{StatusRes, StatusService};

/// Error body carrying a single human-readable message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub detail: String,
}

impl ErrorRes {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
