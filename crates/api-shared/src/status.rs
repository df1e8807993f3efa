use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const PROJECT_NAME: &str = "NICU Backend Server";
pub const ADMIN_PATH: &str = "/admin/";

/// Payload of the unauthenticated status endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusRes {
    pub project: String,
    pub status: String,
    pub version: String,
    /// Where the browsable API root lives.
    pub api_docs: String,
    pub admin: String,
    pub message: String,
}

/// Status service shared by the REST server and the CLI.
///
/// Reports that the server is up, which version is running and where the API
/// is mounted. It performs no I/O.
#[derive(Clone, Debug)]
pub struct StatusService {
    api_prefix: String,
    version: String,
}

impl StatusService {
    /// Creates a status service for an API mounted at `api_prefix`
    /// (`""` for the root, otherwise `/api` style with no trailing slash).
    ///
    /// `version` is the version of the running binary, not of this crate.
    pub fn new(api_prefix: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            api_prefix: api_prefix.into(),
            version: version.into(),
        }
    }

    /// # Returns
    /// A `StatusRes` describing the running server.
    pub fn check_status(&self) -> StatusRes {
        StatusRes {
            project: PROJECT_NAME.into(),
            status: "running".into(),
            version: self.version.clone(),
            api_docs: format!("{}/", self.api_prefix),
            admin: ADMIN_PATH.into(),
            message: format!(
                "Welcome to the NICU Backend API. Visit {}/ for API endpoints or {} for admin panel.",
                self.api_prefix, ADMIN_PATH
            ),
        }
    }
}

impl Default for StatusService {
    fn default() -> Self {
        Self::new("/api", env!("CARGO_PKG_VERSION"))
    }
}
