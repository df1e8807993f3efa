//! # API REST
//!
//! REST API implementation for the NICU tracker.
//!
//! Handles:
//! - HTTP endpoints with axum, each served with and without a trailing slash
//! - Bearer-token authentication on every record endpoint
//! - OpenAPI/Swagger documentation
//!
//! Uses `api-shared` for the status payload and authentication, and `nicu-core`
//! for everything that touches records.

#![warn(rust_2018_idioms)]

mod entries;
mod error;
mod patients;

pub use error::ApiError;

use api_shared::{
    bearer_token, normalise_prefix, Authenticator, ErrorRes, StatusRes, StatusService,
    DEFAULT_API_PREFIX,
};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::{self, Next},
    response::{Json, Response},
    routing::get,
    Router,
};
use nicu_core::{
    CoreConfig, Database, Entry, EntryData, EntryPage, EntryService, GrowthCategory,
    ModeOfFeeding, Patient, PatientData, PatientPage, PatientRecord, PatientService, Sex,
    TypeOfMilk,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Prefix the generated OpenAPI document is written against.
const DOCUMENTED_PREFIX: &str = "/api";

/// REST-specific configuration.
#[derive(Clone, Debug)]
pub struct RestConfig {
    api_prefix: String,
    version: String,
}

impl RestConfig {
    /// `api_prefix` is normalised to either `""` or `/segment[/segment...]` with no
    /// trailing slash.
    pub fn new(api_prefix: &str, version: impl Into<String>) -> Self {
        Self {
            api_prefix: normalise_prefix(api_prefix),
            version: version.into(),
        }
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Default for RestConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_PREFIX, env!("CARGO_PKG_VERSION"))
    }
}

/// Application state for the REST API server
///
/// Holds the record services, the authenticator and the status service. Every
/// field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub(crate) patients: PatientService,
    pub(crate) entries: EntryService,
    status: StatusService,
    auth: Arc<dyn Authenticator>,
    rest: Arc<RestConfig>,
}

impl AppState {
    pub fn new(
        cfg: Arc<CoreConfig>,
        db: Database,
        rest: RestConfig,
        auth: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            patients: PatientService::new(cfg.clone(), db.clone()),
            entries: EntryService::new(cfg, db),
            status: StatusService::new(rest.api_prefix(), rest.version()),
            auth,
            rest: Arc::new(rest),
        }
    }
}

/// Links to the record collections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApiRoot {
    pub patients: String,
    pub entries: String,
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        status,
        api_root,
        patients::list_patients,
        patients::create_patient,
        patients::retrieve_patient,
        patients::update_patient,
        patients::partial_update_patient,
        patients::delete_patient,
        entries::list_entries,
        entries::create_entry,
        entries::retrieve_entry,
        entries::update_entry,
        entries::partial_update_entry,
        entries::delete_entry,
    ),
    components(schemas(
        StatusRes,
        ErrorRes,
        ApiRoot,
        GrowthCategory,
        Sex,
        PatientData,
        Patient,
        PatientRecord,
        PatientPage,
        TypeOfMilk,
        ModeOfFeeding,
        EntryData,
        Entry,
        EntryPage,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

/// The OpenAPI document with its paths moved under `api_prefix`.
pub fn openapi(api_prefix: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    if api_prefix != DOCUMENTED_PREFIX {
        doc.paths.paths = std::mem::take(&mut doc.paths.paths)
            .into_iter()
            .filter_map(|(path, item)| match path.strip_prefix(DOCUMENTED_PREFIX) {
                // No API root is served without a prefix; `/` is the status page.
                Some("/") if api_prefix.is_empty() => None,
                Some(rest) => Some((format!("{}{}", api_prefix, rest), item)),
                None => Some((path, item)),
            })
            .collect();
    }
    doc
}

/// Build the full REST router: status, API root, record endpoints and docs.
///
/// Record endpoints and the API root sit behind [`require_auth`]; the status
/// endpoint and the documentation do not.
pub fn build_router(state: AppState) -> Router {
    let prefix = state.rest.api_prefix().to_string();
    let at = |path: &str| format!("{}{}", prefix, path);

    let mut records = Router::new();
    for path in ["/patients", "/patients/"] {
        records = records.route(
            &at(path),
            get(patients::list_patients).post(patients::create_patient),
        );
    }
    for path in ["/patients/:id", "/patients/:id/"] {
        records = records.route(
            &at(path),
            get(patients::retrieve_patient)
                .put(patients::update_patient)
                .patch(patients::partial_update_patient)
                .delete(patients::delete_patient),
        );
    }
    for path in ["/entries", "/entries/"] {
        records = records.route(
            &at(path),
            get(entries::list_entries).post(entries::create_entry),
        );
    }
    for path in ["/entries/:id", "/entries/:id/"] {
        records = records.route(
            &at(path),
            get(entries::retrieve_entry)
                .put(entries::update_entry)
                .patch(entries::partial_update_entry)
                .delete(entries::delete_entry),
        );
    }
    // With an empty prefix the API root would shadow the status page.
    if !prefix.is_empty() {
        records = records
            .route(&prefix, get(api_root))
            .route(&at("/"), get(api_root));
    }
    let records = records.route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(status))
        .merge(records)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi(&prefix)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Reject requests without a valid bearer token.
async fn require_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let checked = bearer_token(header).and_then(|token| state.auth.authenticate(token));
    if let Err(e) = checked {
        tracing::debug!("Rejected {} {}: {}", req.method(), req.uri().path(), e);
        return Err(e.into());
    }

    Ok(next.run(req).await)
}

pub(crate) fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::BadId)
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Server status", body = StatusRes)
    )
)]
/// Status endpoint. Needs no authentication.
#[axum::debug_handler]
async fn status(State(state): State<AppState>) -> Json<StatusRes> {
    Json(state.status.check_status())
}

#[utoipa::path(
    get,
    path = "/api/",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Links to the record collections", body = ApiRoot),
        (status = 401, description = "Missing or invalid token", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn api_root(State(state): State<AppState>) -> Json<ApiRoot> {
    let prefix = state.rest.api_prefix();
    Json(ApiRoot {
        patients: format!("{}/patients/", prefix),
        entries: format!("{}/entries/", prefix),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_config_normalises_prefix() {
        assert_eq!(RestConfig::new("api/", "1.0.0").api_prefix(), "/api");
        assert_eq!(RestConfig::new("/", "1.0.0").api_prefix(), "");
        assert_eq!(RestConfig::default().api_prefix(), DEFAULT_API_PREFIX);
    }

    #[test]
    fn test_openapi_paths_follow_prefix() {
        let doc = openapi("/records");
        assert!(doc.paths.paths.contains_key("/records/patients/"));
        assert!(doc.paths.paths.contains_key("/records/entries/{id}/"));
        assert!(doc.paths.paths.contains_key("/"));

        let bare = openapi("");
        assert!(bare.paths.paths.contains_key("/patients/"));
    }
}
