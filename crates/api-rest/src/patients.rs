use api_shared::ErrorRes;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use nicu_core::{Listing, PatientData, PatientQuery, PatientRecord};
use serde_json::Value;

use crate::error::ApiError;
use crate::{parse_id, AppState};

#[utoipa::path(
    get,
    path = "/api/patients/",
    params(PatientQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Patients with their entries; a page envelope when `page` or `page_size` is given", body = [PatientRecord]),
        (status = 400, description = "Invalid filter value"),
        (status = 401, description = "Missing or invalid token", body = ErrorRes),
        (status = 404, description = "Invalid page", body = ErrorRes)
    )
)]
/// List patients, each with its entries nested.
#[axum::debug_handler]
pub(crate) async fn list_patients(
    State(state): State<AppState>,
    Query(query): Query<PatientQuery>,
) -> Result<Json<Listing<PatientRecord>>, ApiError> {
    Ok(Json(state.patients.list(&query)?))
}

#[utoipa::path(
    post,
    path = "/api/patients/",
    request_body = PatientData,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Patient created", body = PatientRecord),
        (status = 400, description = "Field errors keyed by field name"),
        (status = 401, description = "Missing or invalid token", body = ErrorRes)
    )
)]
/// Create a patient. `patient_id` must be unique.
#[axum::debug_handler]
pub(crate) async fn create_patient(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<PatientRecord>), ApiError> {
    let Json(body) = body?;
    let record = state.patients.create(&body)?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}/",
    params(("id" = i64, Path, description = "Internal patient id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Patient with entries", body = PatientRecord),
        (status = 401, description = "Missing or invalid token", body = ErrorRes),
        (status = 404, description = "Not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn retrieve_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PatientRecord>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.patients.retrieve(id)?))
}

#[utoipa::path(
    put,
    path = "/api/patients/{id}/",
    params(("id" = i64, Path, description = "Internal patient id")),
    request_body = PatientData,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Patient replaced", body = PatientRecord),
        (status = 400, description = "Field errors keyed by field name"),
        (status = 401, description = "Missing or invalid token", body = ErrorRes),
        (status = 404, description = "Not found", body = ErrorRes)
    )
)]
/// Replace every writable field of a patient. Nested `entries` are ignored.
#[axum::debug_handler]
pub(crate) async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PatientRecord>, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    Ok(Json(state.patients.update(id, &body)?))
}

#[utoipa::path(
    patch,
    path = "/api/patients/{id}/",
    params(("id" = i64, Path, description = "Internal patient id")),
    request_body(content = PatientData, description = "Any subset of the writable fields"),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Patient updated", body = PatientRecord),
        (status = 400, description = "Field errors keyed by field name"),
        (status = 401, description = "Missing or invalid token", body = ErrorRes),
        (status = 404, description = "Not found", body = ErrorRes)
    )
)]
/// Update only the supplied fields of a patient.
#[axum::debug_handler]
pub(crate) async fn partial_update_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PatientRecord>, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    Ok(Json(state.patients.partial_update(id, &body)?))
}

#[utoipa::path(
    delete,
    path = "/api/patients/{id}/",
    params(("id" = i64, Path, description = "Internal patient id")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Patient and its entries deleted"),
        (status = 401, description = "Missing or invalid token", body = ErrorRes),
        (status = 404, description = "Not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.patients.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}
