use api_shared::ErrorRes;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use nicu_core::{Entry, EntryData, EntryQuery, Listing};
use serde_json::Value;

use crate::error::ApiError;
use crate::{parse_id, AppState};

#[utoipa::path(
    get,
    path = "/api/entries/",
    params(EntryQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Entries; a page envelope when `page` or `page_size` is given", body = [Entry]),
        (status = 400, description = "Invalid filter value"),
        (status = 401, description = "Missing or invalid token", body = ErrorRes),
        (status = 404, description = "Invalid page", body = ErrorRes)
    )
)]
/// List daily entries across all patients.
#[axum::debug_handler]
pub(crate) async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<EntryQuery>,
) -> Result<Json<Listing<Entry>>, ApiError> {
    Ok(Json(state.entries.list(&query)?))
}

#[utoipa::path(
    post,
    path = "/api/entries/",
    request_body = EntryData,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Entry created", body = Entry),
        (status = 400, description = "Field errors keyed by field name"),
        (status = 401, description = "Missing or invalid token", body = ErrorRes)
    )
)]
/// Create an entry. `patient` must name an existing patient.
#[axum::debug_handler]
pub(crate) async fn create_entry(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Entry>), ApiError> {
    let Json(body) = body?;
    let record = state.entries.create(&body)?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/api/entries/{id}/",
    params(("id" = i64, Path, description = "Entry id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Entry", body = Entry),
        (status = 401, description = "Missing or invalid token", body = ErrorRes),
        (status = 404, description = "Not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn retrieve_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Entry>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.entries.retrieve(id)?))
}

#[utoipa::path(
    put,
    path = "/api/entries/{id}/",
    params(("id" = i64, Path, description = "Entry id")),
    request_body = EntryData,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Entry replaced", body = Entry),
        (status = 400, description = "Field errors keyed by field name"),
        (status = 401, description = "Missing or invalid token", body = ErrorRes),
        (status = 404, description = "Not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Entry>, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    Ok(Json(state.entries.update(id, &body)?))
}

#[utoipa::path(
    patch,
    path = "/api/entries/{id}/",
    params(("id" = i64, Path, description = "Entry id")),
    request_body(content = EntryData, description = "Any subset of the writable fields"),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Entry updated", body = Entry),
        (status = 400, description = "Field errors keyed by field name"),
        (status = 401, description = "Missing or invalid token", body = ErrorRes),
        (status = 404, description = "Not found", body = ErrorRes)
    )
)]
/// Update only the supplied fields. `null` clears an optional field.
#[axum::debug_handler]
pub(crate) async fn partial_update_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Entry>, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    Ok(Json(state.entries.partial_update(id, &body)?))
}

#[utoipa::path(
    delete,
    path = "/api/entries/{id}/",
    params(("id" = i64, Path, description = "Entry id")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 401, description = "Missing or invalid token", body = ErrorRes),
        (status = 404, description = "Not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.entries.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}
