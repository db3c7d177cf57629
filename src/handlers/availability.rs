use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::handlers::extract::{AppJson, AppQuery};
use crate::models::availability::parse_date;
use crate::models::{AvailabilityCheckResult, AvailabilityRecord, AvailabilityUpdate};
use crate::services::clock::optional_zone;
use crate::state::AppState;

fn date_param(raw: &str) -> Result<chrono::NaiveDate, AppError> {
    parse_date(raw).map_err(|e| AppError::Validation(e.to_string()))
}

// POST /api/providers/:id/availability
pub async fn create_availability(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<String>,
) -> Result<(StatusCode, Json<AvailabilityRecord>), AppError> {
    let record = state.availability.create(&provider_id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

// GET /api/providers/:id/availability
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<String>,
) -> Result<Json<AvailabilityRecord>, AppError> {
    state
        .availability
        .get(&provider_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no availability record for provider {provider_id}")))
}

// PATCH /api/providers/:id/availability
pub async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<String>,
    AppJson(update): AppJson<AvailabilityUpdate>,
) -> Result<Json<AvailabilityRecord>, AppError> {
    let record = state.availability.update(&provider_id, update).await?;
    Ok(Json(record))
}

#[derive(Deserialize)]
pub struct DayOffRequest {
    pub date: String,
}

// POST /api/providers/:id/availability/days-off
pub async fn add_day_off(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<String>,
    AppJson(body): AppJson<DayOffRequest>,
) -> Result<Json<AvailabilityRecord>, AppError> {
    let date = date_param(&body.date)?;
    let record = state.availability.add_custom_day_off(&provider_id, date).await?;
    Ok(Json(record))
}

// DELETE /api/providers/:id/availability/days-off/:date
pub async fn remove_day_off(
    State(state): State<Arc<AppState>>,
    Path((provider_id, raw_date)): Path<(String, String)>,
) -> Result<Json<AvailabilityRecord>, AppError> {
    let date = date_param(&raw_date)?;
    let record = state
        .availability
        .remove_custom_day_off(&provider_id, date)
        .await?;
    Ok(Json(record))
}

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
    /// IANA zone of the caller, e.g. `Europe/Berlin`.
    pub tz: Option<String>,
}

// GET /api/providers/:id/slots?date=YYYY-MM-DD&tz=Area/City
pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<String>,
    AppQuery(query): AppQuery<SlotsQuery>,
) -> Result<Json<AvailabilityCheckResult>, AppError> {
    let date = date_param(&query.date)?;
    let zone = optional_zone(query.tz.as_deref())?;
    let result = state
        .slots
        .get_available_slots(&provider_id, date, zone)
        .await?;
    Ok(Json(result))
}
