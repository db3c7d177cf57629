use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::handlers::extract::AppJson;
use crate::models::{Booking, BookingStatus, NewBooking};
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<NewBooking>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state.bookings.create_booking(body).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.get_booking(&id).await?))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: BookingStatus,
}

// POST /api/bookings/:id/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(body): AppJson<StatusRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.bookings.update_booking_status(&id, body.status).await?;
    Ok(Json(booking))
}
