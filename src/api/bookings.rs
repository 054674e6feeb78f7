use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use super::validation::validate_booking;
use crate::auth::{authorize, Action, Caller};
use crate::db::{Booking, CreateBookingRequest, MessageResponse};
use crate::AppState;

/// Book an appointment for the caller. The therapist id is not checked.
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    authorize(&caller, Action::CreateBooking)?;

    let Json(request) = payload?;
    validate_booking(&request)?;

    let id = Booking::create(&state.db, caller.id, &request).await?;

    info!(
        booking_id = id,
        client_id = caller.id,
        therapist_id = request.therapist_id,
        "Booking created"
    );
    Ok(Json(MessageResponse::new("Booking creado ok")))
}

/// The caller's own bookings, oldest first
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<Booking>>, ApiError> {
    authorize(&caller, Action::ListOwnBookings)?;

    let bookings = Booking::list_for_client(&state.db, caller.id).await?;
    Ok(Json(bookings))
}
