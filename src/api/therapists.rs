use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use super::validation::validate_profile_update;
use crate::auth::{authorize, Action, Caller};
use crate::db::{
    ApproveRequest, MessageResponse, TherapistFilter, TherapistProfile, TherapistQuery,
    UpdateProfileRequest,
};
use crate::AppState;

/// Public directory listing. Verified profiles only unless `verified` is given.
pub async fn list_therapists(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TherapistQuery>,
) -> Result<Json<Vec<TherapistProfile>>, ApiError> {
    let filter = TherapistFilter::try_from(query).map_err(ApiError::bad_request)?;
    let profiles = TherapistProfile::list(&state.db, &filter).await?;
    Ok(Json(profiles))
}

/// Overwrite the caller's own profile. The target is always the caller id.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    authorize(&caller, Action::EditOwnProfile)?;

    let Json(request) = payload?;
    validate_profile_update(&request)?;

    let updated = TherapistProfile::update_profile(&state.db, caller.id, &request).await?;
    if updated == 0 {
        return Err(ApiError::not_found("Therapist not found"));
    }

    info!(therapist_id = caller.id, "Therapist profile updated");
    Ok(Json(MessageResponse::new("Profile actualizado exitosamente")))
}

/// Mark a therapist verified so it shows up in the public directory
pub async fn approve_therapist(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    payload: Result<Json<ApproveRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    authorize(&caller, Action::ApproveTherapist)?;

    let Json(request) = payload?;
    let updated = TherapistProfile::approve(&state.db, request.therapist_id).await?;
    if updated == 0 {
        return Err(ApiError::not_found("Therapist not found"));
    }

    info!(
        therapist_id = request.therapist_id,
        admin_id = caller.id,
        "Therapist approved"
    );
    Ok(Json(MessageResponse::new("Terapeuta aprobado")))
}
