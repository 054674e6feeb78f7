use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use crate::auth::{authorize, Action, Caller};
use crate::db::{MessageResponse, User};
use crate::AppState;

/// Upgrade the calling therapist to premium. No payment step.
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<MessageResponse>, ApiError> {
    authorize(&caller, Action::Subscribe)?;

    let updated = User::upgrade_subscription(&state.db, caller.id).await?;
    if updated == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    info!(user_id = caller.id, "Subscription upgraded to premium");
    Ok(Json(MessageResponse::new("Suscripción premium activada")))
}
