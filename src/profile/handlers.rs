use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{dto::PublicUser, repo::User, session::SessionUser},
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::dto::UpdateProfileRequest;

const MAX_FIELD_LEN: usize = 500;

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

#[instrument(skip_all)]
pub async fn get_profile(SessionUser(user): SessionUser) -> Json<PublicUser> {
    Json(PublicUser::from(user))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<Json<PublicUser>> {
    for field in [&payload.display_name, &payload.bio, &payload.location] {
        if let Some(value) = field {
            if value.len() > MAX_FIELD_LEN {
                return Err(ApiError::Validation("Profile field too long".into()));
            }
        }
    }

    let updated = User::update_profile(
        &state.db,
        user.id,
        payload.display_name.as_deref(),
        payload.bio.as_deref(),
        payload.location.as_deref(),
    )
    .await?;

    info!("profile updated");
    Ok(Json(PublicUser::from(updated)))
}
