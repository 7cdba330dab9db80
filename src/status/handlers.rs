use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::session::SessionUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::{
    dto::{CreateStatusRequest, Pagination},
    repo::StatusCheck,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/status", post(create_status).get(list_status))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_status(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Json(payload): Json<CreateStatusRequest>,
) -> ApiResult<Json<StatusCheck>> {
    let client_name = payload.client_name.trim();
    if client_name.is_empty() {
        return Err(ApiError::Validation("client_name is required".into()));
    }

    let status = StatusCheck::create(&state.db, user.id, client_name).await?;
    info!(status_id = %status.id, "status check recorded");
    Ok(Json(status))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_status(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Query(p): Query<Pagination>,
) -> ApiResult<Json<Vec<StatusCheck>>> {
    let rows = StatusCheck::list_by_user(&state.db, user.id, p.limit, p.offset).await?;
    Ok(Json(rows))
}
