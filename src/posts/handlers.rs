use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::session::SessionUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::{
    dto::{CreatePostRequest, Pagination},
    repo::Post,
};

const MAX_POST_LEN: usize = 5000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post).get(list_posts))
        .route("/posts/:id", get(get_post).delete(delete_post))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_post(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Json(payload): Json<CreatePostRequest>,
) -> ApiResult<Json<Post>> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("content is required".into()));
    }
    if content.len() > MAX_POST_LEN {
        return Err(ApiError::Validation("content too long".into()));
    }

    let created = Post::create(&state.db, user.id, content).await?;
    info!(post_id = %created.id, "post created");
    Ok(Json(created))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_posts(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Query(p): Query<Pagination>,
) -> ApiResult<Json<Vec<Post>>> {
    let rows = Post::list_by_user(&state.db, user.id, p.limit, p.offset).await?;
    Ok(Json(rows))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_post(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Post>> {
    match Post::get_owned(&state.db, id, user.id).await? {
        Some(found) => Ok(Json(found)),
        None => Err(ApiError::NotFound("Post not found".into())),
    }
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_post(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    if Post::delete_owned(&state.db, id, user.id).await? {
        info!(post_id = %id, "post deleted");
        Ok(Json(serde_json::json!({ "message": "Post deleted" })))
    } else {
        Err(ApiError::NotFound("Post not found".into()))
    }
}
