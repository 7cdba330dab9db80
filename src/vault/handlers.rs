use std::collections::HashMap;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{dto::PublicUser, repo::User, session::SessionUser},
    error::{ApiError, ApiResult},
    state::AppState,
    status::repo::StatusCheck,
    storage::StoreError,
};

use super::{
    dto::{
        BackupQuery, BucketSummary, DocumentQuery, FileInfo, ListFilesQuery, ListFilesResponse,
        ObjectQuery, StorageSummary, UploadResult,
    },
    service::{
        bucket_for, ensure_owned, list_prefix, object_name, ATTACHMENT_MAX_BYTES, BUCKETS,
        DOCUMENT_MAX_BYTES, PROFILE_PICTURE_MAX_BYTES,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/vault/profile-picture", post(upload_profile_picture))
        .route("/vault/documents", post(upload_document))
        .route("/vault/status/:id/attachments", post(upload_status_attachment))
        .route("/vault/files", get(list_files).delete(delete_file))
        .route("/vault/download", get(download_file))
        .route("/vault/storage/summary", get(storage_summary))
        .route("/vault/backup", post(create_backup))
        .layer(DefaultBodyLimit::max(DOCUMENT_MAX_BYTES + 1024 * 1024))
}

struct UploadedFile {
    filename: String,
    content_type: String,
    body: Bytes,
}

/// Pull the single `file` field out of a multipart body.
async fn read_upload(mut multipart: Multipart) -> ApiResult<UploadedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload.bin").to_string();
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let body = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Failed to read file: {}", e)))?;
            return Ok(UploadedFile {
                filename,
                content_type,
                body,
            });
        }
    }
    Err(ApiError::Validation("file field is required".into()))
}

fn store_err(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound => ApiError::NotFound("File not found".into()),
        StoreError::Other(e) => ApiError::Upstream(e.to_string()),
    }
}

fn upload_metadata(user_id: Uuid, data_type: &str, filename: &str) -> HashMap<String, String> {
    HashMap::from([
        ("user-id".to_string(), user_id.to_string()),
        ("data-type".to_string(), data_type.to_string()),
        ("original-filename".to_string(), filename.to_string()),
    ])
}

async fn store_upload(
    state: &AppState,
    user_id: Uuid,
    data_type: &str,
    category: Option<&str>,
    file: UploadedFile,
) -> ApiResult<UploadResult> {
    let bucket = bucket_for(data_type)
        .ok_or_else(|| ApiError::Validation(format!("Unknown data type: {}", data_type)))?;
    let now = OffsetDateTime::now_utc();
    let key = object_name(user_id, data_type, category, &file.filename, now);
    let size = file.body.len();

    state
        .storage
        .put_object(
            bucket,
            &key,
            file.body,
            &file.content_type,
            upload_metadata(user_id, data_type, &file.filename),
        )
        .await
        .map_err(store_err)?;

    info!(%user_id, %bucket, object_name = %key, size, "object uploaded");
    Ok(UploadResult {
        object_name: key.clone(),
        bucket: bucket.to_string(),
        size,
        content_type: file.content_type,
        category: category.map(|c| c.to_string()),
        upload_time: now,
        location: format!("{}/{}/{}", state.config.storage.endpoint, bucket, key),
    })
}

#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn upload_profile_picture(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    multipart: Multipart,
) -> ApiResult<Json<UploadResult>> {
    let file = read_upload(multipart).await?;
    if !file.content_type.starts_with("image/") {
        return Err(ApiError::Validation("File must be an image".into()));
    }
    if file.body.len() > PROFILE_PICTURE_MAX_BYTES {
        return Err(ApiError::Validation("Image too large (max 10MB)".into()));
    }

    let result = store_upload(&state, user.id, "profile_pictures", None, file).await?;
    User::set_profile_picture(
        &state.db,
        user.id,
        &result.object_name,
        result.upload_time,
    )
    .await?;
    Ok(Json(result))
}

#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn upload_document(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Query(query): Query<DocumentQuery>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResult>> {
    let file = read_upload(multipart).await?;
    if file.body.len() > DOCUMENT_MAX_BYTES {
        return Err(ApiError::Validation("File too large (max 100MB)".into()));
    }

    let result = store_upload(&state, user.id, "documents", Some(&query.category), file).await?;
    Ok(Json(result))
}

#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn upload_status_attachment(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(status_id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResult>> {
    // Ownership first: no orphan uploads for someone else's status check.
    if StatusCheck::find_owned(&state.db, status_id, user.id)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("Status check not found".into()));
    }

    let file = read_upload(multipart).await?;
    if file.body.len() > ATTACHMENT_MAX_BYTES {
        return Err(ApiError::Validation("Attachment too large (max 50MB)".into()));
    }
    let original_filename = file.filename.clone();

    let result = store_upload(
        &state,
        user.id,
        "status_attachments",
        Some(&status_id.to_string()),
        file,
    )
    .await?;

    let linked = StatusCheck::append_attachment(
        &state.db,
        status_id,
        user.id,
        serde_json::json!([{
            "object_name": result.object_name,
            "bucket": result.bucket,
            "filename": original_filename,
            "size": result.size,
            "uploaded_at": result.upload_time,
        }]),
    )
    .await?;
    if !linked {
        warn!(%status_id, "attachment stored but status row vanished");
    }

    Ok(Json(result))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_files(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Query(query): Query<ListFilesQuery>,
) -> ApiResult<Json<ListFilesResponse>> {
    let prefix = list_prefix(
        user.id,
        query.data_type.as_deref(),
        query.category.as_deref(),
    );

    let buckets: Vec<&'static str> = match query.data_type.as_deref() {
        Some(data_type) => bucket_for(data_type).into_iter().collect(),
        None => BUCKETS.iter().map(|(_, b)| *b).collect(),
    };

    let mut files = Vec::new();
    for bucket in buckets {
        match state.storage.list_objects(bucket, &prefix).await {
            Ok(objects) => files.extend(objects.into_iter().map(|o| FileInfo {
                object_name: o.key,
                bucket: bucket.to_string(),
                size: o.size,
                last_modified: o.last_modified,
                etag: o.etag,
            })),
            Err(e) => {
                warn!(error = %e, %bucket, "listing failed, skipping bucket");
            }
        }
    }

    files.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
    files.truncate(query.limit);

    let total_count = files.len();
    Ok(Json(ListFilesResponse {
        files,
        total_count,
        user_id: user.id,
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn download_file(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Query(query): Query<ObjectQuery>,
) -> ApiResult<Response> {
    ensure_owned(user.id, &query.object_name)?;

    let data = state
        .storage
        .get_object(&query.bucket, &query.object_name)
        .await
        .map_err(store_err)?;

    let filename = query
        .object_name
        .rsplit('/')
        .next()
        .unwrap_or("download")
        .to_string();

    info!(object_name = %query.object_name, "file downloaded");
    let headers = [
        (
            header::CONTENT_TYPE,
            "application/octet-stream".to_string(),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", filename),
        ),
    ];
    Ok((headers, data).into_response())
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_file(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Query(query): Query<ObjectQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    ensure_owned(user.id, &query.object_name)?;

    state
        .storage
        .delete_object(&query.bucket, &query.object_name)
        .await
        .map_err(store_err)?;

    info!(object_name = %query.object_name, "file deleted");
    Ok(Json(serde_json::json!({
        "message": "File deleted successfully",
        "object_name": query.object_name,
        "bucket": query.bucket,
    })))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn storage_summary(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> ApiResult<Json<StorageSummary>> {
    let prefix = list_prefix(user.id, None, None);
    let mut buckets = HashMap::new();
    let mut total_files = 0usize;
    let mut total_size = 0i64;

    for (data_type, bucket) in BUCKETS {
        match state.storage.list_objects(bucket, &prefix).await {
            Ok(objects) => {
                let file_count = objects.len();
                let bucket_size: i64 = objects.iter().map(|o| o.size).sum();
                total_files += file_count;
                total_size += bucket_size;
                buckets.insert(
                    bucket.to_string(),
                    BucketSummary {
                        file_count,
                        total_size: bucket_size,
                        data_type: data_type.to_string(),
                    },
                );
            }
            Err(e) => {
                warn!(error = %e, %bucket, "summary listing failed, skipping bucket");
            }
        }
    }

    Ok(Json(StorageSummary {
        user_id: user.id,
        total_files,
        total_size,
        total_size_mb: (total_size as f64) / (1024.0 * 1024.0),
        buckets,
        generated_at: OffsetDateTime::now_utc(),
    }))
}

/// Snapshot of the user's account data, stored in the backups bucket.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn create_backup(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Query(query): Query<BackupQuery>,
) -> ApiResult<Json<UploadResult>> {
    let user_id = user.id;
    let status_checks_count = StatusCheck::count_by_user(&state.db, user_id).await?;
    let now = OffsetDateTime::now_utc();

    let backup = serde_json::json!({
        "user_id": user_id,
        "backup_type": query.backup_type,
        "created_at": now,
        "user_data": PublicUser::from(user),
        "status_checks_count": status_checks_count,
    });
    let body = Bytes::from(serde_json::to_vec_pretty(&backup).map_err(anyhow::Error::new)?);
    let size = body.len();

    let key = format!(
        "{}/backups/{}/backup_{:04}{:02}{:02}_{:02}{:02}{:02}.json",
        user_id,
        query.backup_type,
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    );
    let bucket = "user-backups";

    state
        .storage
        .put_object(
            bucket,
            &key,
            body,
            "application/json",
            upload_metadata(user_id, "backups", "backup.json"),
        )
        .await
        .map_err(store_err)?;

    info!(object_name = %key, "backup created");
    Ok(Json(UploadResult {
        object_name: key.clone(),
        bucket: bucket.to_string(),
        size,
        content_type: "application/json".into(),
        category: Some(query.backup_type),
        upload_time: now,
        location: format!("{}/{}/{}", state.config.storage.endpoint, bucket, key),
    }))
}
