use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "general".into()
}

#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
    pub data_type: Option<String>,
    pub category: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

fn default_list_limit() -> usize {
    100
}

#[derive(Debug, Deserialize)]
pub struct ObjectQuery {
    pub bucket: String,
    pub object_name: String,
}

#[derive(Debug, Deserialize)]
pub struct BackupQuery {
    #[serde(default = "default_backup_type")]
    pub backup_type: String,
}

fn default_backup_type() -> String {
    "manual".into()
}

#[derive(Debug, Serialize)]
pub struct UploadResult {
    pub object_name: String,
    pub bucket: String,
    pub size: usize,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub upload_time: OffsetDateTime,
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct FileInfo {
    pub object_name: String,
    pub bucket: String,
    pub size: i64,
    pub last_modified: Option<OffsetDateTime>,
    pub etag: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListFilesResponse {
    pub files: Vec<FileInfo>,
    pub total_count: usize,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct BucketSummary {
    pub file_count: usize,
    pub total_size: i64,
    pub data_type: String,
}

#[derive(Debug, Serialize)]
pub struct StorageSummary {
    pub user_id: Uuid,
    pub total_files: usize,
    pub total_size: i64,
    pub total_size_mb: f64,
    pub buckets: HashMap<String, BucketSummary>,
    pub generated_at: OffsetDateTime,
}
