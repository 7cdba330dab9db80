use std::collections::HashMap;

use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("object not found")]
    NotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<OffsetDateTime>,
    pub etag: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> StoreResult<()>;
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Bytes>;
    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()>;
    async fn list_objects(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<StoredObject>>;
    async fn list_buckets(&self) -> StoreResult<Vec<String>>;
    async fn ensure_bucket(&self, bucket: &str) -> StoreResult<()>;
}

/// S3/MinIO-backed store with static credentials and path-style addressing.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub async fn new(
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        region: &str,
    ) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ))
            .endpoint_url(endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> StoreResult<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .set_metadata(Some(metadata))
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Bytes> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map_or(false, |s| s.is_no_such_key()) {
                    StoreError::NotFound
                } else {
                    StoreError::Other(anyhow::Error::new(e).context("s3 get_object"))
                }
            })?;

        let data = resp
            .body
            .collect()
            .await
            .context("s3 read object body")?
            .into_bytes();
        Ok(data)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<StoredObject>> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .send()
            .await
            .context("s3 list_objects_v2")?;

        let objects = resp
            .contents()
            .iter()
            .filter_map(|o| {
                let key = o.key()?.to_string();
                Some(StoredObject {
                    key,
                    size: o.size().unwrap_or(0),
                    last_modified: o
                        .last_modified()
                        .and_then(|t| OffsetDateTime::from_unix_timestamp(t.secs()).ok()),
                    etag: o.e_tag().map(|e| e.to_string()),
                })
            })
            .collect();
        Ok(objects)
    }

    async fn list_buckets(&self) -> StoreResult<Vec<String>> {
        let resp = self
            .client
            .list_buckets()
            .send()
            .await
            .context("s3 list_buckets")?;
        Ok(resp
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(|n| n.to_string()))
            .collect())
    }

    async fn ensure_bucket(&self, bucket: &str) -> StoreResult<()> {
        match self.client.create_bucket().bucket(bucket).send().await {
            Ok(_) => {
                tracing::info!(%bucket, "bucket created");
                Ok(())
            }
            Err(e) => {
                let already_there = e.as_service_error().map_or(false, |s| {
                    s.is_bucket_already_owned_by_you() || s.is_bucket_already_exists()
                });
                if already_there {
                    Ok(())
                } else {
                    Err(StoreError::Other(
                        anyhow::Error::new(e).context(format!("s3 create bucket {}", bucket)),
                    ))
                }
            }
        }
    }
}
