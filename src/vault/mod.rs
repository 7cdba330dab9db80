use crate::{state::AppState, storage::ObjectStore};
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod service;

pub fn router() -> Router<AppState> {
    handlers::router()
}

/// Create the per-data-type buckets at startup. An unreachable store is
/// logged, not fatal: the API still serves everything that doesn't touch it.
pub async fn initialize(store: &dyn ObjectStore) {
    match store.list_buckets().await {
        Ok(_) => {
            for (data_type, bucket) in service::BUCKETS {
                match store.ensure_bucket(bucket).await {
                    Ok(()) => tracing::info!(%bucket, data_type, "bucket ready"),
                    Err(e) => {
                        tracing::error!(error = %e, %bucket, "failed to initialize bucket");
                    }
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "object store unreachable, vault running degraded");
        }
    }
}
