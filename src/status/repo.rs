use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Checkpoint row. `user_id` is a non-owning back-reference; everything the
/// row holds belongs to the reporting user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StatusCheck {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_name: String,
    pub attachments: serde_json::Value,
    pub created_at: OffsetDateTime,
}

impl StatusCheck {
    pub async fn create(db: &PgPool, user_id: Uuid, client_name: &str) -> sqlx::Result<StatusCheck> {
        sqlx::query_as::<_, StatusCheck>(
            r#"
            INSERT INTO status_checks (user_id, client_name)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(client_name)
        .fetch_one(db)
        .await
    }

    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<StatusCheck>> {
        sqlx::query_as::<_, StatusCheck>(
            r#"
            SELECT * FROM status_checks
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    pub async fn find_owned(db: &PgPool, id: Uuid, user_id: Uuid) -> sqlx::Result<Option<StatusCheck>> {
        sqlx::query_as::<_, StatusCheck>(
            "SELECT * FROM status_checks WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    pub async fn count_by_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM status_checks WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(db)
            .await
    }

    /// Append one attachment entry to the jsonb array. Returns false when the
    /// status check does not exist or belongs to another user.
    pub async fn append_attachment(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
        attachment: serde_json::Value,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE status_checks
            SET attachments = attachments || $3::jsonb
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(attachment)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
