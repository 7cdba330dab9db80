use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// User record in the database. Owns every credential and token; other rows
/// reference it only through `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>, // absent for OAuth-only accounts
    pub date_of_birth: Option<Date>,
    pub age_verified: bool,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub verification_token_expires: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_token_expires: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub session_token: Option<String>,
    #[serde(skip_serializing)]
    pub session_expires: Option<OffsetDateTime>,
    pub oauth_provider: Option<String>,
    pub oauth_id: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub post_count: i32,
    pub profile_picture: Option<String>,
    pub profile_picture_updated: Option<OffsetDateTime>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub date_of_birth: Option<Date>,
    pub age_verified: bool,
    pub verification_token: &'a str,
    pub verification_token_expires: OffsetDateTime,
}

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_session_token(db: &PgPool, token: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE session_token = $1")
            .bind(token)
            .fetch_optional(db)
            .await
    }

    pub async fn create(db: &PgPool, new: &NewUser<'_>) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, date_of_birth, age_verified,
                               verification_token, verification_token_expires)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new.username)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.date_of_birth)
        .bind(new.age_verified)
        .bind(new.verification_token)
        .bind(new.verification_token_expires)
        .fetch_one(db)
        .await
    }

    /// New OAuth-only account: no password hash, provider-verified email.
    pub async fn create_oauth(
        db: &PgPool,
        username: &str,
        email: &str,
        provider: &str,
        oauth_id: &str,
        session_token: &str,
        session_expires: OffsetDateTime,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, email_verified, oauth_provider, oauth_id,
                               session_token, session_expires)
            VALUES ($1, $2, TRUE, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(provider)
        .bind(oauth_id)
        .bind(session_token)
        .bind(session_expires)
        .fetch_one(db)
        .await
    }

    /// Attach OAuth linkage and replace the session pair in one statement.
    /// Idempotent for repeated callbacks with the same provider session.
    pub async fn attach_oauth_session(
        db: &PgPool,
        id: Uuid,
        provider: &str,
        oauth_id: &str,
        session_token: &str,
        session_expires: OffsetDateTime,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET oauth_provider = $2, oauth_id = $3, email_verified = TRUE,
                session_token = $4, session_expires = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(provider)
        .bind(oauth_id)
        .bind(session_token)
        .bind(session_expires)
        .fetch_one(db)
        .await
    }

    pub async fn clear_session(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET session_token = NULL, session_expires = NULL WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_verification_token(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expires: OffsetDateTime,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE users SET verification_token = $2, verification_token_expires = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expires)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Single-use consumption: flips the verified flag and nulls the token
    /// pair in one atomic statement, so a second use cannot match.
    pub async fn consume_verification_token(
        db: &PgPool,
        token: &str,
        now: OffsetDateTime,
    ) -> sqlx::Result<Option<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE users
            SET email_verified = TRUE, verification_token = NULL, verification_token_expires = NULL
            WHERE verification_token = $1 AND verification_token_expires > $2
            RETURNING id
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(db)
        .await
    }

    pub async fn set_password_reset_token(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expires: OffsetDateTime,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE users SET password_reset_token = $2, password_reset_token_expires = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expires)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Same single-use pattern as verification: replace the hash and null the
    /// token pair atomically.
    pub async fn consume_password_reset_token(
        db: &PgPool,
        token: &str,
        new_password_hash: &str,
        now: OffsetDateTime,
    ) -> sqlx::Result<Option<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE users
            SET password_hash = $2, password_reset_token = NULL, password_reset_token_expires = NULL
            WHERE password_reset_token = $1 AND password_reset_token_expires > $3
            RETURNING id
            "#,
        )
        .bind(token)
        .bind(new_password_hash)
        .bind(now)
        .fetch_optional(db)
        .await
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        display_name: Option<&str>,
        bio: Option<&str>,
        location: Option<&str>,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET display_name = COALESCE($2, display_name),
                bio = COALESCE($3, bio),
                location = COALESCE($4, location)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(display_name)
        .bind(bio)
        .bind(location)
        .fetch_one(db)
        .await
    }

    pub async fn set_profile_picture(
        db: &PgPool,
        id: Uuid,
        object_name: &str,
        now: OffsetDateTime,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE users SET profile_picture = $2, profile_picture_updated = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(object_name)
        .bind(now)
        .execute(db)
        .await?;
        Ok(())
    }
}
