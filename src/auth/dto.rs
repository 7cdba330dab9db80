use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub date_of_birth: Option<String>, // YYYY-MM-DD
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Redacted user view returned to clients. Never carries hashes or tokens.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub age_verified: bool,
    pub email_verified: bool,
    pub oauth_provider: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub post_count: i32,
    pub profile_picture: Option<String>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            age_verified: user.age_verified,
            email_verified: user.email_verified,
            oauth_provider: user.oauth_provider,
            display_name: user.display_name,
            bio: user.bio,
            location: user.location,
            post_count: user.post_count,
            profile_picture: user.profile_picture,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// Response returned after register and login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "checker".into(),
            email: "checker@example.com".into(),
            password_hash: Some("$argon2id$secret".into()),
            date_of_birth: None,
            age_verified: true,
            email_verified: false,
            verification_token: Some("verify-me".into()),
            verification_token_expires: None,
            password_reset_token: Some("reset-me".into()),
            password_reset_token_expires: None,
            session_token: Some("session-secret".into()),
            session_expires: None,
            oauth_provider: None,
            oauth_id: None,
            display_name: None,
            bio: None,
            location: None,
            post_count: 0,
            profile_picture: None,
            profile_picture_updated: None,
            is_active: true,
            created_at: datetime!(2026-01-01 00:00:00 UTC),
        }
    }

    #[test]
    fn public_view_redacts_credentials() {
        let json = serde_json::to_string(&PublicUser::from(sample_user())).unwrap();
        assert!(json.contains("checker@example.com"));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("verify-me"));
        assert!(!json.contains("reset-me"));
        assert!(!json.contains("session-secret"));
    }

    #[test]
    fn user_record_never_serializes_secrets() {
        // Even the raw record skips the sensitive columns on the way out.
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("session-secret"));
        assert!(!json.contains("verify-me"));
    }
}
