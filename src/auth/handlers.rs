use axum::{
    extract::{FromRef, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use lazy_static::lazy_static;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthUrlResponse, EmailRequest, LoginRequest, MessageResponse, PublicUser,
            RegisterRequest, ResetPasswordRequest, TokenResponse, VerifyEmailRequest,
        },
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::{NewUser, User},
        session::{
            clear_session_cookie, session_cookie, MaybeSessionUser, SessionUser,
        },
        tokens::issue_opaque,
        validate::{age_on, is_valid_email, parse_birth_date},
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

const VERIFICATION_TOKEN_TTL: Duration = Duration::hours(24);
const PASSWORD_RESET_TOKEN_TTL: Duration = Duration::hours(1);
const MIN_PASSWORD_LEN: usize = 8;
const MIN_REGISTRATION_AGE: i32 = 18;

/// Uniform responses: identical whether or not the email exists, so the
/// endpoints cannot be used to enumerate accounts.
pub const VERIFICATION_SENT: &str = "If the email exists, a verification email has been sent";
pub const RESET_SENT: &str = "If the email exists, a password reset email has been sent";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/resend-verification", post(resend_verification))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/google", get(google_login))
        .route("/auth/google/callback", post(google_callback))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<Json<TokenResponse>> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.username.is_empty() {
        return Err(ApiError::Validation("Username is required".into()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }
    if User::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        warn!(username = %payload.username, "username already taken");
        return Err(ApiError::Conflict("Username already taken".into()));
    }

    // Age gate: parse failures and under-18 are distinct validation errors.
    let mut age_verified = false;
    let mut date_of_birth = None;
    if let Some(raw) = payload.date_of_birth.as_deref() {
        let birth = parse_birth_date(raw)
            .map_err(|_| ApiError::Validation("Invalid date format. Use YYYY-MM-DD".into()))?;
        let age = age_on(OffsetDateTime::now_utc().date(), birth);
        if age < MIN_REGISTRATION_AGE {
            warn!(age, "underage registration rejected");
            return Err(ApiError::Validation(
                "Must be 18 or older to register".into(),
            ));
        }
        age_verified = true;
        date_of_birth = Some(birth);
    }

    let password_hash = hash_password(&payload.password)?;
    let verification_token = issue_opaque();
    let user = User::create(
        &state.db,
        &NewUser {
            username: &payload.username,
            email: &payload.email,
            password_hash: &password_hash,
            date_of_birth,
            age_verified,
            verification_token: &verification_token,
            verification_token_expires: OffsetDateTime::now_utc() + VERIFICATION_TOKEN_TTL,
        },
    )
    .await?;

    if let Err(e) = state
        .mailer
        .send_verification_email(&user.email, &verification_token)
        .await
    {
        warn!(error = %e, user_id = %user.id, "verification email not sent");
    }

    let access_token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".into(),
        user: PublicUser::from(user),
    }))
}

lazy_static! {
    // Verified on every miss path so lookups that find no account (or an
    // OAuth-only account) take as long as a real password check.
    static ref PHANTOM_HASH: String =
        hash_password("netcheck-phantom-credential").unwrap_or_default();
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email).await?;

    let (hash, account_usable) = match user.as_ref().and_then(|u| u.password_hash.as_deref()) {
        Some(hash) => (hash.to_string(), true),
        None => (PHANTOM_HASH.clone(), false),
    };

    let password_ok = verify_password(&payload.password, &hash).unwrap_or(false);
    let user = match user {
        Some(user) if password_ok && account_usable => user,
        _ => {
            warn!(email = %payload.email, "login rejected");
            return Err(ApiError::Authentication(
                "Incorrect email or password".into(),
            ));
        }
    };

    let access_token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".into(),
        user: PublicUser::from(user),
    }))
}

/// Logout never fails visibly: the session is dropped server-side when it
/// resolves, and the cookie is cleared either way.
#[instrument(skip(state, jar, user))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    MaybeSessionUser(user): MaybeSessionUser,
) -> (CookieJar, Json<MessageResponse>) {
    if let Some(user) = user {
        if let Err(e) = User::clear_session(&state.db, user.id).await {
            warn!(error = %e, user_id = %user.id, "failed to clear session on logout");
        } else {
            info!(user_id = %user.id, "user logged out");
        }
    }

    let jar = jar.add(clear_session_cookie());
    (jar, Json(MessageResponse::new("Logged out successfully")))
}

#[instrument(skip_all)]
pub async fn me(SessionUser(user): SessionUser) -> Json<PublicUser> {
    Json(PublicUser::from(user))
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let now = OffsetDateTime::now_utc();
    match User::consume_verification_token(&state.db, &payload.token, now).await? {
        Some(user_id) => {
            info!(%user_id, "email verified");
            Ok(Json(MessageResponse::new("Email verified successfully")))
        }
        None => Err(ApiError::Validation(
            "Invalid or expired verification token".into(),
        )),
    }
}

#[instrument(skip(state, payload))]
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(mut payload): Json<EmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    if let Some(user) = User::find_by_email(&state.db, &payload.email).await? {
        if !user.email_verified {
            let token = issue_opaque();
            let expires = OffsetDateTime::now_utc() + VERIFICATION_TOKEN_TTL;
            User::set_verification_token(&state.db, user.id, &token, expires).await?;
            if let Err(e) = state.mailer.send_verification_email(&user.email, &token).await {
                warn!(error = %e, user_id = %user.id, "verification email not sent");
            }
        }
    }

    // Same body whether the account exists, is verified, or is unknown.
    Ok(Json(MessageResponse::new(VERIFICATION_SENT)))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<EmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    if let Some(user) = User::find_by_email(&state.db, &payload.email).await? {
        let token = issue_opaque();
        let expires = OffsetDateTime::now_utc() + PASSWORD_RESET_TOKEN_TTL;
        User::set_password_reset_token(&state.db, user.id, &token, expires).await?;
        if let Err(e) = state
            .mailer
            .send_password_reset_email(&user.email, &token)
            .await
        {
            warn!(error = %e, user_id = %user.id, "password reset email not sent");
        }
    }

    Ok(Json(MessageResponse::new(RESET_SENT)))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation("Password too short".into()));
    }

    let new_hash = hash_password(&payload.new_password)?;
    let now = OffsetDateTime::now_utc();
    match User::consume_password_reset_token(&state.db, &payload.token, &new_hash, now).await? {
        Some(user_id) => {
            info!(%user_id, "password reset");
            Ok(Json(MessageResponse::new("Password reset successfully")))
        }
        None => Err(ApiError::Validation("Invalid or expired reset token".into())),
    }
}

#[instrument(skip(state))]
pub async fn google_login(State(state): State<AppState>) -> Json<AuthUrlResponse> {
    Json(AuthUrlResponse {
        auth_url: state.oauth.auth_url(),
    })
}

/// Exchange the provider session handle for identity data and upsert the
/// account by email. Re-running with the same handle updates the same row.
#[instrument(skip(state, jar, headers))]
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> ApiResult<(CookieJar, Json<PublicUser>)> {
    let session_id = headers
        .get("X-Session-ID")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Validation("Session ID required".into()))?;

    let provider = state
        .oauth
        .exchange(session_id)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    let email = provider.email.trim().to_lowercase();
    let ttl_days = state.config.session_ttl_days;
    let session_expires = OffsetDateTime::now_utc() + Duration::days(ttl_days);

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(existing) => {
            User::attach_oauth_session(
                &state.db,
                existing.id,
                "google",
                &provider.id,
                &provider.session_token,
                session_expires,
            )
            .await?
        }
        None => {
            let mut username = provider.name.trim().to_string();
            if username.is_empty() {
                username = email.split('@').next().unwrap_or("user").to_string();
            }
            // Provider display names are not unique here; fall back to a
            // provider-id-qualified name so re-runs stay idempotent.
            if User::find_by_username(&state.db, &username).await?.is_some() {
                username = format!("{}-{}", username, provider.id);
            }
            User::create_oauth(
                &state.db,
                &username,
                &email,
                "google",
                &provider.id,
                &provider.session_token,
                session_expires,
            )
            .await?
        }
    };

    info!(user_id = %user.id, "oauth session established");
    let jar = jar.add(session_cookie(&provider.session_token, ttl_days));
    Ok((jar, Json(PublicUser::from(user))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumeration_safe_messages_are_constants() {
        // Both flows answer from a single constant, so the existing and
        // non-existing email branches cannot drift apart.
        assert_eq!(VERIFICATION_SENT, "If the email exists, a verification email has been sent");
        assert_eq!(RESET_SENT, "If the email exists, a password reset email has been sent");
    }

    #[test]
    fn phantom_hash_is_a_valid_argon2_hash() {
        assert!(PHANTOM_HASH.starts_with("$argon2"));
        assert!(!verify_password("wrong-guess", &PHANTOM_HASH).unwrap_or(true));
    }
}
