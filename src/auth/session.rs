use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::OffsetDateTime;
use tracing::warn;

use crate::{
    auth::{jwt::JwtKeys, repo::User},
    config::AuthPolicy,
    error::{ApiError, ApiResult},
    state::AppState,
};

pub const SESSION_COOKIE: &str = "session_token";

/// One credential found on the request, in resolution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AuthCandidate {
    SessionCookie(String),
    Bearer(String),
}

/// Collect credentials in the fixed resolution order: session cookie first,
/// bearer header second. The order is part of the auth contract for clients
/// that present both; do not reorder.
pub(crate) fn auth_candidates(headers: &HeaderMap, policy: &AuthPolicy) -> Vec<AuthCandidate> {
    let mut candidates = Vec::new();

    if policy.allow_session_cookie {
        let jar = CookieJar::from_headers(headers);
        if let Some(cookie) = jar.get(SESSION_COOKIE) {
            candidates.push(AuthCandidate::SessionCookie(cookie.value().to_string()));
        }
    }

    if policy.allow_bearer {
        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")));
        if let Some(token) = bearer {
            candidates.push(AuthCandidate::Bearer(token.to_string()));
        }
    }

    candidates
}

/// Walk the candidates until one authenticates. A candidate that fails is
/// never fatal; it just falls through to the next one.
pub async fn resolve_identity(state: &AppState, headers: &HeaderMap) -> ApiResult<Option<User>> {
    for candidate in auth_candidates(headers, &state.config.auth_policy) {
        match candidate {
            AuthCandidate::SessionCookie(token) => {
                if let Some(user) = User::find_by_session_token(&state.db, &token).await? {
                    let now = OffsetDateTime::now_utc();
                    if user.session_expires.map_or(false, |exp| exp > now) {
                        return Ok(Some(user));
                    }
                    // Expired session: drop it server-side, keep resolving.
                    User::clear_session(&state.db, user.id).await?;
                }
            }
            AuthCandidate::Bearer(token) => {
                let keys = JwtKeys::from_ref(state);
                if let Ok(claims) = keys.verify(&token) {
                    if let Some(user) = User::find_by_id(&state.db, claims.sub).await? {
                        return Ok(Some(user));
                    }
                }
            }
        }
    }
    Ok(None)
}

/// Extractor for protected endpoints: rejects with 401 when no credential
/// resolves.
pub struct SessionUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match resolve_identity(state, &parts.headers).await? {
            Some(user) => Ok(SessionUser(user)),
            None => Err(ApiError::Authentication(
                "No valid authentication".to_string(),
            )),
        }
    }
}

/// Never-failing variant for endpoints that tolerate anonymous callers
/// (logout must succeed either way).
pub struct MaybeSessionUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeSessionUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = match resolve_identity(state, &parts.headers).await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "session resolution failed, treating as anonymous");
                None
            }
        };
        Ok(MaybeSessionUser(user))
    }
}

/// Cross-site-capable session cookie: http-only, secure, `SameSite=None`,
/// path `/`.
pub fn session_cookie(token: &str, ttl_days: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .max_age(time::Duration::days(ttl_days))
        .build()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(cookie: Option<&str>, authorization: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(c) = cookie {
            map.insert(axum::http::header::COOKIE, HeaderValue::from_str(c).unwrap());
        }
        if let Some(a) = authorization {
            map.insert(AUTHORIZATION, HeaderValue::from_str(a).unwrap());
        }
        map
    }

    fn both_modes() -> AuthPolicy {
        AuthPolicy {
            allow_session_cookie: true,
            allow_bearer: true,
        }
    }

    #[test]
    fn cookie_precedes_bearer() {
        let headers = headers(Some("session_token=opaque-123"), Some("Bearer jwt-456"));
        let candidates = auth_candidates(&headers, &both_modes());
        assert_eq!(
            candidates,
            vec![
                AuthCandidate::SessionCookie("opaque-123".into()),
                AuthCandidate::Bearer("jwt-456".into()),
            ]
        );
    }

    #[test]
    fn bearer_alone_is_accepted() {
        let headers = headers(None, Some("Bearer jwt-456"));
        let candidates = auth_candidates(&headers, &both_modes());
        assert_eq!(candidates, vec![AuthCandidate::Bearer("jwt-456".into())]);
    }

    #[test]
    fn malformed_authorization_is_skipped() {
        let headers = headers(None, Some("Basic dXNlcjpwYXNz"));
        assert!(auth_candidates(&headers, &both_modes()).is_empty());
    }

    #[test]
    fn unrelated_cookies_are_ignored() {
        let headers = headers(Some("theme=dark; other=1"), None);
        assert!(auth_candidates(&headers, &both_modes()).is_empty());
    }

    #[test]
    fn policy_can_disable_modes() {
        let headers = headers(Some("session_token=opaque-123"), Some("Bearer jwt-456"));

        let cookie_only = AuthPolicy {
            allow_session_cookie: true,
            allow_bearer: false,
        };
        assert_eq!(
            auth_candidates(&headers, &cookie_only),
            vec![AuthCandidate::SessionCookie("opaque-123".into())]
        );

        let bearer_only = AuthPolicy {
            allow_session_cookie: false,
            allow_bearer: true,
        };
        assert_eq!(
            auth_candidates(&headers, &bearer_only),
            vec![AuthCandidate::Bearer("jwt-456".into())]
        );
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("tok", 7);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
        assert_eq!(cookie.path(), Some("/"));
    }
}
