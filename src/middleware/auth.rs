//! Request authentication.
//!
//! Handlers that need a signed-in user take an [`AuthUser`] argument. The
//! access token is read from:
//! 1. the `accessToken` cookie
//! 2. `Authorization: Bearer <token>`
//! 3. `Authentication: Bearer <token>` (older clients)
//!
//! # Example
//!
//! ```rust,ignore
//! async fn current_user(auth: AuthUser) -> ApiResponse<PublicUser> {
//!     ApiResponse::ok(auth.user.to_public(), "User fetched successfully")
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::User;
use crate::services::auth::ACCESS_COOKIE;
use crate::state::AppState;

/// The signed-in user, loaded fresh from the store
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = access_token(&parts.headers)
            .ok_or_else(|| AppError::unauthorized("Unauthorized request"))?;

        let claims = state.auth.verify_access(&token).inspect_err(|e| {
            debug!(error = %e, path = %parts.uri.path(), "Rejected access token");
        })?;

        let user = state.db.get_user(claims.sub)?.ok_or_else(|| {
            warn!(user_id = %claims.sub, "Access token for missing user");
            AppError::unauthorized("Invalid access token")
        })?;

        Ok(Self { user })
    }
}

/// Access token carried by a request, if any
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, ACCESS_COOKIE)
        .or_else(|| bearer_token(headers, header::AUTHORIZATION.as_str()))
        .or_else(|| bearer_token(headers, "authentication"))
}

fn bearer_token(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Value of cookie `name` from the `Cookie` headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_cookie_value() {
        let map = headers(&[("cookie", "theme=dark; accessToken=abc.def; refreshToken=xyz")]);
        assert_eq!(cookie_value(&map, "accessToken").as_deref(), Some("abc.def"));
        assert_eq!(cookie_value(&map, "refreshToken").as_deref(), Some("xyz"));
        assert!(cookie_value(&map, "missing").is_none());

        let map = headers(&[("cookie", "a=1"), ("cookie", "accessToken=second")]);
        assert_eq!(cookie_value(&map, "accessToken").as_deref(), Some("second"));

        let map = headers(&[("cookie", "accessToken=")]);
        assert!(cookie_value(&map, "accessToken").is_none());
    }

    #[test]
    fn test_access_token_sources() {
        let map = headers(&[
            ("cookie", "accessToken=from-cookie"),
            ("authorization", "Bearer from-header"),
        ]);
        assert_eq!(access_token(&map).as_deref(), Some("from-cookie"));

        let map = headers(&[("authorization", "Bearer from-header")]);
        assert_eq!(access_token(&map).as_deref(), Some("from-header"));

        let map = headers(&[("authentication", "Bearer legacy")]);
        assert_eq!(access_token(&map).as_deref(), Some("legacy"));

        let map = headers(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert!(access_token(&map).is_none());
        assert!(access_token(&HeaderMap::new()).is_none());
    }
}
