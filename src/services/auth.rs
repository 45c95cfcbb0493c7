//! Token issuance and password hashing.
//!
//! Access and refresh tokens are HS256 JWTs signed with different secrets, so
//! one can never be presented as the other. Only the SHA-256 of the current
//! refresh token is stored on the user; presenting any other refresh token
//! (an older one, or one issued before logout) fails.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderName;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AppError, Result};
use crate::models::User;

/// Cookie carrying the access token
pub const ACCESS_COOKIE: &str = "accessToken";
/// Cookie carrying the refresh token
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Claims of an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub fullname: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of a refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    /// Makes every issued refresh token distinct
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Freshly issued tokens
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies tokens, builds auth cookies
pub struct AuthService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    cookie_secure: bool,
    validation: Validation,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            access_ttl: Duration::seconds(config.access_token_ttl_secs as i64),
            refresh_ttl: Duration::seconds(config.refresh_token_ttl_secs as i64),
            cookie_secure: config.cookie_secure,
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Issue an access / refresh pair for `user`
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair> {
        let now = Utc::now();

        let access = AccessClaims {
            sub: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            fullname: user.fullname.clone(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };
        let refresh = RefreshClaims {
            sub: user.id,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
        };

        Ok(TokenPair {
            access_token: encode(&Header::default(), &access, &self.access_encoding)
                .map_err(|e| AppError::internal(format!("Failed to sign access token: {}", e)))?,
            refresh_token: encode(&Header::default(), &refresh, &self.refresh_encoding)
                .map_err(|e| AppError::internal(format!("Failed to sign refresh token: {}", e)))?,
        })
    }

    /// Verify signature and expiry of an access token
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims> {
        Ok(decode::<AccessClaims>(token, &self.access_decoding, &self.validation)?.claims)
    }

    /// Verify signature and expiry of a refresh token
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims> {
        Ok(decode::<RefreshClaims>(token, &self.refresh_decoding, &self.validation)?.claims)
    }

    /// `Set-Cookie` headers storing both tokens
    pub fn session_cookies(&self, pair: &TokenPair) -> [(HeaderName, String); 2] {
        [
            (
                SET_COOKIE,
                self.cookie(ACCESS_COOKIE, &pair.access_token, self.access_ttl.num_seconds()),
            ),
            (
                SET_COOKIE,
                self.cookie(REFRESH_COOKIE, &pair.refresh_token, self.refresh_ttl.num_seconds()),
            ),
        ]
    }

    /// `Set-Cookie` headers removing both tokens
    pub fn cleared_cookies(&self) -> [(HeaderName, String); 2] {
        [
            (SET_COOKIE, self.cookie(ACCESS_COOKIE, "", 0)),
            (SET_COOKIE, self.cookie(REFRESH_COOKIE, "", 0)),
        ]
    }

    fn cookie(&self, name: &str, value: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
            name, value, max_age
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Hash a password into an argon2 PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("Password hashing failed: {}", e)))
}

/// Check a password against a stored PHC string
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Argon2 is deliberately slow; keep it off the async workers
pub async fn hash_password_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::internal(format!("Hashing task failed: {}", e)))?
}

pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::internal(format!("Verification task failed: {}", e)))
}

/// SHA-256 hex digest stored in place of the refresh token
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            access_token_secret: "access-secret".to_string(),
            access_token_ttl_secs: 60,
            refresh_token_secret: "refresh-secret".to_string(),
            refresh_token_ttl_secs: 600,
            cookie_secure: true,
        }
    }

    fn user() -> User {
        User::new("tester", "t@example.com", "Tester", String::new(), String::new(), None)
    }

    #[test]
    fn test_token_pair_round_trip() {
        let auth = AuthService::new(&config());
        let user = user();
        let pair = auth.issue_pair(&user).unwrap();

        let access = auth.verify_access(&pair.access_token).unwrap();
        assert_eq!(access.sub, user.id);
        assert_eq!(access.username, "tester");

        let refresh = auth.verify_refresh(&pair.refresh_token).unwrap();
        assert_eq!(refresh.sub, user.id);
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let auth = AuthService::new(&config());
        let pair = auth.issue_pair(&user()).unwrap();

        assert!(matches!(
            auth.verify_access(&pair.refresh_token),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.verify_refresh(&pair.access_token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let auth = AuthService::new(&config());
        let user = user();
        let a = auth.issue_pair(&user).unwrap();
        let b = auth.issue_pair(&user).unwrap();
        assert_ne!(a.refresh_token, b.refresh_token);
        assert_ne!(hash_token(&a.refresh_token), hash_token(&b.refresh_token));
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = AuthService::new(&config());
        let past = Utc::now() - Duration::hours(2);
        let claims = RefreshClaims {
            sub: Uuid::new_v4(),
            jti: Uuid::new_v4(),
            iat: past.timestamp(),
            exp: (past + Duration::minutes(1)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"refresh-secret"),
        )
        .unwrap();

        let err = auth.verify_refresh(&token).unwrap_err();
        assert_eq!(err.to_string(), "Token has expired");
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-hash"));
    }

    #[test]
    fn test_cookie_attributes() {
        let auth = AuthService::new(&config());
        let pair = TokenPair {
            access_token: "a".into(),
            refresh_token: "r".into(),
        };
        let [(_, access), (_, refresh)] = auth.session_cookies(&pair);
        assert!(access.starts_with("accessToken=a;"));
        assert!(access.contains("HttpOnly"));
        assert!(access.contains("Max-Age=60"));
        assert!(access.ends_with("; Secure"));
        assert!(refresh.contains("Max-Age=600"));

        let [(_, cleared), _] = auth.cleared_cookies();
        assert!(cleared.starts_with("accessToken=;"));
        assert!(cleared.contains("Max-Age=0"));
    }

    #[test]
    fn test_hash_token_is_hex_sha256() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
