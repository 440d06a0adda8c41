pub(crate) use crate::auth::dto::{Claims, JwtKeys, TokenKind};
use crate::config::{JwtConfig, SessionConfig};
use crate::error::ApiError;
use crate::state::AppState;
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, warn};
use uuid::Uuid;

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

pub(crate) fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from_config(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: Duration::from_secs((cfg.ttl_minutes.max(1) as u64) * 60),
            refresh_ttl: Duration::from_secs((cfg.refresh_ttl_minutes.max(1) as u64) * 60),
        }
    }

    fn sign_with_kind(&self, user_id: Uuid, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Access)
    }
    pub fn sign_refresh(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Refresh)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            anyhow::bail!("not a refresh token");
        }
        Ok(claims)
    }
}

/// HttpOnly cookie carrying the access token.
pub fn session_cookie(cfg: &SessionConfig, token: String, ttl: Duration) -> Cookie<'static> {
    Cookie::build((cfg.cookie_name.clone(), token))
        .http_only(true)
        .secure(cfg.secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(TimeDuration::seconds(ttl.as_secs() as i64))
        .build()
}

/// Already-expired session cookie; sent on logout whether or not the
/// request carried one.
pub fn cleared_session_cookie(cfg: &SessionConfig) -> Cookie<'static> {
    Cookie::build((cfg.cookie_name.clone(), ""))
        .http_only(true)
        .secure(cfg.secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(TimeDuration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}

/// Authenticated caller, resolved from `Authorization: Bearer` or the session cookie.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = access_token(parts, &state.config.session.cookie_name)?;
        let keys = JwtKeys::from_ref(state);

        let claims = match keys.verify(&token) {
            Ok(c) => c,
            Err(_) => {
                warn!("invalid or expired token");
                return Err(ApiError::unauthorized("Invalid or expired token"));
            }
        };

        if claims.kind != TokenKind::Access {
            return Err(ApiError::unauthorized("Access token required"));
        }

        Ok(AuthUser(claims.sub))
    }
}

fn access_token(parts: &Parts, cookie_name: &str) -> Result<String, ApiError> {
    if let Some(header) = parts.headers.get(AUTHORIZATION) {
        return header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_owned)
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header"));
    }
    CookieJar::from_headers(&parts.headers)
        .get(cookie_name)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))
}

#[cfg(test)]
mod password_tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn usernames_are_checked_and_normalized() {
        assert!(is_valid_username("meal.prep_fan-1"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username(&"x".repeat(33)));
        assert_eq!(normalize_username("  Alice "), "alice");
    }
}

#[cfg(test)]
mod jwt_tests {
    use super::*;

    fn make_keys(issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: "dev-secret".into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        })
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_keys("test-issuer", "test-aud");
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).expect("sign access");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn verify_refresh_rejects_access_token() {
        let keys = make_keys("iss", "aud");
        let token = keys.sign_access(Uuid::new_v4()).expect("sign access");
        let err = keys.verify_refresh(&token).unwrap_err();
        assert!(err.to_string().contains("not a refresh token"));
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good_keys = make_keys("good-iss", "good-aud");
        let bad_keys = make_keys("bad-iss", "bad-aud");
        let token = good_keys.sign_access(Uuid::new_v4()).expect("sign access");
        assert!(bad_keys.verify(&token).is_err());
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cfg = SessionConfig {
            cookie_name: "session".into(),
            secure: true,
        };
        let cookie = session_cookie(&cfg, "tok".into(), Duration::from_secs(600));
        assert_eq!(cookie.name(), "session");
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        let cfg = SessionConfig {
            cookie_name: "session".into(),
            secure: false,
        };
        let cookie = cleared_session_cookie(&cfg);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(TimeDuration::ZERO));
        assert!(cookie.to_string().contains("Max-Age=0"));
    }
}

#[cfg(test)]
mod extractor_tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<(&str, String)>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/recipes");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn accepts_bearer_header() {
        let state = AppState::fake();
        let user_id = Uuid::new_v4();
        let token = JwtKeys::from_ref(&state).sign_access(user_id).unwrap();
        let mut parts = parts(Some(("authorization", format!("Bearer {token}"))));
        let AuthUser(id) = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(id, user_id);
    }

    #[tokio::test]
    async fn accepts_session_cookie() {
        let state = AppState::fake();
        let user_id = Uuid::new_v4();
        let token = JwtKeys::from_ref(&state).sign_access(user_id).unwrap();
        let mut parts = parts(Some(("cookie", format!("theme=dark; session={token}"))));
        let AuthUser(id) = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(id, user_id);
    }

    #[tokio::test]
    async fn rejects_missing_credentials_and_refresh_tokens() {
        let state = AppState::fake();
        let mut anonymous = parts(None);
        let err = AuthUser::from_request_parts(&mut anonymous, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let refresh = JwtKeys::from_ref(&state).sign_refresh(Uuid::new_v4()).unwrap();
        let mut parts = parts(Some(("authorization", format!("Bearer {refresh}"))));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(m) if m == "Access token required"));
    }
}
