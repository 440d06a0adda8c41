use jsonwebtoken::{DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::User;
use crate::validation::{FieldError, FieldErrors, Validate};

/// Token type used to distinguish Access and Refresh JWTs.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[serde(alias = "Access")]
    Access,
    #[serde(alias = "Refresh")]
    Refresh,
}

/// Standard JWT claims used in the app.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,       // user ID
    pub exp: usize,      // expiration time
    pub iat: usize,      // issued at
    pub iss: String,     // issuer
    pub aud: String,     // audience
    pub kind: TokenKind, // access or refresh
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Other,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Other => "other",
        }
    }
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::default();
        errors.require(
            super::services::is_valid_username(self.username.trim()),
            "username",
            "must be 3-32 letters, digits, '.', '_' or '-'",
        );
        errors.require(
            self.password.chars().count() >= 8,
            "password",
            "must be at least 8 characters",
        );
        if let Some(name) = &self.name {
            errors.non_blank(name, "name", 100);
        }
        errors.finish()
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::default();
        errors.non_blank(&self.username, "username", 32);
        errors.require(!self.password.is_empty(), "password", "must not be empty");
        errors.finish()
    }
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl Validate for RefreshRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::default();
        errors.require(
            !self.refresh_token.trim().is_empty(),
            "refreshToken",
            "must not be empty",
        );
        errors.finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl Validate for ChangePasswordRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::default();
        errors.require(
            !self.current_password.is_empty(),
            "currentPassword",
            "must not be empty",
        );
        errors.require(
            self.new_password.chars().count() >= 8,
            "newPassword",
            "must be at least 8 characters",
        );
        errors.finish()
    }
}

/// Full replacement of the editable profile attributes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub height_cm: Option<f64>,
    pub sex: Option<Sex>,
    pub birth_date: Option<Date>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
    pub target_carbs: Option<f64>,
    pub target_protein: Option<f64>,
    pub target_fats: Option<f64>,
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::default();
        if let Some(name) = &self.name {
            errors.non_blank(name, "name", 100);
        }
        if let Some(height) = self.height_cm {
            errors.require(
                height.is_finite() && height > 0.0 && height < 300.0,
                "heightCm",
                "must be between 0 and 300",
            );
        }
        if let Some(locale) = &self.locale {
            errors.non_blank(locale, "locale", 35);
        }
        if let Some(tz) = &self.timezone {
            errors.non_blank(tz, "timezone", 64);
        }
        for (field, value) in [
            ("targetCarbs", self.target_carbs),
            ("targetProtein", self.target_protein),
            ("targetFats", self.target_fats),
        ] {
            if let Some(v) = value {
                errors.require(
                    crate::nutrition::is_valid_amount(v),
                    field,
                    "must be a non-negative number",
                );
            }
        }
        errors.finish()
    }
}

/// Response returned after login, register or refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub height_cm: Option<f64>,
    pub sex: Option<String>,
    pub birth_date: Option<Date>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
    pub target_carbs: Option<f64>,
    pub target_protein: Option<f64>,
    pub target_fats: Option<f64>,
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            name: u.name,
            height_cm: u.height_cm,
            sex: u.sex,
            birth_date: u.birth_date,
            locale: u.locale,
            timezone: u.timezone,
            target_carbs: u.target_carbs,
            target_protein: u.target_protein,
            target_fats: u.target_fats,
            created_at: u.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_rejects_bad_username_and_short_password() {
        let req: RegisterRequest =
            serde_json::from_str(r#"{"username":"a b","password":"short"}"#).unwrap();
        let fields: Vec<_> = req
            .validate()
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(fields, vec!["username", "password"]);
    }

    #[test]
    fn register_rejects_unknown_fields() {
        let res = serde_json::from_str::<RegisterRequest>(
            r#"{"username":"alice","password":"long-enough","isAdmin":true}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn profile_update_checks_targets_and_height() {
        let req: UpdateProfileRequest = serde_json::from_str(
            r#"{"heightCm":-3,"targetCarbs":200,"targetFats":-1,"sex":"female","birthDate":"1990-04-12"}"#,
        )
        .unwrap();
        let fields: Vec<_> = req
            .validate()
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(fields, vec!["heightCm", "targetFats"]);
        assert_eq!(req.sex, Some(Sex::Female));
    }

    #[test]
    fn empty_profile_update_is_valid() {
        let req: UpdateProfileRequest = serde_json::from_str("{}").unwrap();
        assert!(req.validate().is_ok());
    }
}
