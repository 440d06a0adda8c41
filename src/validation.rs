use axum::{
    async_trait,
    extract::{
        path::ErrorKind,
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{error::ApiError, nutrition::Macros};

/// One offending field in a rejected request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Request bodies that check their own shape after deserialization.
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

#[derive(Debug, Default)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn require(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add(field, message);
        }
    }

    pub fn non_blank(&mut self, value: &str, field: &str, max_len: usize) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, "must not be empty");
        } else if trimmed.chars().count() > max_len {
            self.add(field, format!("must be at most {max_len} characters"));
        }
    }

    pub fn macros(&mut self, macros: &Macros, prefix: &str) {
        for name in macros.invalid_fields() {
            self.add(
                format!("{prefix}.{name}"),
                "must be a non-negative number",
            );
        }
    }

    pub fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self.0)
        }
    }
}

/// JSON body extractor that rejects malformed or invalid payloads with a 400
/// listing the offending fields.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;
        value.validate().map_err(ApiError::Validation)?;
        Ok(Self(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> ApiError {
    ApiError::Validation(vec![FieldError::new("body", rejection.body_text())])
}

/// Query-string extractor with the same 400 contract as [`ValidJson`].
pub struct ValidQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(query_rejection_to_error)?;
        value.validate().map_err(ApiError::Validation)?;
        Ok(Self(value))
    }
}

fn query_rejection_to_error(rejection: QueryRejection) -> ApiError {
    let message = rejection.body_text();
    let field = missing_field(&message).unwrap_or("query").to_owned();
    ApiError::Validation(vec![FieldError::new(field, message)])
}

/// Name inside serde's "missing field `name`" message.
fn missing_field(message: &str) -> Option<&str> {
    let rest = message.split_once("missing field `")?.1;
    rest.split_once('`').map(|(field, _)| field)
}

/// Path-parameter extractor; malformed ids become a 400 naming the parameter.
pub struct ValidPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(path_rejection_to_error)?;
        Ok(Self(value))
    }
}

fn path_rejection_to_error(rejection: PathRejection) -> ApiError {
    let field = match &rejection {
        PathRejection::FailedToDeserializePathParams(e) => match e.kind() {
            ErrorKind::ParseErrorAtKey { key, .. }
            | ErrorKind::InvalidUtf8InPathParam { key } => key.clone(),
            _ => "path".to_owned(),
        },
        _ => "path".to_owned(),
    };
    ApiError::Validation(vec![FieldError::new(field, rejection.body_text())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_is_ok_without_errors() {
        assert!(FieldErrors::default().finish().is_ok());
    }

    #[test]
    fn non_blank_reports_empty_and_long_values() {
        let mut errors = FieldErrors::default();
        errors.non_blank("   ", "name", 10);
        errors.non_blank("abcdefghijk", "title", 10);
        errors.non_blank("fine", "other", 10);
        let errors = errors.finish().unwrap_err();
        assert_eq!(
            errors,
            vec![
                FieldError::new("name", "must not be empty"),
                FieldError::new("title", "must be at most 10 characters"),
            ]
        );
    }

    #[test]
    fn missing_field_is_read_from_serde_message() {
        assert_eq!(
            missing_field("Failed to deserialize query string: missing field `name`"),
            Some("name")
        );
        assert_eq!(missing_field("unknown variant `raw`"), None);
    }

    #[test]
    fn macros_are_reported_with_prefix() {
        let mut errors = FieldErrors::default();
        errors.macros(&Macros::new(-5.0, 1.0, f64::INFINITY), "macros");
        let fields: Vec<_> = errors
            .finish()
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(fields, vec!["macros.carbs", "macros.fats"]);
    }
}
