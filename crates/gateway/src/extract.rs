//! Request extractors that reject with the API error envelope

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::Json;
use colonia_common::errors::AppError;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

/// Path parameters; malformed values become a 400
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Query string; missing or malformed parameters become a 400
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// JSON body that is deserialized and then checked with `validator`
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate().map_err(validation_failure)?;
        Ok(Self(value))
    }
}

fn validation_failure(errors: ValidationErrors) -> AppError {
    let mut fields: Vec<_> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| (field.to_string(), errs.clone()))
        .collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    match fields.into_iter().next() {
        Some((field, errs)) => {
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("invalid value for `{}`", field));
            AppError::validation(&field, message)
        }
        None => AppError::Validation {
            message: errors.to_string(),
            field: None,
        },
    }
}
