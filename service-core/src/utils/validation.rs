use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{AppError, FieldError};

/// JSON body extractor that runs `validator` rules before the handler sees
/// the value. Malformed JSON and rule failures both surface as 400.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            AppError::InvalidInput(vec![FieldError {
                msg: e.body_text(),
                param: None,
            }])
        })?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// Query-string counterpart of [`ValidatedJson`].
pub struct ValidatedQuery<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                AppError::InvalidInput(vec![FieldError {
                    msg: e.body_text(),
                    param: None,
                }])
            })?;

        value.validate()?;

        Ok(ValidatedQuery(value))
    }
}
