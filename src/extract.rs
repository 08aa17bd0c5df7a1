use axum::{
    Json, async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use mongodb::bson::oid::ObjectId;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::models::Validate;

/// JSON body that has been deserialized and passed [`Validate`]. Any failure
/// is reported as a 400 with a `{message}` body.
pub struct Valid<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        value.validate().map_err(ApiError::BadRequest)?;
        Ok(Self(value))
    }
}

/// Like [`Valid`], but an empty body stands for `T::default()`.
pub struct ValidOrDefault<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidOrDefault<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Default,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }
        let value: T = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::bad_request(format!("invalid JSON body: {e}")))?;
        value.validate().map_err(ApiError::BadRequest)?;
        Ok(Self(value))
    }
}

/// Parses a path id. Malformed ids are indistinguishable from missing ones.
pub fn parse_id(raw: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::not_found(format!("{what} not found")))
}
