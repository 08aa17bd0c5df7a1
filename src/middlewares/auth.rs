use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{
        header::AUTHORIZATION,
        request::{Parts, Request},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::config::AuthConfig;
use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Id of the caller, placed in request extensions by [`auth_middleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub ObjectId);

pub fn issue_token(user_id: ObjectId, auth: &AuthConfig) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id.to_hex(),
        exp: (Utc::now() + Duration::hours(auth.token_ttl_hours)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::internal(format!("could not issue token: {e}")))
}

pub fn verify_token(token: &str, auth: &AuthConfig) -> Result<UserId, ApiError> {
    let decoding_key = DecodingKey::from_secret(auth.jwt_secret.as_bytes());
    let data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|_| ApiError::unauthorized("Invalid token"))?;
    ObjectId::parse_str(&data.claims.sub)
        .map(UserId)
        .map_err(|_| ApiError::unauthorized("Invalid token"))
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();
    let token = match bearer_token(&parts) {
        Some(t) => t.to_string(),
        None => return ApiError::unauthorized("No token provided").into_response(),
    };

    match verify_token(&token, &state.config.auth) {
        Ok(user_id) => {
            parts.extensions.insert(user_id);
            let req = Request::from_parts(parts, body);
            next.run(req).await
        }
        Err(err) => {
            tracing::debug!(path = %parts.uri.path(), "rejected bearer token");
            err.into_response()
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserId>()
            .copied()
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))
    }
}
