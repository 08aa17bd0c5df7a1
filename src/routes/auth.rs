use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use argon2::{Algorithm, Argon2, Params, Version};
use argon2::{PasswordHasher, PasswordVerifier};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, SaltString};

use crate::AppState;
use crate::config::AuthConfig;
use crate::error::{ApiError, ApiResult};
use crate::extract::Valid;
use crate::middlewares::auth::issue_token;
use crate::models::user::{check_email, normalize_email};
use crate::models::{User, UserView, Validate, non_blank};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SignupRequest {
    name: String,
    email: String,
    password: String,
}

impl Validate for SignupRequest {
    fn validate(&self) -> Result<(), String> {
        non_blank(&self.name, "name")?;
        check_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LoginRequest {
    email: String,
    password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        non_blank(&self.email, "email")?;
        non_blank(&self.password, "password")
    }
}

#[derive(Serialize)]
struct AuthResponse {
    token: String,
    user: UserView,
}

fn hasher(auth: &AuthConfig) -> Result<Argon2<'static>, ApiError> {
    let params = Params::new(
        auth.argon2_memory_kib,
        auth.argon2_iterations,
        auth.argon2_parallelism,
        Some(32),
    )
    .map_err(|e| ApiError::internal(format!("bad argon2 parameters: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

pub fn hash_password(password: &str, auth: &AuthConfig) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    hasher(auth)?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("could not hash password: {e}")))
}

/// The cost parameters are read from the stored hash, so changing the
/// configured ones does not lock out existing users.
pub fn verify_password(password: &str, stored: &str, auth: &AuthConfig) -> Result<bool, ApiError> {
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is unreadable");
            return Ok(false);
        }
    };
    Ok(hasher(auth)?
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

async fn signup(
    State(state): State<AppState>,
    Valid(req): Valid<SignupRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let email = normalize_email(&req.email);
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::bad_request("Email already exists"));
    }

    let auth = &state.config.auth;
    let password = req.password;
    let auth_for_hash = auth.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, &auth_for_hash))
        .await
        .map_err(|e| ApiError::internal(format!("hashing task failed: {e}")))??;

    let now = Utc::now();
    let user = state
        .store
        .insert_user(User {
            id: ObjectId::new(),
            name: req.name.trim().to_string(),
            email,
            password_hash,
            occupation: None,
            location: None,
            bio: None,
            photo: None,
            socials: Vec::new(),
            created_at: now,
            updated_at: now,
        })
        .await?;
    tracing::info!(user = %user.id, "user signed up");

    let token = issue_token(user.id, auth)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserView::from(&user),
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Valid(req): Valid<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let invalid = || ApiError::unauthorized("Invalid credentials");
    let user = state
        .store
        .find_user_by_email(&normalize_email(&req.email))
        .await?
        .ok_or_else(invalid)?;

    let auth = state.config.auth.clone();
    let stored = user.password_hash.clone();
    let password = req.password;
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored, &auth))
        .await
        .map_err(|e| ApiError::internal(format!("hashing task failed: {e}")))??;
    if !matches {
        tracing::debug!(user = %user.id, "password mismatch");
        return Err(invalid());
    }

    let token = issue_token(user.id, &state.config.auth)?;
    Ok(Json(AuthResponse {
        token,
        user: UserView::from(&user),
    }))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light_auth() -> AuthConfig {
        AuthConfig {
            jwt_secret: "secret".to_string(),
            token_ttl_hours: 1,
            argon2_memory_kib: 8,
            argon2_iterations: 1,
            argon2_parallelism: 1,
        }
    }

    #[test]
    fn hashes_verify_and_never_store_plaintext() {
        let auth = light_auth();
        let hash = hash_password("hunter22", &auth).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("hunter22"));
        assert!(verify_password("hunter22", &hash, &auth).unwrap());
        assert!(!verify_password("hunter23", &hash, &auth).unwrap());
        assert!(!verify_password("hunter22", "not-a-hash", &auth).unwrap());
    }

    #[test]
    fn signup_requires_a_usable_password() {
        let req = SignupRequest {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password: "12345".to_string(),
        };
        assert!(req.validate().unwrap_err().contains("at least 6"));
    }
}
