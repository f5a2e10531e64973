use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::user::Role;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
    pub email: Option<String>,
}

/// The authenticated caller, passed explicitly into every service call.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
    pub email: Option<String>,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can_manage_exams(&self) -> bool {
        matches!(self.role, Role::Faculty | Role::Admin)
    }
}

impl TryFrom<Claims> for Actor {
    type Error = Error;

    fn try_from(claims: Claims) -> Result<Self> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| Error::Unauthorized("token subject is not a user id".to_string()))?;
        let role = claims
            .role
            .as_deref()
            .and_then(Role::parse)
            .ok_or_else(|| Error::Unauthorized("token carries no known role".to_string()))?;
        let email = claims
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());
        Ok(Self {
            user_id,
            role,
            email,
        })
    }
}

fn reject(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({"error": code, "message": message, "category": "permission"})),
    )
        .into_response()
}

/// Validates `Authorization: Bearer <jwt>` and stores the resulting [`Actor`]
/// in the request extensions.
pub async fn require_bearer_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return reject(StatusCode::UNAUTHORIZED, "unauthorized", "Missing Authorization header");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return reject(StatusCode::UNAUTHORIZED, "unauthorized", "Malformed Authorization header");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return reject(StatusCode::UNAUTHORIZED, "unauthorized", "Expected a Bearer token");
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let claims = match decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => data.claims,
        Err(e) => {
            tracing::debug!("rejected bearer token: {}", e);
            return reject(StatusCode::UNAUTHORIZED, "unauthorized", "Invalid or expired token");
        }
    };

    match Actor::try_from(claims) {
        Ok(actor) => {
            req.extensions_mut().insert(actor);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

/// Must run after [`require_bearer_auth`].
pub async fn require_faculty(req: Request, next: Next) -> Response {
    match req.extensions().get::<Actor>() {
        Some(actor) if actor.can_manage_exams() => next.run(req).await,
        Some(_) => reject(StatusCode::FORBIDDEN, "forbidden", "Your role cannot use this endpoint"),
        None => reject(StatusCode::UNAUTHORIZED, "unauthorized", "Missing Authorization header"),
    }
}

/// Must run after [`require_bearer_auth`].
pub async fn require_student(req: Request, next: Next) -> Response {
    match req.extensions().get::<Actor>() {
        Some(actor) if actor.role == Role::Student => next.run(req).await,
        Some(_) => reject(StatusCode::FORBIDDEN, "forbidden", "Your role cannot use this endpoint"),
        None => reject(StatusCode::UNAUTHORIZED, "unauthorized", "Missing Authorization header"),
    }
}

/// Issues an HS256 token in the format [`require_bearer_auth`] accepts.
/// Login lives in the external identity service; this serves tooling and tests.
pub fn sign_token(
    user_id: Uuid,
    role: Role,
    email: Option<&str>,
    secret: &str,
    ttl_seconds: i64,
) -> Result<String> {
    let exp = (chrono::Utc::now() + chrono::Duration::seconds(ttl_seconds)).timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: exp.max(0) as usize,
        role: Some(role.as_str().to_string()),
        email: email.map(str::to_string),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("failed to sign token: {}", e)))
}
