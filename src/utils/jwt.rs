use crate::config::AuthConfig;
use crate::models::user::Role;
use crate::utils::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use rocket_okapi::request::OpenApiFromRequest;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32, // user_id
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, OpenApiFromRequest)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub role: Role,
}

/// Guard for every `/api/admin` route: a valid token carrying the ADMIN role.
#[derive(Debug, OpenApiFromRequest)]
pub struct AdminUser {
    pub user_id: i32,
}

pub fn generate_token(
    config: &AuthConfig,
    user_id: i32,
    role: Role,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = (chrono::Utc::now() + chrono::Duration::hours(config.jwt_expiration_hours))
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

pub fn decode_token(config: &AuthConfig, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::AuthError(e.to_string()))
}

fn authenticate(request: &Request<'_>) -> Result<AuthenticatedUser, AppError> {
    let token = match request.headers().get_one("Authorization") {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return Err(AppError::AuthError("Missing bearer token".into())),
    };

    let config = request
        .rocket()
        .state::<AuthConfig>()
        .ok_or_else(|| AppError::ConfigError("AuthConfig is not managed".into()))?;

    let claims = decode_token(config, token)?;
    let role = Role::from_str(&claims.role)
        .map_err(|_| AppError::AuthError("Unknown role in token".into()))?;

    Ok(AuthenticatedUser {
        user_id: claims.sub,
        role,
    })
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = AppError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match authenticate(request) {
            Ok(user) => Outcome::Success(user),
            Err(e) => Outcome::Error((e.status(), e)),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = AppError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match authenticate(request) {
            Ok(user) if user.role == Role::Admin => Outcome::Success(AdminUser {
                user_id: user.user_id,
            }),
            Ok(user) => {
                tracing::warn!(user_id = user.user_id, path = %request.uri(), "non-admin on admin route");
                Outcome::Error((
                    Status::Forbidden,
                    AppError::Forbidden("Admin role required".into()),
                ))
            }
            Err(e) => Outcome::Error((e.status(), e)),
        }
    }
}
