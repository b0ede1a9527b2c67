use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use recircle_types::api::{AuthResponse, Claims, LoginRequest, ProfileResponse, SignupRequest};

use crate::convert::{self, non_empty};
use crate::error::ApiError;
use crate::state::{AppState, blocking};

const TOKEN_TTL_DAYS: i64 = 7;

pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let (Some(display_name), Some(email), Some(password), Some(city), Some(st)) = (
        non_empty(req.display_name),
        non_empty(req.email),
        non_empty(req.password),
        non_empty(req.city),
        non_empty(req.state),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };

    let lookup = email.clone();
    if blocking(&state, move |db| db.get_user_by_email(&lookup)).await?.is_some() {
        return Err(ApiError::bad_request("User already exists with this email"));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))?
        .to_string();

    let user_id = Uuid::new_v4();
    let row = blocking(&state, move |db| {
        db.create_user(&user_id.to_string(), &display_name, &email, &password_hash, &city, &st)
    })
    .await?;

    let token = create_token(&state.jwt_secret, user_id, &row.email)?;
    info!("User signed up: {}", row.email);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully".into(),
            user: convert::user(row),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let (Some(email), Some(password)) = (non_empty(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::bad_request("Email and password are required"));
    };

    let invalid = || ApiError::Unauthorized("Invalid email or password".into());

    let user = blocking(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(invalid)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(format!("stored hash unreadable: {}", e)))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(format!("corrupt user id {}: {}", user.id, e)))?;
    let token = create_token(&state.jwt_secret, user_id, &user.email)?;

    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        user: convert::user(user),
        token,
    }))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let user = blocking(&state, move |db| db.get_user_by_id(&uid))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ProfileResponse {
        user: convert::user(user),
    }))
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token encoding failed: {}", e)))
}
