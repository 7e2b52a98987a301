use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, DateTime, oid::ObjectId};
use crate::db::DbConn;
use crate::models::{LoginDto, PrivacySetting, Profile, ProfileResponse, RegisterDto};
use crate::services::JwtService;
use crate::utils::{validate_email, validate_password, ApiResponse, ApiError};

const LOGIN_WINDOW_MS: i64 = 10 * 60 * 1000;
const LOGIN_LIMIT: i32 = 5;
const REFRESH_LIMIT: i32 = 10;
const REFRESH_WINDOW_MS: i64 = 60 * 1000;

/// --------------------
/// Rate limiter helper
/// --------------------
async fn rate_limit(
    db: &DbConn,
    key: &str,
    limit: i32,
    window_ms: i64,
) -> Result<(), ApiError> {
    let now = chrono::Utc::now().timestamp_millis();
    let window_expires = DateTime::from_millis(now + window_ms);

    let collection = db.collection::<mongodb::bson::Document>("rate_limits");

    let doc = collection
        .find_one(doc! { "key": key }, None)
        .await
        .map_err(|_| ApiError::internal_error("Rate limiter lookup failed"))?;

    match doc {
        // First request OR expired window
        None => {
            collection
                .insert_one(
                    doc! {
                        "key": key,
                        "count": 1,
                        "expires_at": window_expires
                    },
                    None,
                )
                .await
                .map_err(|_| ApiError::internal_error("Rate limiter insert failed"))?;
            Ok(())
        }

        Some(d) => {
            let count = d.get_i32("count").unwrap_or(0);
            let expires_at = d.get_datetime("expires_at").ok();

            // Window expired → reset
            if expires_at.map(|e| *e < DateTime::now()).unwrap_or(true) {
                collection
                    .update_one(
                        doc! { "key": key },
                        doc! {
                            "$set": {
                                "count": 1,
                                "expires_at": window_expires
                            }
                        },
                        None,
                    )
                    .await
                    .map_err(|_| ApiError::internal_error("Rate limiter reset failed"))?;
                return Ok(());
            }

            // Limit exceeded
            if count >= limit {
                return Err(ApiError::too_many_requests(
                    "Too many requests. Please try later.",
                ));
            }

            // Increment count
            collection
                .update_one(
                    doc! { "key": key },
                    doc! { "$inc": { "count": 1 } },
                    None,
                )
                .await
                .map_err(|_| ApiError::internal_error("Rate limiter increment failed"))?;

            Ok(())
        }
    }
}

fn token_pair(profile: &Profile) -> Result<(String, String), ApiError> {
    let id = profile
        .id
        .as_ref()
        .ok_or_else(|| ApiError::internal_error("Profile missing ID"))?;

    let access = JwtService::generate_access_token(id, &profile.email)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    let refresh = JwtService::generate_refresh_token(id, &profile.email)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok((access, refresh))
}

/// --------------------
/// Register
/// --------------------
#[openapi(tag = "Auth")]
#[post("/auth/register", data = "<dto>")]
pub async fn register(
    db: &State<DbConn>,
    dto: Json<RegisterDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if !validate_email(&dto.email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if !validate_password(&dto.password) {
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }
    if dto.name.trim().is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }

    rate_limit(
        db,
        &format!("register:{}", dto.email),
        LOGIN_LIMIT,
        LOGIN_WINDOW_MS,
    ).await?;

    let email = dto.email.trim().to_lowercase();

    let existing = db.collection::<Profile>("profiles")
        .find_one(doc! { "email": &email }, None)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    if existing.is_some() {
        return Err(ApiError::bad_request("An account with this email already exists"));
    }

    let password_hash = bcrypt::hash(&dto.password, crate::config::Config::bcrypt_cost())
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    let profile = Profile {
        id: None,
        email,
        password_hash,
        name: dto.name.trim().to_string(),
        location: None,
        profile_photo_url: None,
        availability: Vec::new(),
        privacy_setting: PrivacySetting::Public,
        is_admin: false,
        is_banned: false,
        ban_reason: None,
        last_login_at: DateTime::now(),
        created_at: DateTime::now(),
        updated_at: DateTime::now(),
    };

    let result = db.collection::<Profile>("profiles")
        .insert_one(&profile, None)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    let mut profile = profile;
    profile.id = result.inserted_id.as_object_id();

    let (access_token, refresh_token) = token_pair(&profile)?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Registration successful",
        "user": ProfileResponse::from(profile),
        "accessToken": access_token,
        "refreshToken": refresh_token
    }))))
}

/// --------------------
/// Login
/// --------------------
#[openapi(tag = "Auth")]
#[post("/auth/login", data = "<dto>")]
pub async fn login(
    db: &State<DbConn>,
    dto: Json<LoginDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    rate_limit(
        db,
        &format!("login:{}", dto.email),
        LOGIN_LIMIT,
        LOGIN_WINDOW_MS,
    ).await?;

    let email = dto.email.trim().to_lowercase();

    let profile = db.collection::<Profile>("profiles")
        .find_one(doc! { "email": &email }, None)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let valid = bcrypt::verify(&dto.password, &profile.password_hash)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    if !valid {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    if profile.is_banned {
        let reason = profile.ban_reason.clone()
            .unwrap_or_else(|| "No reason given".to_string());
        return Err(ApiError::forbidden(format!("Account banned: {}", reason)));
    }

    db.collection::<Profile>("profiles")
        .update_one(
            doc! { "_id": profile.id },
            doc! { "$set": { "last_login_at": DateTime::now() } },
            None,
        ).await.ok();

    let (access_token, refresh_token) = token_pair(&profile)?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Login successful",
        "user": ProfileResponse::from(profile),
        "accessToken": access_token,
        "refreshToken": refresh_token
    }))))
}

/// --------------------
/// Silent Refresh Token
/// --------------------
#[derive(serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct RefreshTokenDto {
    pub refresh_token: String,
}

#[openapi(tag = "Auth")]
#[post("/auth/refresh", data = "<dto>")]
pub async fn refresh_token(
    db: &State<DbConn>,
    dto: Json<RefreshTokenDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    rate_limit(
        db,
        "refresh_token",
        REFRESH_LIMIT,
        REFRESH_WINDOW_MS,
    ).await?;

    let claims = JwtService::verify_token(&dto.refresh_token, true)
        .map_err(|_| ApiError::unauthorized("Invalid refresh token"))?;

    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::unauthorized("Invalid user id in token"))?;

    let access = JwtService::generate_access_token(&user_id, &claims.email)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "accessToken": access
    }))))
}
