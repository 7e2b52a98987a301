use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use rocket::futures::TryStreamExt;
use crate::db::DbConn;
use crate::models::PlatformMessage;
use crate::utils::{ApiResponse, ApiError};

/// Active platform announcements, newest first. Public so clients can show
/// them on the login screen too.
#[openapi(tag = "Messages")]
#[get("/messages")]
pub async fn get_active_messages(
    db: &State<DbConn>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let find_options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build();

    let messages: Vec<PlatformMessage> = db.collection::<PlatformMessage>("platform_messages")
        .find(doc! { "is_active": true }, find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .try_collect()
        .await
        .map_err(|e| ApiError::internal_error(format!("Collection error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "messages": messages,
    }))))
}
