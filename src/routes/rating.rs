use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::oid::ObjectId;
use crate::db::DbConn;
use crate::guards::MemberGuard;
use crate::models::CreateRatingDto;
use crate::services::LifecycleService;
use crate::utils::{ApiResponse, ApiError};

/// The rated user is always the caller's counterpart on the swap, so the
/// body only carries the request id, the score and optional feedback.
#[openapi(tag = "Rating")]
#[post("/ratings", data = "<dto>")]
pub async fn create_rating(
    db: &State<DbConn>,
    member: MemberGuard,
    dto: Json<CreateRatingDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let request_id = ObjectId::parse_str(&dto.swap_request_id)
        .map_err(|_| ApiError::bad_request("Invalid swap request ID"))?;

    let feedback = dto
        .feedback
        .as_ref()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(|f| f.to_string());

    let rating = LifecycleService::submit_rating(
        db,
        &request_id,
        &member.auth.user_id,
        dto.rating,
        feedback,
    )
    .await?;

    Ok(Json(ApiResponse::success_with_message(
        "Rating submitted successfully".to_string(),
        serde_json::json!({
            "rating_id": rating.id.map(|id| id.to_hex()),
            "rated_id": rating.rated_id.to_hex(),
        }),
    )))
}
