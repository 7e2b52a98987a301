use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;
use crate::db::DbConn;
use crate::guards::MemberGuard;
use crate::models::{CreateSwapDto, SwapRequest, SwapStatus, UpdateSwapStatusDto};
use crate::services::{DirectoryService, LifecycleService};
use crate::utils::{ApiResponse, ApiError};

#[openapi(tag = "Swap")]
#[post("/swaps", data = "<dto>")]
pub async fn create_swap(
    db: &State<DbConn>,
    member: MemberGuard,
    dto: Json<CreateSwapDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let recipient_id = ObjectId::parse_str(&dto.recipient_id)
        .map_err(|_| ApiError::bad_request("Invalid recipient ID"))?;
    let offered_skill_id = ObjectId::parse_str(&dto.offered_skill_id)
        .map_err(|_| ApiError::bad_request("Invalid offered skill ID"))?;
    let wanted_skill_id = ObjectId::parse_str(&dto.wanted_skill_id)
        .map_err(|_| ApiError::bad_request("Invalid wanted skill ID"))?;

    let message = dto
        .message
        .as_ref()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .map(|m| m.to_string());

    let request = LifecycleService::create(
        db,
        member.auth.user_id,
        recipient_id,
        offered_skill_id,
        wanted_skill_id,
        message,
    )
    .await?;

    let responses = DirectoryService::swap_responses(db, vec![request]).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Swap request sent".to_string(),
        serde_json::json!({ "request": responses.into_iter().next() }),
    )))
}

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct SwapListQuery {
    pub scope: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Swap")]
#[get("/swaps?<query..>")]
pub async fn list_swaps(
    db: &State<DbConn>,
    member: MemberGuard,
    query: SwapListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).min(100);
    let skip = (page - 1) * limit;

    let me = member.auth.user_id;
    let mut filter = match query.scope.as_deref().unwrap_or("all") {
        "incoming" => doc! { "recipient_id": me },
        "outgoing" => doc! { "requester_id": me },
        "all" => doc! { "$or": [ { "requester_id": me }, { "recipient_id": me } ] },
        other => {
            return Err(ApiError::bad_request(format!(
                "Unknown scope '{}'. Use all, incoming or outgoing",
                other
            )));
        }
    };

    if let Some(ref status) = query.status {
        let status = SwapStatus::parse(status)
            .ok_or_else(|| ApiError::bad_request("Unknown status filter"))?;
        filter.insert("status", status.as_str());
    }

    let find_options = FindOptions::builder()
        .skip(skip as u64)
        .limit(limit)
        .sort(doc! { "created_at": -1 })
        .build();

    let mut cursor = db.collection::<SwapRequest>("swap_requests")
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut requests = Vec::new();
    while cursor.advance().await.map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))? {
        let request = cursor.deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        requests.push(request);
    }

    let total = db.collection::<SwapRequest>("swap_requests")
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    let responses = DirectoryService::swap_responses(db, requests).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "requests": responses,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "pages": (total as f64 / limit as f64).ceil() as i64,
        }
    }))))
}

#[openapi(tag = "Swap")]
#[put("/swaps/<request_id>/status", data = "<dto>")]
pub async fn update_swap_status(
    db: &State<DbConn>,
    member: MemberGuard,
    request_id: String,
    dto: Json<UpdateSwapStatusDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&request_id)
        .map_err(|_| ApiError::bad_request("Invalid request ID"))?;

    let target = SwapStatus::parse(&dto.status)
        .ok_or_else(|| ApiError::bad_request("Unknown status"))?;

    let request =
        LifecycleService::transition(db, &object_id, &member.auth.user_id, target).await?;

    let responses = DirectoryService::swap_responses(db, vec![request]).await?;

    Ok(Json(ApiResponse::success_with_message(
        format!("Request {}", target),
        serde_json::json!({ "request": responses.into_iter().next() }),
    )))
}

#[openapi(tag = "Swap")]
#[delete("/swaps/<request_id>")]
pub async fn cancel_swap(
    db: &State<DbConn>,
    member: MemberGuard,
    request_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&request_id)
        .map_err(|_| ApiError::bad_request("Invalid request ID"))?;

    LifecycleService::cancel(db, &object_id, &member.auth.user_id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Request cancelled"
    }))))
}
