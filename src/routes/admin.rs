use crate::db::DbConn;
use crate::guards::AdminGuard;
use crate::models::{
    AdminLog, CreateMessageDto, PlatformMessage, Profile, Skill, SwapRequest,
};
use crate::services::DirectoryService;
use crate::utils::{ApiError, ApiResponse};
use log::warn;
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::FindOptions;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

/// Best-effort audit append; a failed audit write is logged but never fails
/// the moderation action itself.
async fn log_admin_action(
    db: &DbConn,
    admin_id: ObjectId,
    action: &str,
    target_type: &str,
    target_id: Option<ObjectId>,
    details: Option<Document>,
) {
    let entry = AdminLog {
        id: None,
        admin_id,
        action: action.to_string(),
        target_type: target_type.to_string(),
        target_id,
        details,
        created_at: DateTime::now(),
    };

    if let Err(e) = db.collection::<AdminLog>("admin_logs").insert_one(&entry, None).await {
        warn!("failed to record admin action {}: {}", action, e);
    }
}

// ==================== OVERVIEW ====================

#[openapi(tag = "Admin")]
#[get("/admin/stats")]
pub async fn get_stats(
    db: &State<DbConn>,
    _admin: AdminGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let profiles = db.collection::<Profile>("profiles");
    let swaps = db.collection::<SwapRequest>("swap_requests");
    let skills = db.collection::<Skill>("skills");
    let messages = db.collection::<PlatformMessage>("platform_messages");

    let total_users = profiles
        .count_documents(doc! {}, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;
    let banned_users = profiles
        .count_documents(doc! { "is_banned": true }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;
    let total_swaps = swaps
        .count_documents(doc! {}, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;
    let pending_swaps = swaps
        .count_documents(doc! { "status": "pending" }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;
    let pending_skills = skills
        .count_documents(doc! { "is_approved": false, "rejection_reason": null }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;
    let active_messages = messages
        .count_documents(doc! { "is_active": true }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "total_users": total_users,
        "banned_users": banned_users,
        "total_swaps": total_swaps,
        "pending_swaps": pending_swaps,
        "pending_skills": pending_skills,
        "active_messages": active_messages,
    }))))
}

// ==================== USERS ====================

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct UserListQuery {
    pub banned: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Admin - Users")]
#[get("/admin/users?<query..>")]
pub async fn get_all_users(
    db: &State<DbConn>,
    _admin: AdminGuard,
    query: UserListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).min(100);
    let skip = (page - 1) * limit;

    let mut filter = doc! {};
    if let Some(banned) = query.banned {
        filter.insert("is_banned", banned);
    }

    let find_options = FindOptions::builder()
        .skip(skip as u64)
        .limit(limit)
        .sort(doc! { "created_at": -1 })
        .build();

    let mut cursor = db.collection::<Profile>("profiles")
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut users: Vec<crate::models::AdminUserResponse> = Vec::new();
    while cursor.advance().await.map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))? {
        let user: Profile = cursor.deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        users.push(user.into());
    }

    let total = db.collection::<Profile>("profiles")
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "users": users,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "pages": (total as f64 / limit as f64).ceil() as i64,
        }
    }))))
}

#[derive(serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct BanUserDto {
    pub banned: bool,
    pub reason: Option<String>,
}

#[openapi(tag = "Admin - Users")]
#[put("/admin/users/<user_id>/ban", data = "<dto>")]
pub async fn ban_user(
    db: &State<DbConn>,
    admin: AdminGuard,
    user_id: String,
    dto: Json<BanUserDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&user_id)
        .map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    if object_id == admin.auth.user_id {
        return Err(ApiError::bad_request("You cannot ban your own account"));
    }

    let update_doc = if dto.banned {
        doc! {
            "is_banned": true,
            "ban_reason": dto.reason.as_deref().unwrap_or("No reason given"),
            "updated_at": DateTime::now(),
        }
    } else {
        doc! {
            "is_banned": false,
            "ban_reason": null,
            "updated_at": DateTime::now(),
        }
    };

    let result = db.collection::<Profile>("profiles")
        .update_one(doc! { "_id": object_id }, doc! { "$set": update_doc }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update user: {}", e)))?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    log_admin_action(
        db,
        admin.auth.user_id,
        if dto.banned { "ban_user" } else { "unban_user" },
        "profile",
        Some(object_id),
        dto.reason.as_ref().map(|r| doc! { "reason": r }),
    )
    .await;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": if dto.banned { "User banned" } else { "User unbanned" }
    }))))
}

#[openapi(tag = "Admin - Users")]
#[put("/admin/users/<user_id>/promote")]
pub async fn promote_user(
    db: &State<DbConn>,
    admin: AdminGuard,
    user_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&user_id)
        .map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    let result = db.collection::<Profile>("profiles")
        .update_one(
            doc! { "_id": object_id },
            doc! { "$set": { "is_admin": true, "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update user: {}", e)))?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    log_admin_action(db, admin.auth.user_id, "promote_user", "profile", Some(object_id), None).await;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "User promoted to admin"
    }))))
}

// ==================== SKILLS ====================

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct SkillListQuery {
    pub approved: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Admin - Skills")]
#[get("/admin/skills?<query..>")]
pub async fn get_all_skills(
    db: &State<DbConn>,
    _admin: AdminGuard,
    query: SkillListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).min(100);
    let skip = (page - 1) * limit;

    let mut filter = doc! {};
    if let Some(approved) = query.approved {
        filter.insert("is_approved", approved);
    }

    let find_options = FindOptions::builder()
        .skip(skip as u64)
        .limit(limit)
        .sort(doc! { "created_at": -1 })
        .build();

    let mut cursor = db.collection::<Skill>("skills")
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut skills = Vec::new();
    while cursor.advance().await.map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))? {
        let skill = cursor.deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        skills.push(skill);
    }

    let total = db.collection::<Skill>("skills")
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "skills": skills,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "pages": (total as f64 / limit as f64).ceil() as i64,
        }
    }))))
}

#[derive(serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct ModerateSkillDto {
    pub approved: bool,
    pub reason: Option<String>,
}

#[openapi(tag = "Admin - Skills")]
#[put("/admin/skills/<skill_id>/moderate", data = "<dto>")]
pub async fn moderate_skill(
    db: &State<DbConn>,
    admin: AdminGuard,
    skill_id: String,
    dto: Json<ModerateSkillDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&skill_id)
        .map_err(|_| ApiError::bad_request("Invalid skill ID"))?;

    let update_doc = if dto.approved {
        doc! { "is_approved": true, "rejection_reason": null }
    } else {
        doc! {
            "is_approved": false,
            "rejection_reason": dto.reason.as_deref().unwrap_or("Not suitable for the platform"),
        }
    };

    let result = db.collection::<Skill>("skills")
        .update_one(doc! { "_id": object_id }, doc! { "$set": update_doc }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to moderate skill: {}", e)))?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("Skill not found"));
    }

    log_admin_action(
        db,
        admin.auth.user_id,
        if dto.approved { "approve_skill" } else { "reject_skill" },
        "skill",
        Some(object_id),
        dto.reason.as_ref().map(|r| doc! { "reason": r }),
    )
    .await;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": if dto.approved { "Skill approved" } else { "Skill rejected" }
    }))))
}

// ==================== SWAPS ====================

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct AdminSwapListQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Platform-wide request listing. Admins observe the lifecycle; they never
/// transition requests they are not a participant of.
#[openapi(tag = "Admin - Swaps")]
#[get("/admin/swaps?<query..>")]
pub async fn get_all_swaps(
    db: &State<DbConn>,
    _admin: AdminGuard,
    query: AdminSwapListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).min(100);
    let skip = (page - 1) * limit;

    let mut filter = doc! {};
    if let Some(ref status) = query.status {
        let status = crate::models::SwapStatus::parse(status)
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

// ==================== PLATFORM MESSAGES ====================

#[openapi(tag = "Admin - Messages")]
#[post("/admin/messages", data = "<dto>")]
pub async fn create_message(
    db: &State<DbConn>,
    admin: AdminGuard,
    dto: Json<CreateMessageDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if dto.title.trim().is_empty() || dto.message.trim().is_empty() {
        return Err(ApiError::bad_request("Title and message are required"));
    }

    let message = PlatformMessage {
        id: None,
        admin_id: admin.auth.user_id,
        title: dto.title.trim().to_string(),
        message: dto.message.trim().to_string(),
        message_type: dto.message_type,
        is_active: true,
        created_at: DateTime::now(),
    };

    let result = db.collection::<PlatformMessage>("platform_messages")
        .insert_one(&message, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create message: {}", e)))?;

    let message_id = result.inserted_id.as_object_id();
    log_admin_action(db, admin.auth.user_id, "create_message", "platform_message", message_id, None).await;

    Ok(Json(ApiResponse::success_with_message(
        "Platform message created".to_string(),
        serde_json::json!({
            "id": message_id.map(|id| id.to_hex()),
        }),
    )))
}

#[openapi(tag = "Admin - Messages")]
#[get("/admin/messages")]
pub async fn get_all_messages(
    db: &State<DbConn>,
    _admin: AdminGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let find_options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build();

    let mut cursor = db.collection::<PlatformMessage>("platform_messages")
        .find(doc! {}, find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut messages = Vec::new();
    while cursor.advance().await.map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))? {
        let message = cursor.deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        messages.push(message);
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "messages": messages,
    }))))
}

#[openapi(tag = "Admin - Messages")]
#[put("/admin/messages/<message_id>/toggle")]
pub async fn toggle_message(
    db: &State<DbConn>,
    admin: AdminGuard,
    message_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&message_id)
        .map_err(|_| ApiError::bad_request("Invalid message ID"))?;

    let message = db.collection::<PlatformMessage>("platform_messages")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;

    let now_active = !message.is_active;

    db.collection::<PlatformMessage>("platform_messages")
        .update_one(
            doc! { "_id": object_id },
            doc! { "$set": { "is_active": now_active } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update message: {}", e)))?;

    log_admin_action(
        db,
        admin.auth.user_id,
        if now_active { "activate_message" } else { "deactivate_message" },
        "platform_message",
        Some(object_id),
        None,
    )
    .await;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": if now_active { "Message activated" } else { "Message deactivated" }
    }))))
}

#[openapi(tag = "Admin - Messages")]
#[delete("/admin/messages/<message_id>")]
pub async fn delete_message(
    db: &State<DbConn>,
    admin: AdminGuard,
    message_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&message_id)
        .map_err(|_| ApiError::bad_request("Invalid message ID"))?;

    let result = db.collection::<PlatformMessage>("platform_messages")
        .delete_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to delete message: {}", e)))?;

    if result.deleted_count == 0 {
        return Err(ApiError::not_found("Message not found"));
    }

    log_admin_action(db, admin.auth.user_id, "delete_message", "platform_message", Some(object_id), None).await;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Message deleted"
    }))))
}

// ==================== AUDIT LOG ====================

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct AdminLogQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Admin - Logs")]
#[get("/admin/logs?<query..>")]
pub async fn get_admin_logs(
    db: &State<DbConn>,
    _admin: AdminGuard,
    query: AdminLogQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(50).min(200);
    let skip = (page - 1) * limit;

    let find_options = FindOptions::builder()
        .skip(skip as u64)
        .limit(limit)
        .sort(doc! { "created_at": -1 })
        .build();

    let mut cursor = db.collection::<AdminLog>("admin_logs")
        .find(doc! {}, find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut logs = Vec::new();
    while cursor.advance().await.map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))? {
        let log = cursor.deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        logs.push(log);
    }

    let total = db.collection::<AdminLog>("admin_logs")
        .count_documents(doc! {}, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "logs": logs,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "pages": (total as f64 / limit as f64).ceil() as i64,
        }
    }))))
}
