use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, DateTime, oid::ObjectId};
use crate::db::DbConn;
use crate::guards::MemberGuard;
use crate::models::{Profile, SkillType, UpdateProfileDto, UserSkill};
use crate::services::{DirectoryService, LifecycleService};
use crate::utils::{ApiResponse, ApiError};

#[openapi(tag = "Profile")]
#[get("/profile")]
pub async fn get_profile(
    db: &State<DbConn>,
    member: MemberGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let email = member.profile.email.clone();
    let privacy = member.profile.privacy_setting;
    let is_admin = member.profile.is_admin;

    let cards = DirectoryService::profile_cards(db, vec![member.profile]).await?;
    let card = cards
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;

    let ratings = DirectoryService::rating_responses(db, &member.auth.user_id).await?;

    let mut data = serde_json::to_value(&card)
        .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?;
    data["email"] = serde_json::json!(email);
    data["privacy_setting"] = serde_json::json!(privacy);
    data["is_admin"] = serde_json::json!(is_admin);
    data["ratings"] = serde_json::to_value(&ratings)
        .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?;

    Ok(Json(ApiResponse::success(data)))
}

/// Parses and verifies the skill ids a member wants tagged on their
/// profile. Unknown ids are rejected rather than silently dropped.
async fn resolve_skill_ids(
    db: &DbConn,
    raw_ids: &[String],
) -> Result<Vec<ObjectId>, ApiError> {
    let mut ids = Vec::with_capacity(raw_ids.len());
    for raw in raw_ids {
        let id = ObjectId::parse_str(raw)
            .map_err(|_| ApiError::bad_request(format!("Invalid skill ID: {}", raw)))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    for id in &ids {
        db.collection::<crate::models::Skill>("skills")
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .ok_or_else(|| ApiError::not_found("Skill not found"))?;
    }

    Ok(ids)
}

#[openapi(tag = "Profile")]
#[put("/profile", data = "<dto>")]
pub async fn update_profile(
    db: &State<DbConn>,
    member: MemberGuard,
    dto: Json<UpdateProfileDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let user_id = member.auth.user_id;

    // Build update document
    let mut update_doc = doc! {
        "updated_at": DateTime::now()
    };

    if let Some(ref name) = dto.name {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("Name cannot be empty"));
        }
        update_doc.insert("name", name.trim());
    }
    if let Some(ref location) = dto.location {
        update_doc.insert("location", location);
    }
    if let Some(ref photo) = dto.profile_photo_url {
        update_doc.insert("profile_photo_url", photo);
    }
    if let Some(ref availability) = dto.availability {
        update_doc.insert("availability", availability.clone());
    }
    if let Some(privacy) = dto.privacy_setting {
        update_doc.insert(
            "privacy_setting",
            mongodb::bson::to_bson(&privacy)
                .map_err(|e| ApiError::internal_error(e.to_string()))?,
        );
    }

    db.collection::<Profile>("profiles")
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": update_doc },
            None
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update profile: {}", e)))?;

    // Skill tags are replaced wholesale when either list is supplied.
    if dto.offered_skill_ids.is_some() || dto.wanted_skill_ids.is_some() {
        let offered = resolve_skill_ids(db, dto.offered_skill_ids.as_deref().unwrap_or(&[])).await?;
        let wanted = resolve_skill_ids(db, dto.wanted_skill_ids.as_deref().unwrap_or(&[])).await?;

        db.collection::<UserSkill>("user_skills")
            .delete_many(doc! { "user_id": user_id }, None)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to clear skills: {}", e)))?;

        let mut tags = Vec::with_capacity(offered.len() + wanted.len());
        for skill_id in offered {
            tags.push(UserSkill {
                id: None,
                user_id,
                skill_id,
                skill_type: SkillType::Offered,
                created_at: DateTime::now(),
            });
        }
        for skill_id in wanted {
            tags.push(UserSkill {
                id: None,
                user_id,
                skill_id,
                skill_type: SkillType::Wanted,
                created_at: DateTime::now(),
            });
        }

        if !tags.is_empty() {
            db.collection::<UserSkill>("user_skills")
                .insert_many(&tags, None)
                .await
                .map_err(|e| ApiError::internal_error(format!("Failed to save skills: {}", e)))?;
        }
    }

    let profile = db.collection::<Profile>("profiles")
        .find_one(doc! { "_id": user_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;

    let cards = DirectoryService::profile_cards(db, vec![profile]).await?;
    let card = cards
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::internal_error("Profile card build failed"))?;

    Ok(Json(ApiResponse::success_with_message(
        "Profile updated successfully".to_string(),
        serde_json::to_value(&card)
            .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?,
    )))
}

#[openapi(tag = "Profile")]
#[get("/users/<user_id>/ratings")]
pub async fn get_user_ratings(
    db: &State<DbConn>,
    _member: MemberGuard,
    user_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&user_id)
        .map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    db.collection::<Profile>("profiles")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let ratings = DirectoryService::rating_responses(db, &object_id).await?;
    let average = LifecycleService::average_rating(db, &object_id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "ratings": ratings,
        "average_rating": average,
    }))))
}
