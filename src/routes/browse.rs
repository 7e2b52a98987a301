use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;
use rocket::futures::TryStreamExt;
use crate::db::DbConn;
use crate::guards::MemberGuard;
use crate::models::{PrivacySetting, Profile};
use crate::services::DirectoryService;
use crate::utils::{ApiResponse, ApiError};

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct BrowseQuery {
    pub search: Option<String>,
    pub skill_id: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Browse")]
#[get("/profiles?<query..>")]
pub async fn browse_profiles(
    db: &State<DbConn>,
    member: MemberGuard,
    query: BrowseQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).min(100);
    let skip = (page - 1) * limit;

    let mut filter = doc! {
        "privacy_setting": "public",
        "is_banned": false,
        "_id": { "$ne": member.auth.user_id },
    };

    if let Some(ref search) = query.search {
        let pattern = regex::escape(search.trim());
        if !pattern.is_empty() {
            filter.insert(
                "$or",
                vec![
                    doc! { "name": { "$regex": &pattern, "$options": "i" } },
                    doc! { "location": { "$regex": &pattern, "$options": "i" } },
                ],
            );
        }
    }

    // Narrow by skill tag first, then page through the matching profiles.
    if let Some(ref skill_id) = query.skill_id {
        let skill_id = ObjectId::parse_str(skill_id)
            .map_err(|_| ApiError::bad_request("Invalid skill ID"))?;

        let tagged: Vec<mongodb::bson::Document> = db
            .collection::<mongodb::bson::Document>("user_skills")
            .find(doc! { "skill_id": skill_id }, None)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| ApiError::internal_error(format!("Collection error: {}", e)))?;

        let user_ids: Vec<ObjectId> = tagged
            .iter()
            .filter_map(|d| d.get_object_id("user_id").ok())
            .collect();

        filter.insert("_id", doc! { "$in": user_ids, "$ne": member.auth.user_id });
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

    let mut profiles = Vec::new();
    while cursor.advance().await.map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))? {
        let profile = cursor.deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        profiles.push(profile);
    }

    let total = db.collection::<Profile>("profiles")
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    let cards = DirectoryService::profile_cards(db, profiles).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "profiles": cards,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "pages": (total as f64 / limit as f64).ceil() as i64,
        }
    }))))
}

#[openapi(tag = "Browse")]
#[get("/profiles/<profile_id>")]
pub async fn get_profile_by_id(
    db: &State<DbConn>,
    member: MemberGuard,
    profile_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&profile_id)
        .map_err(|_| ApiError::bad_request("Invalid profile ID"))?;

    let profile = db.collection::<Profile>("profiles")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;

    // Private and banned profiles are only visible to their owner.
    let is_self = object_id == member.auth.user_id;
    if !is_self && (profile.is_banned || profile.privacy_setting != PrivacySetting::Public) {
        return Err(ApiError::not_found("Profile not found"));
    }

    let cards = DirectoryService::profile_cards(db, vec![profile]).await?;
    let card = cards
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::internal_error("Profile card build failed"))?;

    Ok(Json(ApiResponse::success(
        serde_json::to_value(&card)
            .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?,
    )))
}
