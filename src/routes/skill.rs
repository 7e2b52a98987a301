use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, DateTime};
use mongodb::options::FindOptions;
use rocket::futures::TryStreamExt;
use crate::db::DbConn;
use crate::guards::MemberGuard;
use crate::models::{CreateSkillDto, Skill, SkillResponse};
use crate::utils::{validate_skill_name, ApiResponse, ApiError};

#[openapi(tag = "Skill")]
#[get("/skills")]
pub async fn get_all_skills(
    db: &State<DbConn>,
) -> Result<Json<ApiResponse<Vec<SkillResponse>>>, ApiError> {
    let find_options = FindOptions::builder()
        .sort(doc! { "name": 1 })
        .build();

    let skills: Vec<Skill> = db.collection::<Skill>("skills")
        .find(doc! { "is_approved": true }, find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .try_collect()
        .await
        .map_err(|e| ApiError::internal_error(format!("Collection error: {}", e)))?;

    Ok(Json(ApiResponse::success(
        skills.into_iter().map(SkillResponse::from).collect(),
    )))
}

/// New skills land unapproved and stay out of listings until an admin
/// signs them off.
#[openapi(tag = "Skill")]
#[post("/skills", data = "<dto>")]
pub async fn create_skill(
    db: &State<DbConn>,
    _member: MemberGuard,
    dto: Json<CreateSkillDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let name = dto.name.trim();
    if !validate_skill_name(name) {
        return Err(ApiError::bad_request("Invalid skill name"));
    }

    let existing = db.collection::<Skill>("skills")
        .find_one(
            doc! { "name": { "$regex": format!("^{}$", regex::escape(name)), "$options": "i" } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    if let Some(skill) = existing {
        // Re-proposing an existing skill hands back the known row instead
        // of accumulating case-variant duplicates.
        return Ok(Json(ApiResponse::success(serde_json::json!({
            "skill": SkillResponse::from(skill.clone()),
            "pending_approval": !skill.is_approved,
        }))));
    }

    let skill = Skill {
        id: None,
        name: name.to_string(),
        category: dto.category.clone(),
        is_approved: false,
        rejection_reason: None,
        created_at: DateTime::now(),
    };

    let result = db.collection::<Skill>("skills")
        .insert_one(&skill, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create skill: {}", e)))?;

    let mut skill = skill;
    skill.id = result.inserted_id.as_object_id();

    Ok(Json(ApiResponse::success_with_message(
        "Skill submitted for approval".to_string(),
        serde_json::json!({
            "skill": SkillResponse::from(skill),
            "pending_approval": true,
        }),
    )))
}
