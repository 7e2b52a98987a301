use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Skill {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub category: Option<String>,
    pub is_approved: bool,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime,
}

/// Tags a skill on a profile as something the user teaches or wants taught.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SkillType {
    Offered,
    Wanted,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserSkill {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub skill_id: ObjectId,
    pub skill_type: SkillType,
    pub created_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateSkillDto {
    pub name: String,
    pub category: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SkillResponse {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
}

impl From<Skill> for SkillResponse {
    fn from(skill: Skill) -> Self {
        SkillResponse {
            id: skill.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: skill.name,
            category: skill.category,
        }
    }
}
