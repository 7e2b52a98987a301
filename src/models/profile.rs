use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PrivacySetting {
    Public,
    Private,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Profile {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    // Stored in BSON; response types never carry it.
    pub password_hash: String,
    pub name: String,
    pub location: Option<String>,
    pub profile_photo_url: Option<String>,
    pub availability: Vec<String>,
    pub privacy_setting: PrivacySetting,
    pub is_admin: bool,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub last_login_at: DateTime,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RegisterDto {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateProfileDto {
    pub name: Option<String>,
    pub location: Option<String>,
    pub profile_photo_url: Option<String>,
    pub availability: Option<Vec<String>>,
    pub privacy_setting: Option<PrivacySetting>,
    pub offered_skill_ids: Option<Vec<String>>,
    pub wanted_skill_ids: Option<Vec<String>>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ProfileResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub location: Option<String>,
    pub profile_photo_url: Option<String>,
    pub availability: Vec<String>,
    pub privacy_setting: PrivacySetting,
    pub is_admin: bool,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        ProfileResponse {
            id: profile.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: profile.email,
            name: profile.name,
            location: profile.location,
            profile_photo_url: profile.profile_photo_url,
            availability: profile.availability,
            privacy_setting: profile.privacy_setting,
            is_admin: profile.is_admin,
        }
    }
}

/// Moderation view of an account.
#[derive(Debug, Serialize, JsonSchema)]
pub struct AdminUserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub created_at: String,
    pub last_login_at: String,
}

impl From<Profile> for AdminUserResponse {
    fn from(profile: Profile) -> Self {
        AdminUserResponse {
            id: profile.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: profile.email,
            name: profile.name,
            is_admin: profile.is_admin,
            is_banned: profile.is_banned,
            ban_reason: profile.ban_reason,
            created_at: profile.created_at.try_to_rfc3339_string().unwrap_or_default(),
            last_login_at: profile.last_login_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

/// A browsable profile with its skill tags and rating already joined in.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ProfileCardResponse {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub profile_photo_url: Option<String>,
    pub availability: Vec<String>,
    pub skills_offered: Vec<super::skill::SkillResponse>,
    pub skills_wanted: Vec<super::skill::SkillResponse>,
    pub average_rating: Option<f64>,
    pub rating_count: i64,
}
