use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Rating {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub swap_request_id: ObjectId,
    pub rater_id: ObjectId,
    pub rated_id: ObjectId,
    pub rating: i32, // 1-5
    pub feedback: Option<String>,
    pub created_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateRatingDto {
    pub swap_request_id: String,
    pub rating: i32,
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct RatingResponse {
    pub id: String,
    pub rater_name: String,
    pub rating: i32,
    pub feedback: Option<String>,
    pub created_at: String,
}
