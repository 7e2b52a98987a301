use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Info,
    Warning,
    Alert,
    Update,
}

/// Platform-wide announcement authored by an admin.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlatformMessage {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub admin_id: ObjectId,
    pub title: String,
    pub message: String,
    pub message_type: MessageType,
    pub is_active: bool,
    pub created_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateMessageDto {
    pub title: String,
    pub message: String,
    pub message_type: MessageType,
}
