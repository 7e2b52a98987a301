use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;
use std::fmt;

/// Status of a swap request. `Rejected` and `Completed` are terminal.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

impl SwapStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Accepted => "accepted",
            SwapStatus::Rejected => "rejected",
            SwapStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<SwapStatus> {
        match s {
            "pending" => Some(SwapStatus::Pending),
            "accepted" => Some(SwapStatus::Accepted),
            "rejected" => Some(SwapStatus::Rejected),
            "completed" => Some(SwapStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SwapRequest {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub requester_id: ObjectId,
    pub recipient_id: ObjectId,
    pub offered_skill_id: ObjectId,
    pub wanted_skill_id: ObjectId,
    pub message: Option<String>,
    pub status: SwapStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateSwapDto {
    pub recipient_id: String,
    pub offered_skill_id: String,
    pub wanted_skill_id: String,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateSwapStatusDto {
    pub status: String,
}

/// One participant as it appears in a joined swap listing.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SwapParticipant {
    pub id: String,
    pub name: String,
    pub profile_photo_url: Option<String>,
}

/// A swap request with participant and skill references resolved.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SwapRequestResponse {
    pub id: String,
    pub requester: SwapParticipant,
    pub recipient: SwapParticipant,
    pub offered_skill: String,
    pub wanted_skill: String,
    pub message: Option<String>,
    pub status: SwapStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            SwapStatus::Pending,
            SwapStatus::Accepted,
            SwapStatus::Rejected,
            SwapStatus::Completed,
        ] {
            assert_eq!(SwapStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SwapStatus::parse("cancelled"), None);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SwapStatus::Pending).unwrap(),
            "\"pending\""
        );
    }
}
