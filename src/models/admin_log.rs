use mongodb::bson::{oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};

/// Audit record appended for every admin mutation.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminLog {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub admin_id: ObjectId,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<ObjectId>,
    pub details: Option<Document>,
    pub created_at: DateTime,
}
