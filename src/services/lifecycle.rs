use log::debug;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use rocket::futures::TryStreamExt;
use thiserror::Error;

use crate::db::DbConn;
use crate::models::{Profile, Rating, SwapRequest, SwapStatus};
use crate::utils::ApiError;

/// Everything that can go wrong inside the swap lifecycle. Routes convert
/// these into HTTP responses; nothing here retries or partially writes.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("you are not allowed to act on this request")]
    NotAuthorized,
    #[error("request is {from}; it cannot be {attempted}")]
    InvalidTransition {
        from: SwapStatus,
        attempted: &'static str,
    },
    #[error("{0}")]
    InvalidArgument(String),
    #[error("request store unavailable: {0}")]
    StoreUnavailable(#[from] mongodb::error::Error),
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound(_) => ApiError::not_found(err.to_string()),
            LifecycleError::NotAuthorized => ApiError::forbidden(err.to_string()),
            LifecycleError::InvalidTransition { .. } => ApiError::conflict(err.to_string()),
            LifecycleError::InvalidArgument(_) => ApiError::bad_request(err.to_string()),
            LifecycleError::StoreUnavailable(_) => ApiError::internal_error(err.to_string()),
        }
    }
}

/// Side of a swap request the acting user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Requester,
    Recipient,
}

/// The five things a participant can do to an existing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapAction {
    Accept,
    Reject,
    Complete,
    Cancel,
    Rate,
}

impl SwapAction {
    /// Status the request must currently hold for the action to apply.
    pub fn required_status(&self) -> SwapStatus {
        match self {
            SwapAction::Accept | SwapAction::Reject | SwapAction::Cancel => SwapStatus::Pending,
            SwapAction::Complete => SwapStatus::Accepted,
            SwapAction::Rate => SwapStatus::Completed,
        }
    }

    /// Status the action moves the request into. Cancellation deletes the
    /// row and rating leaves it untouched, so neither has a target.
    pub fn target_status(&self) -> Option<SwapStatus> {
        match self {
            SwapAction::Accept => Some(SwapStatus::Accepted),
            SwapAction::Reject => Some(SwapStatus::Rejected),
            SwapAction::Complete => Some(SwapStatus::Completed),
            SwapAction::Cancel | SwapAction::Rate => None,
        }
    }

    /// Past participle used in `InvalidTransition` messages.
    pub fn label(&self) -> &'static str {
        match self {
            SwapAction::Accept => "accepted",
            SwapAction::Reject => "rejected",
            SwapAction::Complete => "completed",
            SwapAction::Cancel => "cancelled",
            SwapAction::Rate => "rated",
        }
    }
}

/// Which side of the request `user_id` is on, if any. Admins are not
/// participants; they may read requests but never transition them.
pub fn participant_role(request: &SwapRequest, user_id: &ObjectId) -> Option<Role> {
    if request.requester_id == *user_id {
        Some(Role::Requester)
    } else if request.recipient_id == *user_id {
        Some(Role::Recipient)
    } else {
        None
    }
}

/// The transition table. Status is checked before authorization so that a
/// participant poking a settled request learns the state conflict, while a
/// participant on the wrong side of a live request learns they lack the role.
pub fn authorize(action: SwapAction, current: SwapStatus, role: Role) -> Result<(), LifecycleError> {
    if current != action.required_status() {
        return Err(LifecycleError::InvalidTransition {
            from: current,
            attempted: action.label(),
        });
    }

    match (action, role) {
        (SwapAction::Accept | SwapAction::Reject, Role::Recipient) => Ok(()),
        (SwapAction::Accept | SwapAction::Reject, Role::Requester) => {
            Err(LifecycleError::NotAuthorized)
        }
        (SwapAction::Cancel, Role::Requester) => Ok(()),
        (SwapAction::Cancel, Role::Recipient) => Err(LifecycleError::NotAuthorized),
        (SwapAction::Complete | SwapAction::Rate, _) => Ok(()),
    }
}

/// Arithmetic mean of received ratings. `None` when there are none, so
/// "no ratings yet" stays distinguishable from an actual score of zero.
pub fn mean_rating(ratings: &[i32]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    Some(ratings.iter().map(|r| *r as i64).sum::<i64>() as f64 / ratings.len() as f64)
}

pub fn rating_in_bounds(rating: i32) -> bool {
    (1..=5).contains(&rating)
}

pub struct LifecycleService;

impl LifecycleService {
    async fn fetch(db: &DbConn, request_id: &ObjectId) -> Result<SwapRequest, LifecycleError> {
        db.collection::<SwapRequest>("swap_requests")
            .find_one(doc! { "_id": request_id }, None)
            .await?
            .ok_or(LifecycleError::NotFound("swap request"))
    }

    /// Whether `user_id` has tagged `skill_id` with `skill_type` on their
    /// profile. The UI restricts the selectable options, but that is not a
    /// security boundary, so membership is re-checked here.
    async fn has_skill_tag(
        db: &DbConn,
        user_id: &ObjectId,
        skill_id: &ObjectId,
        skill_type: &str,
    ) -> Result<bool, LifecycleError> {
        let tag = db
            .collection::<mongodb::bson::Document>("user_skills")
            .find_one(
                doc! {
                    "user_id": user_id,
                    "skill_id": skill_id,
                    "skill_type": skill_type,
                },
                None,
            )
            .await?;
        Ok(tag.is_some())
    }

    /// Validates and inserts a new request. New requests always start out
    /// `pending`.
    pub async fn create(
        db: &DbConn,
        requester_id: ObjectId,
        recipient_id: ObjectId,
        offered_skill_id: ObjectId,
        wanted_skill_id: ObjectId,
        message: Option<String>,
    ) -> Result<SwapRequest, LifecycleError> {
        if requester_id == recipient_id {
            return Err(LifecycleError::InvalidArgument(
                "you cannot request a swap with yourself".to_string(),
            ));
        }

        db.collection::<Profile>("profiles")
            .find_one(doc! { "_id": &recipient_id }, None)
            .await?
            .ok_or(LifecycleError::NotFound("recipient"))?;

        for skill_id in [&offered_skill_id, &wanted_skill_id] {
            db.collection::<mongodb::bson::Document>("skills")
                .find_one(doc! { "_id": skill_id }, None)
                .await?
                .ok_or(LifecycleError::NotFound("skill"))?;
        }

        if !Self::has_skill_tag(db, &requester_id, &offered_skill_id, "offered").await? {
            return Err(LifecycleError::InvalidArgument(
                "offered skill is not on your offered list".to_string(),
            ));
        }
        if !Self::has_skill_tag(db, &recipient_id, &wanted_skill_id, "wanted").await? {
            return Err(LifecycleError::InvalidArgument(
                "wanted skill is not on the recipient's wanted list".to_string(),
            ));
        }

        // One open request per (pair, skill pair) at a time.
        let duplicate = db
            .collection::<SwapRequest>("swap_requests")
            .find_one(
                doc! {
                    "requester_id": &requester_id,
                    "recipient_id": &recipient_id,
                    "offered_skill_id": &offered_skill_id,
                    "wanted_skill_id": &wanted_skill_id,
                    "status": SwapStatus::Pending.as_str(),
                },
                None,
            )
            .await?;
        if duplicate.is_some() {
            return Err(LifecycleError::InvalidArgument(
                "an identical request is already pending".to_string(),
            ));
        }

        let request = SwapRequest {
            id: None,
            requester_id,
            recipient_id,
            offered_skill_id,
            wanted_skill_id,
            message,
            status: SwapStatus::Pending,
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        };

        let result = db
            .collection::<SwapRequest>("swap_requests")
            .insert_one(&request, None)
            .await?;

        let mut request = request;
        request.id = result.inserted_id.as_object_id();
        Ok(request)
    }

    /// Moves a request to `target` on behalf of `acting_user`. The write is
    /// a single conditional update keyed on the expected current status, so
    /// of two racing attempts exactly one wins and the loser sees the
    /// conflict.
    pub async fn transition(
        db: &DbConn,
        request_id: &ObjectId,
        acting_user: &ObjectId,
        target: SwapStatus,
    ) -> Result<SwapRequest, LifecycleError> {
        let mut request = Self::fetch(db, request_id).await?;
        let role = participant_role(&request, acting_user).ok_or(LifecycleError::NotAuthorized)?;

        let action = match target {
            SwapStatus::Accepted => SwapAction::Accept,
            SwapStatus::Rejected => SwapAction::Reject,
            SwapStatus::Completed => SwapAction::Complete,
            SwapStatus::Pending => {
                return Err(LifecycleError::InvalidTransition {
                    from: request.status,
                    attempted: "returned to pending",
                });
            }
        };

        authorize(action, request.status, role)?;

        let now = DateTime::now();
        let result = db
            .collection::<SwapRequest>("swap_requests")
            .update_one(
                doc! { "_id": request_id, "status": request.status.as_str() },
                doc! { "$set": { "status": target.as_str(), "updated_at": now } },
                None,
            )
            .await?;

        if result.modified_count == 0 {
            // Lost a race: someone else settled the request first. Re-read
            // so the conflict names the status that actually holds now.
            let current = Self::fetch(db, request_id).await?;
            debug!(
                "swap {} transition to {} lost race, now {}",
                request_id.to_hex(),
                target,
                current.status
            );
            return Err(LifecycleError::InvalidTransition {
                from: current.status,
                attempted: action.label(),
            });
        }

        request.status = target;
        request.updated_at = now;
        Ok(request)
    }

    /// Withdraws a still-pending request. Hard delete: the recipient simply
    /// no longer sees it, matching the platform's no-audit-trail model.
    pub async fn cancel(
        db: &DbConn,
        request_id: &ObjectId,
        acting_user: &ObjectId,
    ) -> Result<(), LifecycleError> {
        let request = Self::fetch(db, request_id).await?;
        let role = participant_role(&request, acting_user).ok_or(LifecycleError::NotAuthorized)?;

        authorize(SwapAction::Cancel, request.status, role)?;

        let result = db
            .collection::<SwapRequest>("swap_requests")
            .delete_one(
                doc! {
                    "_id": request_id,
                    "requester_id": acting_user,
                    "status": SwapStatus::Pending.as_str(),
                },
                None,
            )
            .await?;

        if result.deleted_count == 0 {
            let current = Self::fetch(db, request_id).await?;
            return Err(LifecycleError::InvalidTransition {
                from: current.status,
                attempted: SwapAction::Cancel.label(),
            });
        }

        Ok(())
    }

    /// Records the acting participant's rating of their counterpart on a
    /// completed swap. The rated side is derived, never caller-supplied.
    pub async fn submit_rating(
        db: &DbConn,
        request_id: &ObjectId,
        rater_id: &ObjectId,
        rating: i32,
        feedback: Option<String>,
    ) -> Result<Rating, LifecycleError> {
        if !rating_in_bounds(rating) {
            return Err(LifecycleError::InvalidArgument(
                "rating must be between 1 and 5".to_string(),
            ));
        }

        let request = Self::fetch(db, request_id).await?;
        let role = participant_role(&request, rater_id).ok_or(LifecycleError::NotAuthorized)?;

        authorize(SwapAction::Rate, request.status, role)?;

        let rated_id = match role {
            Role::Requester => request.recipient_id,
            Role::Recipient => request.requester_id,
        };

        // One rating per participant per swap.
        let existing = db
            .collection::<Rating>("ratings")
            .find_one(
                doc! { "swap_request_id": request_id, "rater_id": rater_id },
                None,
            )
            .await?;
        if existing.is_some() {
            return Err(LifecycleError::InvalidArgument(
                "you have already rated this swap".to_string(),
            ));
        }

        let entry = Rating {
            id: None,
            swap_request_id: *request_id,
            rater_id: *rater_id,
            rated_id,
            rating,
            feedback,
            created_at: DateTime::now(),
        };

        let result = db
            .collection::<Rating>("ratings")
            .insert_one(&entry, None)
            .await?;

        let mut entry = entry;
        entry.id = result.inserted_id.as_object_id();
        Ok(entry)
    }

    /// Mean rating received by `user_id`, or `None` with no ratings yet.
    pub async fn average_rating(
        db: &DbConn,
        user_id: &ObjectId,
    ) -> Result<Option<f64>, LifecycleError> {
        let ratings: Vec<Rating> = db
            .collection::<Rating>("ratings")
            .find(doc! { "rated_id": user_id }, None)
            .await?
            .try_collect()
            .await?;

        let values: Vec<i32> = ratings.iter().map(|r| r.rating).collect();
        Ok(mean_rating(&values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(status: SwapStatus) -> (SwapRequest, ObjectId, ObjectId) {
        let requester = ObjectId::new();
        let recipient = ObjectId::new();
        let req = SwapRequest {
            id: Some(ObjectId::new()),
            requester_id: requester,
            recipient_id: recipient,
            offered_skill_id: ObjectId::new(),
            wanted_skill_id: ObjectId::new(),
            message: None,
            status,
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        };
        (req, requester, recipient)
    }

    #[test]
    fn recipient_settles_pending_requests() {
        assert!(authorize(SwapAction::Accept, SwapStatus::Pending, Role::Recipient).is_ok());
        assert!(authorize(SwapAction::Reject, SwapStatus::Pending, Role::Recipient).is_ok());
    }

    #[test]
    fn requester_cannot_settle_own_request() {
        assert!(matches!(
            authorize(SwapAction::Accept, SwapStatus::Pending, Role::Requester),
            Err(LifecycleError::NotAuthorized)
        ));
        assert!(matches!(
            authorize(SwapAction::Reject, SwapStatus::Pending, Role::Requester),
            Err(LifecycleError::NotAuthorized)
        ));
    }

    #[test]
    fn either_participant_completes_an_accepted_swap() {
        assert!(authorize(SwapAction::Complete, SwapStatus::Accepted, Role::Requester).is_ok());
        assert!(authorize(SwapAction::Complete, SwapStatus::Accepted, Role::Recipient).is_ok());
    }

    #[test]
    fn completing_straight_from_pending_is_a_conflict() {
        assert!(matches!(
            authorize(SwapAction::Complete, SwapStatus::Pending, Role::Recipient),
            Err(LifecycleError::InvalidTransition {
                from: SwapStatus::Pending,
                attempted: "completed",
            })
        ));
    }

    #[test]
    fn rejected_and_completed_are_terminal() {
        for terminal in [SwapStatus::Rejected, SwapStatus::Completed] {
            for action in [SwapAction::Accept, SwapAction::Reject, SwapAction::Complete] {
                for role in [Role::Requester, Role::Recipient] {
                    assert!(matches!(
                        authorize(action, terminal, role),
                        Err(LifecycleError::InvalidTransition { .. })
                    ));
                }
            }
        }
    }

    #[test]
    fn only_the_requester_cancels_and_only_while_pending() {
        assert!(authorize(SwapAction::Cancel, SwapStatus::Pending, Role::Requester).is_ok());
        assert!(matches!(
            authorize(SwapAction::Cancel, SwapStatus::Pending, Role::Recipient),
            Err(LifecycleError::NotAuthorized)
        ));
        assert!(matches!(
            authorize(SwapAction::Cancel, SwapStatus::Accepted, Role::Requester),
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn rating_requires_a_completed_swap() {
        assert!(authorize(SwapAction::Rate, SwapStatus::Completed, Role::Requester).is_ok());
        assert!(authorize(SwapAction::Rate, SwapStatus::Completed, Role::Recipient).is_ok());
        assert!(matches!(
            authorize(SwapAction::Rate, SwapStatus::Accepted, Role::Requester),
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn roles_derive_from_the_request_row() {
        let (req, requester, recipient) = request(SwapStatus::Pending);
        assert_eq!(participant_role(&req, &requester), Some(Role::Requester));
        assert_eq!(participant_role(&req, &recipient), Some(Role::Recipient));
        assert_eq!(participant_role(&req, &ObjectId::new()), None);
    }

    #[test]
    fn action_status_mappings_line_up() {
        assert_eq!(SwapAction::Accept.target_status(), Some(SwapStatus::Accepted));
        assert_eq!(SwapAction::Reject.target_status(), Some(SwapStatus::Rejected));
        assert_eq!(SwapAction::Complete.target_status(), Some(SwapStatus::Completed));
        assert_eq!(SwapAction::Cancel.target_status(), None);
        assert_eq!(SwapAction::Rate.target_status(), None);
        assert_eq!(SwapAction::Complete.required_status(), SwapStatus::Accepted);
    }

    #[test]
    fn mean_rating_distinguishes_empty_from_zero() {
        assert_eq!(mean_rating(&[]), None);
        assert_eq!(mean_rating(&[4, 5, 3]), Some(4.0));
        assert_eq!(mean_rating(&[5]), Some(5.0));
        assert_eq!(mean_rating(&[1, 2]), Some(1.5));
    }

    #[test]
    fn rating_bounds_are_inclusive() {
        assert!(rating_in_bounds(1));
        assert!(rating_in_bounds(5));
        assert!(!rating_in_bounds(0));
        assert!(!rating_in_bounds(6));
    }

    #[test]
    fn errors_surface_as_the_right_statuses() {
        use rocket::http::Status;

        assert_eq!(
            ApiError::from(LifecycleError::NotFound("swap request")).status,
            Status::NotFound
        );
        assert_eq!(
            ApiError::from(LifecycleError::NotAuthorized).status,
            Status::Forbidden
        );
        assert_eq!(
            ApiError::from(LifecycleError::InvalidTransition {
                from: SwapStatus::Rejected,
                attempted: "accepted",
            })
            .status,
            Status::Conflict
        );
        assert_eq!(
            ApiError::from(LifecycleError::InvalidArgument("bad".to_string())).status,
            Status::BadRequest
        );
    }

    #[test]
    fn transition_conflicts_read_naturally() {
        let err = LifecycleError::InvalidTransition {
            from: SwapStatus::Pending,
            attempted: "completed",
        };
        assert_eq!(err.to_string(), "request is pending; it cannot be completed");
    }
}
