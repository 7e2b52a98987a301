use mongodb::bson::{doc, oid::ObjectId};
use rocket::futures::TryStreamExt;
use std::collections::HashMap;

use crate::db::DbConn;
use crate::models::{
    Profile, ProfileCardResponse, Rating, Skill, SkillResponse, SkillType, SwapParticipant,
    SwapRequest, SwapRequestResponse, UserSkill,
};
use crate::services::lifecycle;
use crate::utils::ApiError;

/// Batched reads that resolve cross-collection references up front, so
/// handlers never stitch rows together with per-item lookups or fall back
/// to placeholder names when an id fails to match.
pub struct DirectoryService;

impl DirectoryService {
    async fn skills_by_id(
        db: &DbConn,
        ids: &[ObjectId],
    ) -> Result<HashMap<ObjectId, Skill>, ApiError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let skills: Vec<Skill> = db
            .collection::<Skill>("skills")
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| ApiError::internal_error(format!("Collection error: {}", e)))?;

        Ok(skills
            .into_iter()
            .filter_map(|s| s.id.map(|id| (id, s)))
            .collect())
    }

    async fn profiles_by_id(
        db: &DbConn,
        ids: &[ObjectId],
    ) -> Result<HashMap<ObjectId, Profile>, ApiError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let profiles: Vec<Profile> = db
            .collection::<Profile>("profiles")
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| ApiError::internal_error(format!("Collection error: {}", e)))?;

        Ok(profiles
            .into_iter()
            .filter_map(|p| p.id.map(|id| (id, p)))
            .collect())
    }

    /// Joins skill tags and received ratings onto a page of profiles.
    pub async fn profile_cards(
        db: &DbConn,
        profiles: Vec<Profile>,
    ) -> Result<Vec<ProfileCardResponse>, ApiError> {
        let user_ids: Vec<ObjectId> = profiles.iter().filter_map(|p| p.id).collect();
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let tags: Vec<UserSkill> = db
            .collection::<UserSkill>("user_skills")
            .find(doc! { "user_id": { "$in": user_ids.clone() } }, None)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| ApiError::internal_error(format!("Collection error: {}", e)))?;

        let skill_ids: Vec<ObjectId> = tags.iter().map(|t| t.skill_id).collect();
        let skills = Self::skills_by_id(db, &skill_ids).await?;

        let ratings: Vec<Rating> = db
            .collection::<Rating>("ratings")
            .find(doc! { "rated_id": { "$in": user_ids.clone() } }, None)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| ApiError::internal_error(format!("Collection error: {}", e)))?;

        let mut tags_by_user: HashMap<ObjectId, Vec<&UserSkill>> = HashMap::new();
        for tag in &tags {
            tags_by_user.entry(tag.user_id).or_default().push(tag);
        }

        let mut ratings_by_user: HashMap<ObjectId, Vec<i32>> = HashMap::new();
        for rating in &ratings {
            ratings_by_user
                .entry(rating.rated_id)
                .or_default()
                .push(rating.rating);
        }

        let mut cards = Vec::with_capacity(profiles.len());
        for profile in profiles {
            let id = profile
                .id
                .ok_or_else(|| ApiError::internal_error("Profile missing ID"))?;

            let mut offered = Vec::new();
            let mut wanted = Vec::new();
            for tag in tags_by_user.get(&id).map(|v| v.as_slice()).unwrap_or(&[]) {
                let skill = skills.get(&tag.skill_id).ok_or_else(|| {
                    ApiError::internal_error("Skill tag references a missing skill")
                })?;
                let response = SkillResponse::from(skill.clone());
                match tag.skill_type {
                    SkillType::Offered => offered.push(response),
                    SkillType::Wanted => wanted.push(response),
                }
            }

            let received = ratings_by_user.get(&id).map(|v| v.as_slice()).unwrap_or(&[]);

            cards.push(ProfileCardResponse {
                id: id.to_hex(),
                name: profile.name,
                location: profile.location,
                profile_photo_url: profile.profile_photo_url,
                availability: profile.availability,
                skills_offered: offered,
                skills_wanted: wanted,
                average_rating: lifecycle::mean_rating(received),
                rating_count: received.len() as i64,
            });
        }

        Ok(cards)
    }

    /// Ratings received by one user, newest first, with rater names
    /// resolved.
    pub async fn rating_responses(
        db: &DbConn,
        user_id: &ObjectId,
    ) -> Result<Vec<crate::models::RatingResponse>, ApiError> {
        let find_options = mongodb::options::FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let ratings: Vec<Rating> = db
            .collection::<Rating>("ratings")
            .find(doc! { "rated_id": user_id }, find_options)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| ApiError::internal_error(format!("Collection error: {}", e)))?;

        let rater_ids: Vec<ObjectId> = ratings.iter().map(|r| r.rater_id).collect();
        let raters = Self::profiles_by_id(db, &rater_ids).await?;

        let mut responses = Vec::with_capacity(ratings.len());
        for rating in ratings {
            let rater = raters.get(&rating.rater_id).ok_or_else(|| {
                ApiError::internal_error("Rating references a missing rater profile")
            })?;
            responses.push(crate::models::RatingResponse {
                id: rating.id.map(|id| id.to_hex()).unwrap_or_default(),
                rater_name: rater.name.clone(),
                rating: rating.rating,
                feedback: rating.feedback,
                created_at: rating.created_at.try_to_rfc3339_string().unwrap_or_default(),
            });
        }

        Ok(responses)
    }

    /// Joins participant profiles and skill names onto a page of swap
    /// requests. A dangling reference is a data error, not a placeholder.
    pub async fn swap_responses(
        db: &DbConn,
        requests: Vec<SwapRequest>,
    ) -> Result<Vec<SwapRequestResponse>, ApiError> {
        let mut user_ids = Vec::new();
        let mut skill_ids = Vec::new();
        for request in &requests {
            user_ids.push(request.requester_id);
            user_ids.push(request.recipient_id);
            skill_ids.push(request.offered_skill_id);
            skill_ids.push(request.wanted_skill_id);
        }

        let profiles = Self::profiles_by_id(db, &user_ids).await?;
        let skills = Self::skills_by_id(db, &skill_ids).await?;

        let participant = |id: &ObjectId| -> Result<SwapParticipant, ApiError> {
            let profile = profiles.get(id).ok_or_else(|| {
                ApiError::internal_error("Swap request references a missing profile")
            })?;
            Ok(SwapParticipant {
                id: id.to_hex(),
                name: profile.name.clone(),
                profile_photo_url: profile.profile_photo_url.clone(),
            })
        };

        let skill_name = |id: &ObjectId| -> Result<String, ApiError> {
            skills
                .get(id)
                .map(|s| s.name.clone())
                .ok_or_else(|| ApiError::internal_error("Swap request references a missing skill"))
        };

        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            let id = request
                .id
                .ok_or_else(|| ApiError::internal_error("Swap request missing ID"))?;

            responses.push(SwapRequestResponse {
                id: id.to_hex(),
                requester: participant(&request.requester_id)?,
                recipient: participant(&request.recipient_id)?,
                offered_skill: skill_name(&request.offered_skill_id)?,
                wanted_skill: skill_name(&request.wanted_skill_id)?,
                message: request.message,
                status: request.status,
                created_at: request.created_at.try_to_rfc3339_string().unwrap_or_default(),
                updated_at: request.updated_at.try_to_rfc3339_string().unwrap_or_default(),
            });
        }

        Ok(responses)
    }
}
