use log::warn;
use rocket::request::{self, Request, FromRequest, Outcome};
use rocket::http::Status;
use rocket::State;
use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::Profile;
use mongodb::bson::doc;
use rocket_okapi::request::OpenApiFromRequest;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::request::RequestHeaderInput;

/// Authenticated, non-banned platform member. Banned accounts keep a valid
/// token until expiry, so the ban flag is checked on every request.
pub struct MemberGuard {
    pub auth: AuthGuard,
    pub profile: Profile,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for MemberGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let auth_outcome = req.guard::<AuthGuard>().await;

        match auth_outcome {
            Outcome::Success(auth) => {
                let db = req.guard::<&State<DbConn>>().await.unwrap();

                let profile = db.collection::<Profile>("profiles")
                    .find_one(doc! { "_id": &auth.user_id }, None)
                    .await;

                match profile {
                    Ok(Some(profile)) => {
                        if profile.is_banned {
                            warn!("member guard rejected banned user {}", auth.user_id.to_hex());
                            Outcome::Error((Status::Forbidden, ()))
                        } else {
                            Outcome::Success(MemberGuard { auth, profile })
                        }
                    }
                    Ok(None) => {
                        warn!("member guard rejected - profile not found");
                        Outcome::Error((Status::Forbidden, ()))
                    }
                    Err(e) => {
                        warn!("member guard rejected - DB error: {:?}", e);
                        Outcome::Error((Status::Forbidden, ()))
                    }
                }
            }
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Forward(f) => Outcome::Forward(f),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for MemberGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}
