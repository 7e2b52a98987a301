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

/// Admin-only routes. The admin flag lives on the profile document, not in
/// the token, so revoking it takes effect immediately.
pub struct AdminGuard {
    pub auth: AuthGuard,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminGuard {
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
                    Ok(Some(profile)) if profile.is_admin && !profile.is_banned => {
                        Outcome::Success(AdminGuard { auth })
                    }
                    Ok(Some(_)) => Outcome::Error((Status::Forbidden, ())),
                    Ok(None) => {
                        warn!("admin guard rejected - profile not found");
                        Outcome::Error((Status::Forbidden, ()))
                    }
                    Err(e) => {
                        warn!("admin guard rejected - DB error: {:?}", e);
                        Outcome::Error((Status::Forbidden, ()))
                    }
                }
            }
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Forward(f) => Outcome::Forward(f),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for AdminGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}
