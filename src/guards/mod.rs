pub mod auth;
pub mod member;
pub mod admin;

pub use auth::AuthGuard;
pub use member::MemberGuard;
pub use admin::AdminGuard;
