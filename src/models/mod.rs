pub mod profile;
pub mod skill;
pub mod swap;
pub mod rating;
pub mod platform_message;
pub mod admin_log;

pub use profile::*;
pub use skill::*;
pub use swap::*;
pub use rating::*;
pub use platform_message::*;
pub use admin_log::*;
