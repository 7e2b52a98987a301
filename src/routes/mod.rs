pub mod auth;
pub mod profile;
pub mod browse;
pub mod skill;
pub mod swap;
pub mod rating;
pub mod message;
pub mod admin;
