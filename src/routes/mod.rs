pub mod auth;
pub mod health;
pub mod navigation;
pub mod permissions;
pub mod users;
