pub mod auth;
pub mod notebooks;
pub mod reviews;
pub mod study;
pub mod users;
