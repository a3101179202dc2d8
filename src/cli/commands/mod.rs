pub mod auth;
pub mod backup;
pub mod misc;
pub mod utils;
