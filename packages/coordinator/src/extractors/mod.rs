pub mod json;
pub mod user;
