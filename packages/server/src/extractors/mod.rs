pub mod auth;
pub mod base_url;
pub mod form;
pub mod json;
pub mod query;
