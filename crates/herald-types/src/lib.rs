pub mod api;
pub mod models;
