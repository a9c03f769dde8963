pub mod app_settings;
pub mod cache;
pub mod fetch;
pub mod follow;
pub mod refresher;
pub mod resources;
