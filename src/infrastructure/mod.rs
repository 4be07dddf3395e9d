pub mod agents;
pub mod app_state;
pub mod config;
pub mod database;
pub mod services;
