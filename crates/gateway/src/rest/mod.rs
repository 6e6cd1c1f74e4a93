//! REST API endpoints for the gateway

pub mod health;
pub mod projects;
pub mod users;
