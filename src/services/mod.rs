pub mod notifier;
pub mod occupancy_api;
pub mod response_schema;
pub mod session_service;
pub mod tier;
