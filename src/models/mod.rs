pub mod occupancy;
pub mod session;
pub mod upload;
pub mod view;
