pub mod comparator;
pub mod compliance_service;
pub mod controller;
pub mod desired_state;
pub mod error;
pub mod state;
pub mod types;
