pub mod assignment_service;
pub mod simulation_service;

pub use assignment_service::*;
pub use simulation_service::*;
