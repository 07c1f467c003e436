pub mod communication;
pub mod config;
pub mod control_system;
pub mod data_structures;
pub mod errors;
pub mod flow_analyzer;
pub mod global_variables;
pub mod shared_data;
pub mod simulation_engine;

pub use config::ControllerConfig;
pub use control_system::traffic_manager::{StopOutcome, TrafficManager};
pub use errors::{ConfigError, ControlError};
