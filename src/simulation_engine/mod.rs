// simulation_engine/mod.rs
pub mod scenarios;
pub mod simulation;
pub mod simulator;
