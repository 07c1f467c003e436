// src/shared_data.rs

use crate::control_system::intersection::IntersectionMode;
use crate::data_structures::{Direction, LightState, PerDirection};
use crate::global_variables::MAX_SPEED_KMH;
use crate::simulation_engine::scenarios::Scenario;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

/// Last known demand for one approach.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DetectionSnapshot {
    /// Distinct objects seen on this approach.
    pub count: u32,
    /// Smoothed average speed in km/h.
    pub speed_avg: f64,
    /// Identifiers of the tracked objects.
    pub objects: BTreeSet<u64>,
}

impl DetectionSnapshot {
    /// Speeds that are negative, not finite or absurdly high are clamped.
    pub fn new(count: u32, objects: BTreeSet<u64>, speed_avg: f64) -> Self {
        let speed_avg = if speed_avg.is_finite() {
            speed_avg.clamp(0.0, MAX_SPEED_KMH)
        } else {
            0.0
        };
        Self {
            count,
            speed_avg,
            objects,
        }
    }

    /// Snapshot whose object set is `1..=count`, as produced by the simulator.
    pub fn synthetic(count: u32, speed_avg: f64) -> Self {
        Self::new(count, (1..=u64::from(count)).collect(), speed_avg)
    }
}

/// Externally visible state of one approach's signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignalView {
    pub state: LightState,
    pub remaining_time: i32,
    pub green_duration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationStatus {
    pub active: bool,
    pub scenario: Scenario,
    pub speed: f64,
}

impl Default for SimulationStatus {
    fn default() -> Self {
        Self {
            active: false,
            scenario: Scenario::Normal,
            speed: 1.0,
        }
    }
}

/// A recorded manual override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LightOverride {
    pub direction: Direction,
    pub state: LightState,
}

/// Point-in-time view of the whole controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficState {
    pub timestamp: u64,
    pub mode: IntersectionMode,
    pub signals: PerDirection<SignalView>,
    pub detection: PerDirection<DetectionSnapshot>,
    pub manual_mode: bool,
    pub manual_override: PerDirection<Option<LightState>>,
    pub simulation: SimulationStatus,
}

pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
