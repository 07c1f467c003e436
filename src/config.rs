use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::control_system::allocator::AllocationConfig;
use crate::control_system::intersection::IntersectionMode;
use crate::control_system::signal::SignalTiming;
use crate::errors::ConfigError;
use crate::global_variables::{
    HISTORY_RECORD_INTERVAL_SECS, HISTORY_RETENTION_SECS, SIMULATION_STOP_TIMEOUT_MS,
    TICK_PERIOD_MS,
};

/// Everything a `TrafficManager` needs to know up front.
/// Missing fields in a config file fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub intersection_name: String,
    pub mode: IntersectionMode,
    pub timing: SignalTiming,
    pub allocation: AllocationConfig,
    pub tick_period_ms: u64,
    pub simulation_stop_timeout_ms: u64,
    pub history_record_interval_secs: u64,
    pub history_retention_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            intersection_name: "Main Intersection".to_string(),
            mode: IntersectionMode::FourWay,
            timing: SignalTiming::default(),
            allocation: AllocationConfig::default(),
            tick_period_ms: TICK_PERIOD_MS,
            simulation_stop_timeout_ms: SIMULATION_STOP_TIMEOUT_MS,
            history_record_interval_secs: HISTORY_RECORD_INTERVAL_SECS,
            history_retention_secs: HISTORY_RETENTION_SECS,
        }
    }
}

impl ControllerConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: ControllerConfig = serde_json::from_str(raw)?;
        Ok(config.validated())
    }

    /// Repair values that would stall or break the controller.
    pub fn validated(mut self) -> Self {
        let timing = &mut self.timing;
        timing.amber = timing.amber.max(1);
        timing.red = timing.red.max(1);
        timing.initial_green = timing.initial_green.max(1);

        let allocation = &mut self.allocation;
        allocation.min_green = allocation.min_green.max(1);
        if allocation.max_green < allocation.min_green {
            log::warn!(
                "max_green {} below min_green {}, raising it",
                allocation.max_green,
                allocation.min_green
            );
            allocation.max_green = allocation.min_green;
        }
        if !allocation.adjustment_factor.is_finite() || allocation.adjustment_factor < 0.0 {
            log::warn!(
                "adjustment_factor {} is not usable, resetting to default",
                allocation.adjustment_factor
            );
            allocation.adjustment_factor = AllocationConfig::default().adjustment_factor;
        }
        allocation.long_green = allocation.long_green.max(1);
        allocation.short_green = allocation.short_green.max(1);

        self.tick_period_ms = self.tick_period_ms.max(10);
        self.history_record_interval_secs = self.history_record_interval_secs.max(1);
        self
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn simulation_stop_timeout(&self) -> Duration {
        Duration::from_millis(self.simulation_stop_timeout_ms)
    }
}
