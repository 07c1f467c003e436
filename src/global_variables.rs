// Signal timing (seconds)
pub const INITIAL_GREEN_SECS: u32 = 10;
pub const AMBER_SECS: u32 = 3;
pub const RED_SECS: u32 = 10;

// Ratio allocation
pub const BASE_GREEN_SECS: u32 = 10;
pub const MIN_GREEN_SECS: u32 = 5;
pub const MAX_GREEN_SECS: u32 = 30;
pub const ADJUSTMENT_FACTOR: f64 = 3.0;

// Two-group allocation
pub const TWO_GROUP_LONG_GREEN_SECS: u32 = 12;
pub const TWO_GROUP_SHORT_GREEN_SECS: u32 = 8;

// Sensor / detection bounds
pub const MAX_SENSOR_COUNT: u32 = 1_000;
pub const MAX_SPEED_KMH: f64 = 300.0;

// Control loop
pub const TICK_PERIOD_MS: u64 = 1_000;

// Simulation
pub const MIN_SIMULATION_SPEED: f64 = 0.1;
pub const MAX_SIMULATION_SPEED: f64 = 5.0;
pub const SIMULATION_STOP_TIMEOUT_MS: u64 = 2_000;
pub const SCENARIO_CYCLE_ITERATIONS: u64 = 60;

// History
pub const HISTORY_RECORD_INTERVAL_SECS: u64 = 10;
pub const HISTORY_RETENTION_SECS: u64 = 24 * 60 * 60;

// Event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
