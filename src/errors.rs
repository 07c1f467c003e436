use thiserror::Error;

/// Business-rule rejections returned by the control interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("disable simulation mode before enabling manual mode")]
    SimulationActive,

    #[error("disable manual mode before starting a simulation")]
    ManualModeActive,

    #[error("unknown scenario '{0}', expected one of: normal, rush_hour, night, north_congestion, east_west_heavy")]
    UnknownScenario(String),

    #[error("invalid direction '{0}', expected one of: north, south, east, west")]
    InvalidDirection(String),

    #[error("invalid light state '{0}', expected one of: red, green, amber")]
    InvalidLightState(String),
}

/// Failures while loading a `ControllerConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
