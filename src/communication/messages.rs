use crate::control_system::allocator::GreenTime;
use crate::control_system::signal::SignalName;
use crate::data_structures::LightState;
use crate::simulation_engine::scenarios::Scenario;
use serde::Serialize;

/// Notable things the controller did, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ControlEvent {
    PhaseChanged {
        signal: SignalName,
        from: LightState,
        to: LightState,
    },
    GreenTimesAdjusted {
        green_times: Vec<GreenTime>,
    },
    /// No signal was green after a tick; `signal` was forced green.
    LivenessRestored {
        signal: SignalName,
    },
    ManualModeChanged {
        enabled: bool,
    },
    OverrideApplied {
        signal: SignalName,
        state: LightState,
    },
    SimulationStarted {
        scenario: Scenario,
        speed: f64,
    },
    SimulationStopped,
}
