// simulation.rs
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use crate::control_system::traffic_manager::Shared;
use crate::simulation_engine::scenarios::Scenario;
use crate::simulation_engine::simulator::ScenarioSimulator;

/// Spawns the scenario generator. It writes one frame every `1 / speed`
/// seconds until shutdown is signalled or its session is superseded.
pub(crate) fn spawn_scenario_task(
    shared: Arc<Shared>,
    session: u64,
    scenario: Scenario,
    speed: f64,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let period = Duration::from_secs_f64(1.0 / speed);
    let mut simulator = ScenarioSimulator::new(scenario);

    tokio::spawn(async move {
        loop {
            let frame = simulator.next_frame();
            if !shared.apply_simulation_frame(session, frame) {
                log::debug!("scenario session {} superseded, exiting", session);
                break;
            }

            tokio::select! {
                _ = sleep(period) => {}
                _ = shutdown.changed() => break,
            }
        }
        log::debug!(
            "scenario '{}' exited after {} iterations",
            scenario,
            simulator.iteration()
        );
    })
}
