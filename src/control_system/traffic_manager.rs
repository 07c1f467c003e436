use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::communication::messages::ControlEvent;
use crate::config::ControllerConfig;
use crate::control_system::allocator::{AdaptiveAllocator, AllocationReport};
use crate::control_system::intersection::{Intersection, TickReport};
use crate::data_structures::{Direction, LightState, PerDirection};
use crate::errors::ControlError;
use crate::flow_analyzer::history::{DataPoint, HistoryWindow, TrafficHistory};
use crate::global_variables::{EVENT_CHANNEL_CAPACITY, MAX_SIMULATION_SPEED, MIN_SIMULATION_SPEED};
use crate::shared_data::{
    current_timestamp, DetectionSnapshot, LightOverride, SignalView, SimulationStatus,
    TrafficState,
};
use crate::simulation_engine::scenarios::Scenario;
use crate::simulation_engine::simulation::spawn_scenario_task;

/// Result of `stop_simulation`. Both are successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

/// Every piece of mutable controller state. Guarded by one mutex so readers
/// never see a half-applied update.
#[derive(Debug)]
struct ControlState {
    intersection: Intersection,
    detection: PerDirection<DetectionSnapshot>,
    manual_mode: bool,
    manual_override: PerDirection<Option<LightState>>,
    simulation: SimulationStatus,
    /// Bumped on every `start_simulation`; a scenario task only writes while
    /// its own session is the current one.
    simulation_session: u64,
    history: TrafficHistory,
}

impl ControlState {
    /// Force every overridden signal whose state differs. Nothing else moves.
    fn apply_overrides(&mut self, events: &mut Vec<ControlEvent>) {
        for (direction, wanted) in self.manual_override.iter() {
            let Some(wanted) = *wanted else { continue };
            let signal = self.intersection.signal_for_mut(direction);
            if signal.state() != wanted {
                signal.force(wanted);
                log::info!("manual override: {} forced {}", signal.name(), wanted);
                events.push(ControlEvent::OverrideApplied {
                    signal: signal.name(),
                    state: wanted,
                });
            }
        }
    }

    fn record_history(&mut self, now: u64) {
        if !self.history.should_record(now) {
            return;
        }
        let observations = PerDirection::from_fn(|direction| {
            let snapshot = &self.detection[direction];
            (
                snapshot.count,
                snapshot.speed_avg,
                self.intersection.signal_for(direction).state(),
            )
        });
        self.history.record(now, observations);
    }
}

/// State shared between the manager, the control loop and the scenario task.
#[derive(Debug)]
pub(crate) struct Shared {
    state: Mutex<ControlState>,
    allocator: AdaptiveAllocator,
    events: broadcast::Sender<ControlEvent>,
    config: ControllerConfig,
}

impl Shared {
    /// A panic in one cycle must not wedge every later caller.
    fn lock_state(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: ControlEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn run_control_cycle(&self) {
        let mut events = Vec::new();
        {
            let mut state = self.lock_state();
            if state.manual_mode {
                state.apply_overrides(&mut events);
            } else {
                let allocation = self.allocator.apply(&mut state.intersection);
                push_allocation(&mut events, allocation);
                let report = state.intersection.tick();
                push_tick_report(&mut events, report);
            }
            state.record_history(current_timestamp());
        }
        for event in events {
            self.publish(event);
        }
    }

    /// Write one simulator frame. Returns false once the session is over,
    /// which tells the scenario task to exit.
    pub(crate) fn apply_simulation_frame(
        &self,
        session: u64,
        frame: PerDirection<DetectionSnapshot>,
    ) -> bool {
        let mut state = self.lock_state();
        if !state.simulation.active || state.simulation_session != session {
            return false;
        }
        for (direction, snapshot) in frame.into_entries() {
            state
                .intersection
                .write_sensor(direction, i64::from(snapshot.count));
            state.detection[direction] = snapshot;
        }
        true
    }
}

fn push_allocation(events: &mut Vec<ControlEvent>, allocation: AllocationReport) {
    if allocation.changed {
        events.push(ControlEvent::GreenTimesAdjusted {
            green_times: allocation.green_times,
        });
    }
}

fn push_tick_report(events: &mut Vec<ControlEvent>, report: TickReport) {
    for change in report.transitions {
        log::debug!("{}: {} -> {}", change.signal, change.from, change.to);
        events.push(ControlEvent::PhaseChanged {
            signal: change.signal,
            from: change.from,
            to: change.to,
        });
    }
    if let Some(signal) = report.liveness_restored {
        events.push(ControlEvent::LivenessRestored { signal });
    }
}

struct TaskHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns the intersection and arbitrates between live detection, manual
/// overrides and scenario simulation.
///
/// Lifecycle is `new` -> `start` -> `stop`. `start`, `start_simulation` and
/// `stop_simulation` spawn or await tokio tasks and must run inside a runtime.
pub struct TrafficManager {
    shared: Arc<Shared>,
    control_task: Mutex<Option<TaskHandle>>,
    simulation_task: tokio::sync::Mutex<Option<TaskHandle>>,
}

impl TrafficManager {
    pub fn new(config: ControllerConfig) -> Self {
        let intersection =
            Intersection::new(config.intersection_name.clone(), config.mode, config.timing);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let state = ControlState {
            intersection,
            detection: PerDirection::default(),
            manual_mode: false,
            manual_override: PerDirection::default(),
            simulation: SimulationStatus::default(),
            simulation_session: 0,
            history: TrafficHistory::new(
                config.history_record_interval_secs,
                config.history_retention_secs,
            ),
        };

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                allocator: AdaptiveAllocator::new(config.allocation),
                events,
                config,
            }),
            control_task: Mutex::new(None),
            simulation_task: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.shared.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
        self.shared.events.subscribe()
    }

    /// Spawn the control loop. Returns false if it is already running.
    pub fn start(&self) -> bool {
        let mut slot = self
            .control_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            return false;
        }

        let (shutdown, receiver) = watch::channel(false);
        let handle = spawn_control_loop(Arc::clone(&self.shared), receiver);
        *slot = Some(TaskHandle { shutdown, handle });
        log::info!(
            "control loop started for {} (every {:?})",
            self.shared.config.intersection_name,
            self.shared.config.tick_period()
        );
        true
    }

    pub fn is_running(&self) -> bool {
        self.control_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Stop the control loop after its current cycle, then any simulation.
    pub async fn stop(&self) {
        let task = self
            .control_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            let _ = task.shutdown.send(true);
            if let Err(e) = task.handle.await {
                log::error!("control loop ended abnormally: {}", e);
            }
            log::info!("control loop stopped");
        }

        let mut slot = self.simulation_task.lock().await;
        self.shutdown_simulation(&mut slot).await;
    }

    /// One iteration of the control loop: allocate and tick in automatic
    /// mode, force the overridden signals in manual mode.
    pub fn run_control_cycle(&self) {
        self.shared.run_control_cycle();
    }

    /// Feed live detection for one approach. Dropped while a simulation runs.
    pub fn update_detection(
        &self,
        direction: Direction,
        count: u32,
        objects: BTreeSet<u64>,
        speed_avg: f64,
    ) {
        let allocation = {
            let mut state = self.shared.lock_state();
            if state.simulation.active {
                return;
            }
            log::debug!("detection update for {}: {} objects", direction, count);
            state.detection[direction] = DetectionSnapshot::new(count, objects, speed_avg);
            state.intersection.write_sensor(direction, i64::from(count));

            if count > 0 && !state.manual_mode {
                Some(self.shared.allocator.apply(&mut state.intersection))
            } else {
                None
            }
        };

        if let Some(allocation) = allocation {
            let mut events = Vec::new();
            push_allocation(&mut events, allocation);
            for event in events {
                self.shared.publish(event);
            }
        }
    }

    /// Enabling is rejected while a simulation runs. Disabling clears every
    /// override so the next cycle is automatic again.
    pub fn set_manual_mode(&self, enabled: bool) -> Result<bool, ControlError> {
        let changed = {
            let mut state = self.shared.lock_state();
            if enabled && state.simulation.active {
                return Err(ControlError::SimulationActive);
            }
            let changed = state.manual_mode != enabled;
            state.manual_mode = enabled;
            if !enabled {
                state.manual_override = PerDirection::default();
            }
            changed
        };

        if changed {
            log::info!("manual mode {}", if enabled { "enabled" } else { "disabled" });
            self.shared
                .publish(ControlEvent::ManualModeChanged { enabled });
        }
        Ok(enabled)
    }

    /// Record an override. It takes effect on the next manual-mode cycle.
    pub fn set_light_state(&self, direction: &str, state: &str) -> Result<LightOverride, ControlError> {
        let direction: Direction = direction.parse()?;
        let light: LightState = state.parse()?;
        self.shared.lock_state().manual_override[direction] = Some(light);
        log::info!("override recorded: {} -> {}", direction, light);
        Ok(LightOverride {
            direction,
            state: light,
        })
    }

    pub async fn start_simulation(
        &self,
        scenario: &str,
        speed: f64,
    ) -> Result<SimulationStatus, ControlError> {
        let manual = self.shared.lock_state().manual_mode;
        if manual {
            return Err(ControlError::ManualModeActive);
        }
        let scenario: Scenario = scenario.parse()?;
        let speed = if speed.is_finite() {
            speed.clamp(MIN_SIMULATION_SPEED, MAX_SIMULATION_SPEED)
        } else {
            1.0
        };

        let mut slot = self.simulation_task.lock().await;
        self.shutdown_simulation(&mut slot).await;

        let (status, session) = {
            let mut state = self.shared.lock_state();
            // Manual mode may have been enabled while the old run was stopping.
            if state.manual_mode {
                return Err(ControlError::ManualModeActive);
            }
            state.simulation_session += 1;
            state.simulation = SimulationStatus {
                active: true,
                scenario,
                speed,
            };
            (state.simulation, state.simulation_session)
        };

        let (shutdown, receiver) = watch::channel(false);
        let handle = spawn_scenario_task(
            Arc::clone(&self.shared),
            session,
            scenario,
            speed,
            receiver,
        );
        *slot = Some(TaskHandle { shutdown, handle });

        log::info!("simulation '{}' started at speed {}", scenario, speed);
        self.shared
            .publish(ControlEvent::SimulationStarted { scenario, speed });
        Ok(status)
    }

    /// Safe to call when nothing runs.
    pub async fn stop_simulation(&self) -> Result<StopOutcome, ControlError> {
        let mut slot = self.simulation_task.lock().await;
        Ok(self.shutdown_simulation(&mut slot).await)
    }

    async fn shutdown_simulation(&self, slot: &mut Option<TaskHandle>) -> StopOutcome {
        let was_active = {
            let mut state = self.shared.lock_state();
            let was_active = state.simulation.active;
            state.simulation.active = false;
            was_active
        };
        let task = slot.take();
        if !was_active && task.is_none() {
            return StopOutcome::NotRunning;
        }

        if let Some(mut task) = task {
            let _ = task.shutdown.send(true);
            let timeout = self.shared.config.simulation_stop_timeout();
            match time::timeout(timeout, &mut task.handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::error!("scenario task ended abnormally: {}", e),
                Err(_) => {
                    log::warn!("scenario task still running after {:?}, aborting it", timeout);
                    task.handle.abort();
                }
            }
        }

        {
            let mut state = self.shared.lock_state();
            state.detection = PerDirection::default();
            state.intersection.reset_sensors();
        }
        log::info!("simulation stopped");
        self.shared.publish(ControlEvent::SimulationStopped);
        StopOutcome::Stopped
    }

    /// Consistent copy of the whole controller, taken under one lock.
    pub fn get_traffic_state(&self) -> TrafficState {
        let state = self.shared.lock_state();
        TrafficState {
            timestamp: current_timestamp(),
            mode: state.intersection.mode(),
            signals: PerDirection::from_fn(|direction| {
                let signal = state.intersection.signal_for(direction);
                SignalView {
                    state: signal.state(),
                    remaining_time: signal.remaining_time(),
                    green_duration: signal.green_duration(),
                }
            }),
            detection: state.detection.clone(),
            manual_mode: state.manual_mode,
            manual_override: state.manual_override.clone(),
            simulation: state.simulation,
        }
    }

    pub fn historical_data(&self, window: HistoryWindow) -> PerDirection<Vec<DataPoint>> {
        self.shared
            .lock_state()
            .history
            .query(window, current_timestamp())
    }

    pub fn average_count_for(&self, direction: Direction) -> f64 {
        self.shared.lock_state().history.average_count_for(direction)
    }
}

impl Default for TrafficManager {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

impl Drop for TrafficManager {
    fn drop(&mut self) {
        let control = self
            .control_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let simulation = self.simulation_task.get_mut().take();
        for task in control.into_iter().chain(simulation) {
            let _ = task.shutdown.send(true);
            task.handle.abort();
        }
    }
}

fn spawn_control_loop(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(shared.config.tick_period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let cycle = panic::catch_unwind(AssertUnwindSafe(|| shared.run_control_cycle()));
                    if cycle.is_err() {
                        log::error!("control cycle panicked, continuing on the next tick");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_system::signal::SignalName;

    fn manager() -> TrafficManager {
        TrafficManager::default()
    }

    #[test]
    fn test_update_detection_mirrors_sensor_and_allocates() {
        let m = manager();
        m.update_detection(Direction::North, 20, (1..=20).collect(), 35.0);

        let state = m.get_traffic_state();
        assert_eq!(state.detection[Direction::North].count, 20);
        assert_eq!(state.detection[Direction::North].objects.len(), 20);
        assert_eq!(state.signals[Direction::North].green_duration, 30);
        assert_eq!(state.signals[Direction::East].green_duration, 10);
    }

    #[test]
    fn test_zero_count_does_not_trigger_allocation() {
        let m = manager();
        m.update_detection(Direction::South, 0, BTreeSet::new(), 0.0);
        // Initial green duration, not the zero-demand allocation.
        assert_eq!(m.get_traffic_state().signals[Direction::South].green_duration, 10);
    }

    #[test]
    fn test_manual_cycle_applies_override_without_decay() {
        let m = manager();
        m.set_manual_mode(true).unwrap();
        m.set_light_state("east", "green").unwrap();

        m.run_control_cycle();
        let first = m.get_traffic_state().signals[Direction::East];
        for _ in 0..30 {
            m.run_control_cycle();
        }
        let later = m.get_traffic_state().signals[Direction::East];
        assert_eq!(first.state, LightState::Green);
        assert_eq!(later, first);
    }

    #[test]
    fn test_override_is_recorded_but_not_applied_immediately() {
        let m = manager();
        m.set_manual_mode(true).unwrap();
        let recorded = m.set_light_state("ouest", "vert").unwrap();
        assert_eq!(recorded.direction, Direction::West);

        let state = m.get_traffic_state();
        assert_eq!(state.manual_override[Direction::West], Some(LightState::Green));
        assert_eq!(state.signals[Direction::West].state, LightState::Red);
    }

    #[test]
    fn test_events_are_published_for_automatic_cycles() {
        let m = manager();
        let mut events = m.subscribe();
        m.update_detection(Direction::North, 5, BTreeSet::new(), 30.0);
        m.run_control_cycle();

        let first = events.try_recv().unwrap();
        assert!(matches!(first, ControlEvent::GreenTimesAdjusted { .. }));
    }

    #[test]
    fn test_liveness_event_names_the_forced_signal() {
        let m = manager();
        {
            let mut state = m.shared.lock_state();
            for direction in Direction::ALL {
                state.intersection.signal_for_mut(direction).force(LightState::Red);
            }
        }
        let mut events = m.subscribe();
        m.run_control_cycle();

        let mut restored = None;
        while let Ok(event) = events.try_recv() {
            if let ControlEvent::LivenessRestored { signal } = event {
                restored = Some(signal);
            }
        }
        assert_eq!(restored, Some(SignalName::East));
        assert!(m.get_traffic_state().signals.values().any(|s| s.state == LightState::Green));
    }

    #[test]
    fn test_history_is_recorded_by_the_control_cycle() {
        let m = manager();
        m.update_detection(Direction::North, 4, BTreeSet::new(), 40.0);
        m.run_control_cycle();
        let history = m.historical_data(HistoryWindow::LastHour);
        assert_eq!(history[Direction::North].len(), 1);
        assert_eq!(history[Direction::North][0].count, 4);
        assert_eq!(m.average_count_for(Direction::North), 4.0);
    }
}
