use std::collections::BTreeSet;

use adaptive_signals::communication::messages::ControlEvent;
use adaptive_signals::data_structures::{Direction, LightState};
use adaptive_signals::simulation_engine::scenarios::Scenario;
use adaptive_signals::{ControlError, StopOutcome, TrafficManager};
use tokio::time::{sleep, Duration};

async fn settle() {
    sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn test_manual_mode_blocks_simulation() {
    let manager = TrafficManager::default();
    manager.set_manual_mode(true).unwrap();

    let result = manager.start_simulation("normal", 1.0).await;
    assert_eq!(result, Err(ControlError::ManualModeActive));
    assert!(!manager.get_traffic_state().simulation.active);
}

#[tokio::test(start_paused = true)]
async fn test_simulation_blocks_manual_mode() {
    let manager = TrafficManager::default();
    manager.start_simulation("night", 1.0).await.unwrap();

    assert_eq!(manager.set_manual_mode(true), Err(ControlError::SimulationActive));
    assert!(!manager.get_traffic_state().manual_mode);

    manager.stop_simulation().await.unwrap();
    assert_eq!(manager.set_manual_mode(true), Ok(true));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_scenario_is_rejected() {
    let manager = TrafficManager::default();
    let result = manager.start_simulation("gridlock", 1.0).await;
    assert_eq!(result, Err(ControlError::UnknownScenario("gridlock".to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_override_names_are_rejected() {
    let manager = TrafficManager::default();
    assert_eq!(
        manager.set_light_state("up", "green"),
        Err(ControlError::InvalidDirection("up".to_string()))
    );
    assert_eq!(
        manager.set_light_state("north", "blue"),
        Err(ControlError::InvalidLightState("blue".to_string()))
    );
    assert!(manager
        .get_traffic_state()
        .manual_override
        .values()
        .all(Option::is_none));
}

#[tokio::test(start_paused = true)]
async fn test_simulation_speed_is_clamped() {
    let manager = TrafficManager::default();

    let fast = manager.start_simulation("rush_hour", 50.0).await.unwrap();
    assert_eq!(fast.speed, 5.0);
    assert_eq!(fast.scenario, Scenario::RushHour);

    let slow = manager.start_simulation("rush_hour", 0.0).await.unwrap();
    assert_eq!(slow.speed, 0.1);

    let fallback = manager.start_simulation("rush_hour", f64::NAN).await.unwrap();
    assert_eq!(fallback.speed, 1.0);

    manager.stop_simulation().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_manual_override_persists_across_cycles() {
    let manager = TrafficManager::default();
    manager.set_manual_mode(true).unwrap();
    manager.set_light_state("north", "vert").unwrap();
    manager.set_light_state("east", "green").unwrap();

    manager.run_control_cycle();
    let applied = manager.get_traffic_state();
    assert_eq!(applied.signals[Direction::North].state, LightState::Green);
    assert_eq!(applied.signals[Direction::East].state, LightState::Green);

    manager.start();
    sleep(Duration::from_secs(45)).await;
    let later = manager.get_traffic_state();
    assert_eq!(later.signals[Direction::North], applied.signals[Direction::North]);
    assert_eq!(later.signals[Direction::East], applied.signals[Direction::East]);

    manager.set_light_state("north", "rouge").unwrap();
    sleep(Duration::from_secs(2)).await;
    assert_eq!(
        manager.get_traffic_state().signals[Direction::North].state,
        LightState::Red
    );

    manager.set_manual_mode(false).unwrap();
    let state = manager.get_traffic_state();
    assert!(!state.manual_mode);
    assert!(state.manual_override.values().all(Option::is_none));

    manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_live_detection_is_ignored_while_simulating() {
    let manager = TrafficManager::default();
    manager.start_simulation("night", 1.0).await.unwrap();
    settle().await;

    manager.update_detection(Direction::North, 999, (1..=999).collect(), 20.0);
    let state = manager.get_traffic_state();
    assert_ne!(state.detection[Direction::North].count, 999);
    assert!(state.detection[Direction::North].count <= 3);

    manager.stop_simulation().await.unwrap();
    manager.update_detection(Direction::North, 999, (1..=999).collect(), 20.0);
    assert_eq!(manager.get_traffic_state().detection[Direction::North].count, 999);
}

#[tokio::test(start_paused = true)]
async fn test_simulation_feeds_sensors_and_stop_resets_them() {
    let manager = TrafficManager::default();
    manager
        .start_simulation("north_congestion", 2.0)
        .await
        .unwrap();
    sleep(Duration::from_secs(3)).await;

    let state = manager.get_traffic_state();
    assert!(state.simulation.active);
    assert!(state.detection[Direction::North].count >= 10);
    assert_eq!(
        state.detection[Direction::North].objects.len(),
        state.detection[Direction::North].count as usize
    );

    manager.run_control_cycle();
    let signals = manager.get_traffic_state().signals;
    assert!(signals[Direction::North].green_duration > signals[Direction::East].green_duration);

    assert_eq!(manager.stop_simulation().await, Ok(StopOutcome::Stopped));
    let state = manager.get_traffic_state();
    assert!(!state.simulation.active);
    for snapshot in state.detection.values() {
        assert_eq!(snapshot.count, 0);
        assert_eq!(snapshot.speed_avg, 0.0);
        assert!(snapshot.objects.is_empty());
    }

    // Sensors were cleared too: zero demand splits evenly.
    manager.run_control_cycle();
    let signals = manager.get_traffic_state().signals;
    assert!(signals.values().all(|s| s.green_duration == 17));
}

#[tokio::test(start_paused = true)]
async fn test_stop_simulation_when_idle_is_a_no_op() {
    let manager = TrafficManager::default();
    manager.update_detection(Direction::East, 6, BTreeSet::new(), 30.0);

    assert_eq!(manager.stop_simulation().await, Ok(StopOutcome::NotRunning));
    // Live detection is untouched.
    assert_eq!(manager.get_traffic_state().detection[Direction::East].count, 6);
}

#[tokio::test(start_paused = true)]
async fn test_restarting_a_simulation_replaces_the_old_run() {
    let manager = TrafficManager::default();
    let mut events = manager.subscribe();

    manager.start_simulation("normal", 1.0).await.unwrap();
    manager.start_simulation("east_west_heavy", 1.0).await.unwrap();
    settle().await;

    let state = manager.get_traffic_state();
    assert_eq!(state.simulation.scenario, Scenario::EastWestHeavy);
    assert!(state.detection[Direction::East].count > state.detection[Direction::North].count);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            ControlEvent::SimulationStarted { scenario, .. } => seen.push(scenario.to_string()),
            ControlEvent::SimulationStopped => seen.push("stopped".to_string()),
            _ => {}
        }
    }
    assert_eq!(seen, vec!["normal", "stopped", "east_west_heavy"]);

    manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_control_loop_lifecycle() {
    let manager = TrafficManager::default();
    assert!(!manager.is_running());
    assert!(manager.start());
    assert!(!manager.start());
    assert!(manager.is_running());

    sleep(Duration::from_secs(5)).await;
    let north = manager.get_traffic_state().signals[Direction::North];
    assert!(north.remaining_time < 10);

    manager.stop().await;
    assert!(!manager.is_running());

    let frozen = manager.get_traffic_state().signals;
    sleep(Duration::from_secs(5)).await;
    assert_eq!(manager.get_traffic_state().signals, frozen);
}

#[tokio::test(start_paused = true)]
async fn test_a_signal_is_always_green_under_simulated_load() {
    let manager = TrafficManager::default();
    manager.start();
    manager.start_simulation("rush_hour", 5.0).await.unwrap();

    for _ in 0..120 {
        sleep(Duration::from_secs(1)).await;
        let state = manager.get_traffic_state();
        assert!(state
            .signals
            .values()
            .any(|signal| signal.state == LightState::Green));
        for signal in state.signals.values() {
            assert!((5..=30).contains(&signal.green_duration));
        }
    }

    manager.stop().await;
    assert!(!manager.get_traffic_state().simulation.active);
}
