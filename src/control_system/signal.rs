use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data_structures::{Direction, LightState};
use crate::global_variables::{AMBER_SECS, INITIAL_GREEN_SECS, RED_SECS};

/// Identifies a signal head. Four-way intersections have one signal per
/// direction; two-group intersections have one per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalName {
    North,
    South,
    East,
    West,
    NorthSouth,
    EastWest,
}

impl SignalName {
    /// Directions whose traffic is released when this signal is green.
    pub fn serves(self) -> &'static [Direction] {
        match self {
            SignalName::North => &[Direction::North],
            SignalName::South => &[Direction::South],
            SignalName::East => &[Direction::East],
            SignalName::West => &[Direction::West],
            SignalName::NorthSouth => &[Direction::North, Direction::South],
            SignalName::EastWest => &[Direction::East, Direction::West],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalName::North => "north",
            SignalName::South => "south",
            SignalName::East => "east",
            SignalName::West => "west",
            SignalName::NorthSouth => "north_south",
            SignalName::EastWest => "east_west",
        }
    }
}

impl From<Direction> for SignalName {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::North => SignalName::North,
            Direction::South => SignalName::South,
            Direction::East => SignalName::East,
            Direction::West => SignalName::West,
        }
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed phase lengths shared by every signal, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalTiming {
    pub initial_green: u32,
    pub amber: u32,
    pub red: u32,
}

impl Default for SignalTiming {
    fn default() -> Self {
        Self {
            initial_green: INITIAL_GREEN_SECS,
            amber: AMBER_SECS,
            red: RED_SECS,
        }
    }
}

/// One traffic light: a Red -> Green -> Amber cycle driven by a countdown.
///
/// `remaining_time` is always the countdown for the current state. It can dip
/// to zero or below for the instant before a transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    name: SignalName,
    state: LightState,
    remaining_time: i32,
    green_duration: u32,
    amber_duration: u32,
    red_duration: u32,
}

impl Signal {
    /// A new signal starts red with a full red countdown.
    pub fn new(name: SignalName, timing: SignalTiming) -> Self {
        Self {
            name,
            state: LightState::Red,
            remaining_time: secs(timing.red),
            green_duration: timing.initial_green,
            amber_duration: timing.amber,
            red_duration: timing.red,
        }
    }

    pub fn name(&self) -> SignalName {
        self.name
    }

    pub fn state(&self) -> LightState {
        self.state
    }

    pub fn remaining_time(&self) -> i32 {
        self.remaining_time
    }

    pub fn green_duration(&self) -> u32 {
        self.green_duration
    }

    pub fn amber_duration(&self) -> u32 {
        self.amber_duration
    }

    pub fn red_duration(&self) -> u32 {
        self.red_duration
    }

    pub fn is_green(&self) -> bool {
        self.state == LightState::Green
    }

    /// Configured length of `state`.
    pub fn duration_of(&self, state: LightState) -> u32 {
        match state {
            LightState::Green => self.green_duration,
            LightState::Amber => self.amber_duration,
            LightState::Red => self.red_duration,
        }
    }

    /// Advance one second. Calling this twice for one logical second
    /// advances the signal twice.
    pub fn tick(&mut self) {
        self.remaining_time -= 1;
        if self.remaining_time <= 0 {
            self.advance();
        }
    }

    /// Move to the next state in the cycle and reload its countdown.
    pub fn advance(&mut self) {
        self.force(self.state.next());
    }

    /// Jump straight to `state` with a fresh countdown, bypassing the cycle.
    pub fn force(&mut self, state: LightState) {
        self.state = state;
        self.remaining_time = secs(self.duration_of(state));
    }

    /// Takes effect the next time the signal turns green; a running green
    /// phase keeps its countdown.
    pub fn set_green_duration(&mut self, seconds: u32) {
        self.green_duration = seconds;
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {} ({}s)", self.name, self.state, self.remaining_time)
    }
}

fn secs(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal() -> Signal {
        Signal::new(SignalName::North, SignalTiming::default())
    }

    #[test]
    fn test_new_signal_starts_red() {
        let s = signal();
        assert_eq!(s.state(), LightState::Red);
        assert_eq!(s.remaining_time(), RED_SECS as i32);
        assert_eq!(s.green_duration(), INITIAL_GREEN_SECS);
    }

    #[test]
    fn test_tick_counts_down_then_transitions() {
        let mut s = signal();
        for _ in 0..RED_SECS - 1 {
            s.tick();
            assert_eq!(s.state(), LightState::Red);
        }
        s.tick();
        assert_eq!(s.state(), LightState::Green);
        assert_eq!(s.remaining_time(), INITIAL_GREEN_SECS as i32);
    }

    #[test]
    fn test_full_cycle_returns_to_red() {
        let mut s = signal();
        let cycle = RED_SECS + INITIAL_GREEN_SECS + AMBER_SECS;
        let mut seen = vec![s.state()];
        for _ in 0..cycle {
            s.tick();
            if seen.last() != Some(&s.state()) {
                seen.push(s.state());
            }
        }
        assert_eq!(
            seen,
            vec![
                LightState::Red,
                LightState::Green,
                LightState::Amber,
                LightState::Red
            ]
        );
    }

    #[test]
    fn test_green_duration_applies_on_next_green() {
        let mut s = signal();
        s.force(LightState::Green);
        s.set_green_duration(25);
        assert_eq!(s.remaining_time(), INITIAL_GREEN_SECS as i32);
        s.force(LightState::Red);
        s.force(LightState::Green);
        assert_eq!(s.remaining_time(), 25);
    }

    #[test]
    fn test_force_reloads_duration_of_target_state() {
        let mut s = signal();
        s.force(LightState::Amber);
        assert_eq!(s.state(), LightState::Amber);
        assert_eq!(s.remaining_time(), AMBER_SECS as i32);
    }

    #[test]
    fn test_signal_names_cover_their_directions() {
        assert_eq!(SignalName::from(Direction::East).serves(), &[Direction::East]);
        assert_eq!(
            SignalName::NorthSouth.serves(),
            &[Direction::North, Direction::South]
        );
    }
}
