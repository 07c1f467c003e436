use std::fmt;

use serde::{Deserialize, Serialize};

use crate::control_system::signal::{Signal, SignalName, SignalTiming};
use crate::data_structures::{Axis, Direction, LightState, PerDirection};
use crate::global_variables::MAX_SENSOR_COUNT;

/// Signal topology of the intersection.
///
/// - FourWay: one independent signal per approach, demand-ratio allocation.
/// - TwoGroup: one signal per axis (north-south, east-west), binary allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntersectionMode {
    #[default]
    FourWay,
    TwoGroup,
}

impl IntersectionMode {
    /// Signals in tick order, which is also the liveness fallback sequence.
    pub fn signal_sequence(self) -> Vec<SignalName> {
        match self {
            IntersectionMode::FourWay => Direction::TICK_ORDER
                .into_iter()
                .map(SignalName::from)
                .collect(),
            IntersectionMode::TwoGroup => vec![SignalName::NorthSouth, SignalName::EastWest],
        }
    }
}

/// Demand sensor for one approach: last known vehicle count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sensor {
    pub direction: Direction,
    queue_length: u32,
}

impl Sensor {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            queue_length: 0,
        }
    }

    pub fn queue_length(&self) -> u32 {
        self.queue_length
    }

    /// Store a count, clamped to `[0, MAX_SENSOR_COUNT]`.
    pub fn record(&mut self, count: i64) {
        self.queue_length = count.clamp(0, i64::from(MAX_SENSOR_COUNT)) as u32;
    }
}

/// A signal that changed state during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub signal: SignalName,
    pub from: LightState,
    pub to: LightState,
}

/// What happened during one `Intersection::tick`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub transitions: Vec<PhaseChange>,
    /// Set when no signal was green after ticking and one had to be forced.
    pub liveness_restored: Option<SignalName>,
}

/// Signals and sensors of one intersection.
#[derive(Debug, Clone)]
pub struct Intersection {
    name: String,
    mode: IntersectionMode,
    /// Stored in sequence order.
    signals: Vec<Signal>,
    sensors: PerDirection<Sensor>,
    current_index: usize,
}

impl Intersection {
    /// The first signal of the sequence starts green, every other one red.
    pub fn new(name: impl Into<String>, mode: IntersectionMode, timing: SignalTiming) -> Self {
        let mut signals: Vec<Signal> = mode
            .signal_sequence()
            .into_iter()
            .map(|name| Signal::new(name, timing))
            .collect();
        if let Some(first) = signals.first_mut() {
            first.force(LightState::Green);
        }

        Self {
            name: name.into(),
            mode,
            signals,
            sensors: PerDirection::from_fn(Sensor::new),
            current_index: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> IntersectionMode {
        self.mode
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn signal(&self, name: SignalName) -> Option<&Signal> {
        self.signals.iter().find(|s| s.name() == name)
    }

    /// The signal controlling traffic from `direction`.
    pub fn signal_for(&self, direction: Direction) -> &Signal {
        &self.signals[self.signal_index(direction)]
    }

    pub fn signal_for_mut(&mut self, direction: Direction) -> &mut Signal {
        let index = self.signal_index(direction);
        &mut self.signals[index]
    }

    fn signal_index(&self, direction: Direction) -> usize {
        match self.mode {
            IntersectionMode::FourWay => match direction {
                Direction::North => 0,
                Direction::East => 1,
                Direction::South => 2,
                Direction::West => 3,
            },
            IntersectionMode::TwoGroup => match direction.axis() {
                Axis::NorthSouth => 0,
                Axis::EastWest => 1,
            },
        }
    }

    /// Returns false when the intersection has no signal by that name.
    pub fn set_green_duration(&mut self, name: SignalName, seconds: u32) -> bool {
        match self.signals.iter_mut().find(|s| s.name() == name) {
            Some(signal) => {
                signal.set_green_duration(seconds);
                true
            }
            None => false,
        }
    }

    pub fn has_green(&self) -> bool {
        self.signals.iter().any(Signal::is_green)
    }

    /// Advance every signal by one second, then make sure somebody is green.
    ///
    /// The fallback forces the next signal of the sequence green without
    /// checking it against other greens: all approaches are assumed to be
    /// free-flow compatible.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        for signal in self.signals.iter_mut() {
            let before = signal.state();
            signal.tick();
            if signal.state() != before {
                report.transitions.push(PhaseChange {
                    signal: signal.name(),
                    from: before,
                    to: signal.state(),
                });
            }
        }

        if !self.has_green() && !self.signals.is_empty() {
            self.current_index = (self.current_index + 1) % self.signals.len();
            let signal = &mut self.signals[self.current_index];
            let before = signal.state();
            signal.force(LightState::Green);
            log::warn!(
                "[{}] no green signal after tick, forcing {} green for {}s",
                self.name,
                signal.name(),
                signal.green_duration()
            );
            report.transitions.push(PhaseChange {
                signal: signal.name(),
                from: before,
                to: LightState::Green,
            });
            report.liveness_restored = Some(signal.name());
        }

        report
    }

    pub fn read_sensors(&self) -> PerDirection<u32> {
        self.sensors.map(|_, sensor| sensor.queue_length())
    }

    pub fn write_sensor(&mut self, direction: Direction, count: i64) {
        self.sensors[direction].record(count);
    }

    pub fn reset_sensors(&mut self) {
        for (_, sensor) in self.sensors.iter_mut() {
            sensor.record(0);
        }
    }
}

impl fmt::Display for Intersection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- {} ---", self.name)?;
        for signal in &self.signals {
            writeln!(f, "{}", signal)?;
        }
        for (direction, sensor) in self.sensors.iter() {
            writeln!(f, "{} : {} vehicles", direction, sensor.queue_length())?;
        }
        Ok(())
    }
}
