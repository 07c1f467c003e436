use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data_structures::{Axis, Direction, PerDirection};
use crate::errors::ControlError;
use crate::global_variables::SCENARIO_CYCLE_ITERATIONS;

/// Named synthetic demand profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    #[default]
    Normal,
    RushHour,
    Night,
    NorthCongestion,
    EastWestHeavy,
}

impl Scenario {
    pub const ALL: [Scenario; 5] = [
        Scenario::Normal,
        Scenario::RushHour,
        Scenario::Night,
        Scenario::NorthCongestion,
        Scenario::EastWestHeavy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::Normal => "normal",
            Scenario::RushHour => "rush_hour",
            Scenario::Night => "night",
            Scenario::NorthCongestion => "north_congestion",
            Scenario::EastWestHeavy => "east_west_heavy",
        }
    }

    pub fn profile(self) -> ScenarioProfile {
        match self {
            // Light, evenly spread traffic; each approach a quarter-cycle apart.
            Scenario::Normal => ScenarioProfile {
                directions: PerDirection::from([
                    DirectionProfile::wave(5.0, 3.0, 0.5, 0.5, 0.0, SpeedModel::new(43.0, 0.5, 5)),
                    DirectionProfile::wave(5.0, 3.0, 0.5, 0.5, PI / 2.0, SpeedModel::new(43.0, 0.5, 5)),
                    DirectionProfile::wave(5.0, 3.0, 0.5, 0.5, PI, SpeedModel::new(43.0, 0.5, 5)),
                    DirectionProfile::wave(5.0, 3.0, 0.5, 0.5, 3.0 * PI / 2.0, SpeedModel::new(43.0, 0.5, 5)),
                ]),
                alternation: None,
            },
            // Heavy everywhere, with the dominant axis swapping every half period.
            Scenario::RushHour => ScenarioProfile {
                directions: PerDirection::from([
                    DirectionProfile::wave(15.0, 8.0, 0.7, 0.3, 0.0, SpeedModel::new(50.0, 0.5, 3).with_floor(10.0)),
                    DirectionProfile::wave(15.0, 8.0, 0.7, 0.3, PI / 4.0, SpeedModel::new(50.0, 0.5, 3).with_floor(10.0)),
                    DirectionProfile::wave(15.0, 8.0, 0.7, 0.3, PI / 2.0, SpeedModel::new(50.0, 0.5, 3).with_floor(10.0)),
                    DirectionProfile::wave(15.0, 8.0, 0.7, 0.3, 3.0 * PI / 4.0, SpeedModel::new(50.0, 0.5, 3).with_floor(10.0)),
                ]),
                alternation: Some(AxisAlternation {
                    period: 2 * SCENARIO_CYCLE_ITERATIONS,
                    boost: 1.5,
                }),
            },
            // Mostly empty roads with the odd car.
            Scenario::Night => ScenarioProfile {
                directions: PerDirection::from_fn(|_| DirectionProfile::sporadic(0.3, 3, SpeedModel::new(56.0, 1.0, 10))),
                alternation: None,
            },
            Scenario::NorthCongestion => ScenarioProfile {
                directions: PerDirection::from([
                    DirectionProfile::wave(15.0, 5.0, 0.0, 1.0, 0.0, SpeedModel::new(25.0, 0.6, 5)),
                    DirectionProfile::wave(5.0, 3.0, 0.0, 1.0, PI / 2.0, SpeedModel::new(43.0, 0.6, 10)),
                    DirectionProfile::wave(3.0, 2.0, 0.0, 1.0, PI, SpeedModel::new(43.0, 0.6, 10)),
                    DirectionProfile::wave(4.0, 2.0, 0.0, 1.0, 3.0 * PI / 2.0, SpeedModel::new(43.0, 0.6, 10)),
                ]),
                alternation: None,
            },
            Scenario::EastWestHeavy => ScenarioProfile {
                directions: PerDirection::from([
                    DirectionProfile::wave(2.0, 2.0, 0.0, 1.0, 0.0, SpeedModel::new(46.0, 0.4, 5)),
                    DirectionProfile::wave(3.0, 2.0, 0.0, 1.0, PI / 4.0, SpeedModel::new(46.0, 0.4, 5)),
                    DirectionProfile::wave(12.0, 6.0, 0.0, 1.0, PI / 2.0, SpeedModel::new(35.0, 0.8, 10)),
                    DirectionProfile::wave(10.0, 5.0, 0.0, 1.0, 3.0 * PI / 4.0, SpeedModel::new(35.0, 0.8, 10)),
                ]),
                alternation: None,
            },
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.as_str() == wanted)
            .ok_or_else(|| ControlError::UnknownScenario(s.to_string()))
    }
}

/// Average speed falls linearly as the queue grows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedModel {
    pub free_flow_kmh: f64,
    pub drop_per_vehicle: f64,
    pub floor_kmh: f64,
    /// Uniform noise in whole km/h, applied in `[-jitter, jitter]`.
    pub jitter: i32,
}

impl SpeedModel {
    pub fn new(free_flow_kmh: f64, drop_per_vehicle: f64, jitter: i32) -> Self {
        Self {
            free_flow_kmh,
            drop_per_vehicle,
            floor_kmh: 0.0,
            jitter,
        }
    }

    pub fn with_floor(mut self, floor_kmh: f64) -> Self {
        self.floor_kmh = floor_kmh;
        self
    }

    /// Speed without noise.
    pub fn base_speed(&self, count: u32) -> f64 {
        (self.free_flow_kmh - f64::from(count) * self.drop_per_vehicle).max(self.floor_kmh)
    }

    pub fn sample<R: Rng + ?Sized>(&self, count: u32, rng: &mut R) -> f64 {
        let noise = if self.jitter > 0 {
            f64::from(rng.random_range(-self.jitter..=self.jitter))
        } else {
            0.0
        };
        (self.base_speed(count) + noise).max(0.0)
    }
}

/// How vehicle counts evolve over the cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DemandShape {
    /// `baseline + amplitude * (bias + swing * sin(2π·cycle + phase))`, truncated.
    Wave {
        baseline: f64,
        amplitude: f64,
        bias: f64,
        swing: f64,
        phase: f64,
    },
    /// With `probability`, a uniform count in `0..=max_count`; otherwise empty.
    Sporadic { probability: f64, max_count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionProfile {
    pub demand: DemandShape,
    pub speed: SpeedModel,
}

impl DirectionProfile {
    fn wave(baseline: f64, amplitude: f64, bias: f64, swing: f64, phase: f64, speed: SpeedModel) -> Self {
        Self {
            demand: DemandShape::Wave {
                baseline,
                amplitude,
                bias,
                swing,
                phase,
            },
            speed,
        }
    }

    fn sporadic(probability: f64, max_count: u32, speed: SpeedModel) -> Self {
        Self {
            demand: DemandShape::Sporadic {
                probability,
                max_count,
            },
            speed,
        }
    }
}

/// Boosts one axis for the first half of `period` and the other for the second half.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAlternation {
    pub period: u64,
    pub boost: f64,
}

impl AxisAlternation {
    pub fn multiplier(&self, axis: Axis, iteration: u64) -> f64 {
        let boosted = if self.period == 0 || iteration % self.period < self.period / 2 {
            Axis::NorthSouth
        } else {
            Axis::EastWest
        };
        if axis == boosted {
            self.boost
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioProfile {
    pub directions: PerDirection<DirectionProfile>,
    pub alternation: Option<AxisAlternation>,
}

impl ScenarioProfile {
    /// Vehicle count for `direction` at `iteration`.
    pub fn count<R: Rng + ?Sized>(&self, direction: Direction, iteration: u64, rng: &mut R) -> u32 {
        let multiplier = self
            .alternation
            .map(|alt| alt.multiplier(direction.axis(), iteration))
            .unwrap_or(1.0);

        match self.directions[direction].demand {
            DemandShape::Wave {
                baseline,
                amplitude,
                bias,
                swing,
                phase,
            } => {
                let cycle = (iteration % SCENARIO_CYCLE_ITERATIONS) as f64
                    / SCENARIO_CYCLE_ITERATIONS as f64;
                let wave = bias + swing * (cycle * 2.0 * PI + phase).sin();
                let value = multiplier * (baseline + amplitude * wave);
                value.max(0.0) as u32
            }
            DemandShape::Sporadic {
                probability,
                max_count,
            } => {
                if rng.random_bool(probability.clamp(0.0, 1.0)) {
                    rng.random_range(0..=max_count)
                } else {
                    0
                }
            }
        }
    }
}
