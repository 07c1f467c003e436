use serde::{Deserialize, Serialize};

use crate::control_system::intersection::{Intersection, IntersectionMode};
use crate::control_system::signal::SignalName;
use crate::data_structures::{Axis, Direction, PerDirection};
use crate::global_variables::{
    ADJUSTMENT_FACTOR, BASE_GREEN_SECS, MAX_GREEN_SECS, MIN_GREEN_SECS,
    TWO_GROUP_LONG_GREEN_SECS, TWO_GROUP_SHORT_GREEN_SECS,
};

/// Parameters of both allocation policies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    pub base_green: u32,
    pub min_green: u32,
    pub max_green: u32,
    pub adjustment_factor: f64,
    /// Green time of the busier axis in two-group mode.
    pub long_green: u32,
    /// Green time of the quieter axis in two-group mode.
    pub short_green: u32,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            base_green: BASE_GREEN_SECS,
            min_green: MIN_GREEN_SECS,
            max_green: MAX_GREEN_SECS,
            adjustment_factor: ADJUSTMENT_FACTOR,
            long_green: TWO_GROUP_LONG_GREEN_SECS,
            short_green: TWO_GROUP_SHORT_GREEN_SECS,
        }
    }
}

/// Green time assigned to one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GreenTime {
    pub signal: SignalName,
    pub seconds: u32,
}

/// Result of applying an allocation to an intersection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationReport {
    pub green_times: Vec<GreenTime>,
    /// True when at least one signal's green duration was different before.
    pub changed: bool,
}

/// Recomputes green durations from the sensors' current counts.
///
/// Every call is a pure function of the counts it is given: there is no
/// smoothing or hysteresis, so noisy counts give noisy green times.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AdaptiveAllocator {
    config: AllocationConfig,
}

impl AdaptiveAllocator {
    pub fn new(config: AllocationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// Demand-ratio policy: each direction gets
    /// `base * (1 + share * factor)` seconds, clamped to `[min, max]`.
    pub fn ratio_green_times(&self, counts: &PerDirection<u32>) -> PerDirection<u32> {
        let sum: u64 = counts.values().map(|&c| u64::from(c)).sum();
        let total = sum.max(1) as f64;
        let min = f64::from(self.config.min_green);
        let max = f64::from(self.config.max_green);
        let base = f64::from(self.config.base_green);

        counts.map(|_, &count| {
            let ratio = if sum == 0 {
                0.25
            } else {
                f64::from(count) / total
            };
            let seconds = base * (1.0 + ratio * self.config.adjustment_factor);
            seconds.max(min).min(max) as u32
        })
    }

    /// Two-group policy: the axis with strictly more vehicles gets the long
    /// green; ties go to east-west.
    pub fn two_group_green_times(&self, counts: &PerDirection<u32>) -> (u32, u32) {
        let axis_total = |axis: Axis| -> u64 {
            counts
                .iter()
                .filter(|(d, _)| d.axis() == axis)
                .map(|(_, &c)| u64::from(c))
                .sum()
        };
        if axis_total(Axis::NorthSouth) > axis_total(Axis::EastWest) {
            (self.config.long_green, self.config.short_green)
        } else {
            (self.config.short_green, self.config.long_green)
        }
    }

    /// Green times for every signal of an intersection in `mode`.
    pub fn allocate(&self, mode: IntersectionMode, counts: &PerDirection<u32>) -> Vec<GreenTime> {
        match mode {
            IntersectionMode::FourWay => {
                let times = self.ratio_green_times(counts);
                Direction::TICK_ORDER
                    .into_iter()
                    .map(|d| GreenTime {
                        signal: SignalName::from(d),
                        seconds: times[d],
                    })
                    .collect()
            }
            IntersectionMode::TwoGroup => {
                let (north_south, east_west) = self.two_group_green_times(counts);
                vec![
                    GreenTime {
                        signal: SignalName::NorthSouth,
                        seconds: north_south,
                    },
                    GreenTime {
                        signal: SignalName::EastWest,
                        seconds: east_west,
                    },
                ]
            }
        }
    }

    /// Read the intersection's sensors and rewrite its green durations.
    pub fn apply(&self, intersection: &mut Intersection) -> AllocationReport {
        let counts = intersection.read_sensors();
        let green_times = self.allocate(intersection.mode(), &counts);

        let mut changed = false;
        for green in &green_times {
            let previous = intersection
                .signal(green.signal)
                .map(|s| s.green_duration());
            if previous != Some(green.seconds) {
                changed = true;
            }
            intersection.set_green_duration(green.signal, green.seconds);
        }

        if changed {
            log::debug!(
                "[{}] green times from counts {:?}: {:?}",
                intersection.name(),
                counts.values().collect::<Vec<_>>(),
                green_times
                    .iter()
                    .map(|g| (g.signal.as_str(), g.seconds))
                    .collect::<Vec<_>>()
            );
        }

        AllocationReport {
            green_times,
            changed,
        }
    }
}
