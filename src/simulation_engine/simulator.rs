use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::data_structures::PerDirection;
use crate::shared_data::DetectionSnapshot;
use crate::simulation_engine::scenarios::{Scenario, ScenarioProfile};

/// Produces one synthetic detection frame per call, advancing an iteration counter.
#[derive(Debug, Clone)]
pub struct ScenarioSimulator {
    scenario: Scenario,
    profile: ScenarioProfile,
    iteration: u64,
    rng: StdRng,
}

impl ScenarioSimulator {
    pub fn new(scenario: Scenario) -> Self {
        Self::with_rng(scenario, StdRng::from_os_rng())
    }

    /// Reproducible noise, for tests and benchmarks.
    pub fn with_seed(scenario: Scenario, seed: u64) -> Self {
        Self::with_rng(scenario, StdRng::seed_from_u64(seed))
    }

    fn with_rng(scenario: Scenario, rng: StdRng) -> Self {
        Self {
            scenario,
            profile: scenario.profile(),
            iteration: 0,
            rng,
        }
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn next_frame(&mut self) -> PerDirection<DetectionSnapshot> {
        let iteration = self.iteration;
        self.iteration += 1;

        let profile = &self.profile;
        let rng = &mut self.rng;
        PerDirection::from_fn(|direction| {
            let count = profile.count(direction, iteration, &mut *rng);
            let speed = profile.directions[direction].speed.sample(count, &mut *rng);
            DetectionSnapshot::synthetic(count, speed)
        })
    }
}
