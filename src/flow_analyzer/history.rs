use std::collections::VecDeque;

use serde::Serialize;

use crate::data_structures::{Direction, LightState, PerDirection};

/// One recorded observation for an approach.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub timestamp: u64,
    pub count: u32,
    pub speed: f64,
    pub light_state: LightState,
}

/// How far back a history query looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryWindow {
    #[default]
    LastHour,
    Last3Hours,
    Last24Hours,
    All,
}

impl HistoryWindow {
    /// Parses `1h`, `3h`, `24h` or `all`; anything else means the last hour.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "3h" => HistoryWindow::Last3Hours,
            "24h" => HistoryWindow::Last24Hours,
            "all" => HistoryWindow::All,
            _ => HistoryWindow::LastHour,
        }
    }

    /// Oldest timestamp included when querying at `now`.
    pub fn cutoff(self, now: u64) -> u64 {
        match self {
            HistoryWindow::LastHour => now.saturating_sub(3_600),
            HistoryWindow::Last3Hours => now.saturating_sub(3 * 3_600),
            HistoryWindow::Last24Hours => now.saturating_sub(24 * 3_600),
            HistoryWindow::All => 0,
        }
    }
}

/// Rolling per-approach record of counts, speeds and light states.
#[derive(Debug, Clone)]
pub struct TrafficHistory {
    record_interval_secs: u64,
    retention_secs: u64,
    last_record: Option<u64>,
    points: PerDirection<VecDeque<DataPoint>>,
}

impl TrafficHistory {
    pub fn new(record_interval_secs: u64, retention_secs: u64) -> Self {
        Self {
            record_interval_secs,
            retention_secs,
            last_record: None,
            points: PerDirection::default(),
        }
    }

    pub fn should_record(&self, now: u64) -> bool {
        match self.last_record {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.record_interval_secs,
        }
    }

    /// Append one point per approach and drop points older than the retention window.
    pub fn record(&mut self, now: u64, observations: PerDirection<(u32, f64, LightState)>) {
        for (direction, (count, speed, light_state)) in observations.into_entries() {
            self.points[direction].push_back(DataPoint {
                timestamp: now,
                count,
                speed,
                light_state,
            });
        }
        self.last_record = Some(now);
        self.prune(now);
    }

    pub fn prune(&mut self, now: u64) {
        let cutoff = now.saturating_sub(self.retention_secs);
        for (_, deque) in self.points.iter_mut() {
            while deque.front().is_some_and(|p| p.timestamp < cutoff) {
                deque.pop_front();
            }
        }
    }

    pub fn query(&self, window: HistoryWindow, now: u64) -> PerDirection<Vec<DataPoint>> {
        let cutoff = window.cutoff(now);
        self.points.map(|_, deque| {
            deque
                .iter()
                .filter(|p| p.timestamp >= cutoff)
                .cloned()
                .collect()
        })
    }

    pub fn average_count_for(&self, direction: Direction) -> f64 {
        let deque = &self.points[direction];
        if deque.is_empty() {
            return 0.0;
        }
        let sum: u64 = deque.iter().map(|p| u64::from(p.count)).sum();
        sum as f64 / deque.len() as f64
    }

    pub fn len(&self) -> usize {
        self.points.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
