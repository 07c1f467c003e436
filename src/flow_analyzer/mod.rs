pub mod history;

pub use history::{DataPoint, HistoryWindow, TrafficHistory};
