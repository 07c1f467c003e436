use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::ControlError;

/// One of the four approaches to the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Storage order used by `PerDirection`.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Order in which signals are ticked and in which the liveness fallback cycles.
    pub const TICK_ORDER: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::South => 1,
            Direction::East => 2,
            Direction::West => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Direction::North | Direction::South => Axis::NorthSouth,
            Direction::East | Direction::West => Axis::EastWest,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ControlError;

    /// Accepts English names and the legacy French labels used by older dashboards.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "north" | "nord" => Ok(Direction::North),
            "south" | "sud" => Ok(Direction::South),
            "east" | "est" => Ok(Direction::East),
            "west" | "ouest" => Ok(Direction::West),
            _ => Err(ControlError::InvalidDirection(s.to_string())),
        }
    }
}

/// The two conflicting movement axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    NorthSouth,
    EastWest,
}

/// The possible states for a traffic light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightState {
    Red,
    Green,
    Amber,
}

impl LightState {
    /// Next state in the Red -> Green -> Amber -> Red cycle.
    pub fn next(self) -> Self {
        match self {
            LightState::Red => LightState::Green,
            LightState::Green => LightState::Amber,
            LightState::Amber => LightState::Red,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LightState::Red => "red",
            LightState::Green => "green",
            LightState::Amber => "amber",
        }
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LightState {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" | "rouge" => Ok(LightState::Red),
            "green" | "vert" => Ok(LightState::Green),
            "amber" | "yellow" | "orange" => Ok(LightState::Amber),
            _ => Err(ControlError::InvalidLightState(s.to_string())),
        }
    }
}

/// A value for each of the four directions, indexed by `Direction`.
/// Serializes as a map keyed by direction name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PerDirection<T>([T; 4]);

impl<T> PerDirection<T> {
    pub fn from_fn(mut f: impl FnMut(Direction) -> T) -> Self {
        Self(std::array::from_fn(|i| f(Direction::ALL[i])))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Direction, &T)> {
        Direction::ALL.into_iter().zip(self.0.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Direction, &mut T)> {
        Direction::ALL.into_iter().zip(self.0.iter_mut())
    }

    pub fn into_entries(self) -> impl Iterator<Item = (Direction, T)> {
        Direction::ALL.into_iter().zip(self.0)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }

    pub fn map<U>(&self, mut f: impl FnMut(Direction, &T) -> U) -> PerDirection<U> {
        PerDirection::from_fn(|d| f(d, &self[d]))
    }
}

impl<T> From<[T; 4]> for PerDirection<T> {
    /// Values in north, south, east, west order.
    fn from(values: [T; 4]) -> Self {
        Self(values)
    }
}

impl<T> Index<Direction> for PerDirection<T> {
    type Output = T;

    fn index(&self, direction: Direction) -> &T {
        &self.0[direction.index()]
    }
}

impl<T> IndexMut<Direction> for PerDirection<T> {
    fn index_mut(&mut self, direction: Direction) -> &mut T {
        &mut self.0[direction.index()]
    }
}

impl<T: Serialize> Serialize for PerDirection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        for (direction, value) in self.iter() {
            map.serialize_entry(direction.as_str(), value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parses_english_and_french_names() {
        assert_eq!("north".parse::<Direction>().unwrap(), Direction::North);
        assert_eq!("Sud".parse::<Direction>().unwrap(), Direction::South);
        assert_eq!(" est ".parse::<Direction>().unwrap(), Direction::East);
        assert_eq!("ouest".parse::<Direction>().unwrap(), Direction::West);
        assert_eq!(
            "up".parse::<Direction>(),
            Err(ControlError::InvalidDirection("up".to_string()))
        );
    }

    #[test]
    fn test_light_state_parses_aliases() {
        assert_eq!("vert".parse::<LightState>().unwrap(), LightState::Green);
        assert_eq!("orange".parse::<LightState>().unwrap(), LightState::Amber);
        assert_eq!("YELLOW".parse::<LightState>().unwrap(), LightState::Amber);
        assert_eq!("rouge".parse::<LightState>().unwrap(), LightState::Red);
        assert!("blue".parse::<LightState>().is_err());
    }

    #[test]
    fn test_light_state_cycle() {
        assert_eq!(LightState::Red.next(), LightState::Green);
        assert_eq!(LightState::Green.next(), LightState::Amber);
        assert_eq!(LightState::Amber.next(), LightState::Red);
    }

    #[test]
    fn test_per_direction_indexing_matches_direction() {
        let mut values = PerDirection::from_fn(|d| d.index() * 10);
        values[Direction::East] = 99;
        assert_eq!(values[Direction::North], 0);
        assert_eq!(values[Direction::West], 30);
        assert_eq!(values[Direction::East], 99);
        let collected: Vec<Direction> = values.iter().map(|(d, _)| d).collect();
        assert_eq!(collected, Direction::ALL.to_vec());
    }

    #[test]
    fn test_per_direction_serializes_as_named_map() {
        let values = PerDirection::from_fn(|d| d.index());
        let json = serde_json::to_value(&values).unwrap();
        assert_eq!(json["north"], 0);
        assert_eq!(json["south"], 1);
        assert_eq!(json["east"], 2);
        assert_eq!(json["west"], 3);
    }
}
