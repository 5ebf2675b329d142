use std::fmt;

use serde::{Deserialize, Serialize};

/// Best building suggested by the occupancy service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub best_building: String,
    pub occupancy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyRecord {
    pub building: String,
    #[serde(default)]
    pub percent_occupied: Option<f64>,
}

impl OccupancyRecord {
    /// Missing readings are shown as an empty room.
    pub fn display_percent(&self) -> f64 {
        self.percent_occupied.unwrap_or(0.0)
    }
}

/// Occupancy estimate returned for an uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageOccupancy {
    pub percent_occupied: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccupancyTier {
    Low,
    Medium,
    High,
}

impl OccupancyTier {
    pub fn as_str(self) -> &'static str {
        match self {
            OccupancyTier::Low => "low",
            OccupancyTier::Medium => "medium",
            OccupancyTier::High => "high",
        }
    }
}

impl fmt::Display for OccupancyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
