use crate::models::occupancy::OccupancyTier;

const LOW_MAX: f64 = 30.0;
const MEDIUM_MAX: f64 = 70.0;

/// Maps an occupancy percentage to its display tier.
///
/// Absent readings count as 0. Values outside 0–100 are not clamped and fall
/// through the same thresholds.
pub fn classify_occupancy(percent: Option<f64>) -> OccupancyTier {
    let value = percent.unwrap_or(0.0);
    if value <= LOW_MAX {
        OccupancyTier::Low
    } else if value <= MEDIUM_MAX {
        OccupancyTier::Medium
    } else {
        OccupancyTier::High
    }
}
