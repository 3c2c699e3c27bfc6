use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Assignment;

/// Slack absorbed when comparing summed floating point loads
pub const CAPACITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Weight,
    Volume,
}

impl Dimension {
    pub fn unit(&self) -> &'static str {
        match self {
            Dimension::Weight => "kg",
            Dimension::Volume => "m³",
        }
    }
}

/// One dimension of an assignment that no longer fits its vehicle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityViolation {
    pub dimension: Dimension,
    pub total: f64,
    pub capacity: f64,
    pub excess: f64,
    /// `None` when the vehicle has no capacity configured for this dimension
    pub utilization: Option<f64>,
}

impl fmt::Display for CapacityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.dimension.unit();
        write!(
            f,
            "{:?} {:.2} {} over capacity {:.2} {} by {:.2} {}",
            self.dimension, self.total, unit, self.capacity, unit, self.excess, unit
        )?;
        if let Some(utilization) = self.utilization {
            write!(f, " ({:.1}%)", utilization)?;
        }
        Ok(())
    }
}

/// Hard capacity rule checked after every membership or vehicle change.
///
/// Expects `assignment.recompute()` to have run. Weight must always fit; a
/// vehicle without weight capacity can carry nothing. Volume is only checked
/// when the vehicle has a volume capacity configured.
pub fn check_capacity(assignment: &Assignment) -> Result<(), Vec<CapacityViolation>> {
    let mut violations = Vec::new();

    if let Some(v) = exceeds(Dimension::Weight, assignment.total_weight, assignment.vehicle_weight_capacity) {
        violations.push(v);
    }

    if assignment.vehicle_volume_capacity > 0.0 {
        if let Some(v) = exceeds(Dimension::Volume, assignment.total_volume, assignment.vehicle_volume_capacity) {
            violations.push(v);
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn exceeds(dimension: Dimension, total: f64, capacity: f64) -> Option<CapacityViolation> {
    if total <= capacity + CAPACITY_TOLERANCE {
        return None;
    }
    Some(CapacityViolation {
        dimension,
        total,
        capacity,
        excess: total - capacity,
        utilization: (capacity > 0.0).then(|| total / capacity * 100.0),
    })
}
