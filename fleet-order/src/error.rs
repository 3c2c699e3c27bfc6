use serde::Serialize;
use uuid::Uuid;

use crate::capacity::CapacityViolation;
use crate::models::AssignmentState;

/// A delivery order that is already carried by another assignment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentConflict {
    pub order_id: Uuid,
    pub order_name: String,
    pub vehicle_name: Option<String>,
    pub assignment_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("No delivery orders selected")]
    EmptySelection,

    #[error("Some delivery orders are already assigned to a vehicle: {}", describe_conflicts(.conflicts))]
    AlreadyAssigned { conflicts: Vec<AssignmentConflict> },

    #[error("No products to deliver in {order}")]
    EmptyOrder { order: String },

    #[error("Total weight is 0, products need a weight defined")]
    ZeroDemand,

    #[error("No vehicles with capacity defined")]
    NoVehicleCapacity,

    #[error(
        "No vehicle can carry the combined deliveries {}: required {required_weight:.2} kg / {required_volume:.2} m³, maximum available capacity {max_weight_capacity:.2} kg",
        .orders.join(", ")
    )]
    NoEligibleVehicle {
        orders: Vec<String>,
        required_weight: f64,
        required_volume: f64,
        max_weight_capacity: f64,
    },

    #[error("Assignment {assignment} exceeds vehicle capacity: {}", describe_violations(.violations))]
    CapacityExceeded {
        assignment: String,
        violations: Vec<CapacityViolation>,
    },

    #[error("No delivery orders are assigned to any vehicle")]
    NothingToUnassign,

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: AssignmentState,
        to: AssignmentState,
    },

    #[error("Assignment {0} is closed and can no longer be modified")]
    NotModifiable(String),

    #[error("Delivery order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Assignment not found: {0}")]
    AssignmentNotFound(Uuid),

    #[error("Vehicle not found: {0}")]
    VehicleNotFound(Uuid),

    #[error("Invalid delivery order: {0}")]
    InvalidOrder(String),

    #[error(transparent)]
    Catalog(#[from] fleet_catalog::CatalogError),

    #[error(transparent)]
    Core(#[from] fleet_core::CoreError),
}

fn describe_conflicts(conflicts: &[AssignmentConflict]) -> String {
    conflicts
        .iter()
        .map(|c| {
            format!(
                "{} → {} (Assignment: {})",
                c.order_name,
                c.vehicle_name.as_deref().unwrap_or("Unknown"),
                c.assignment_name
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_violations(violations: &[CapacityViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
