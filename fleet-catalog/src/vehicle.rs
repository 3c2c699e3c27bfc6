use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::registry::CatalogError;

/// Vehicle availability as tracked by the fleet app
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VehicleAvailability {
    #[default]
    Available,
    Reserved,
    InUse,
}

impl fmt::Display for VehicleAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VehicleAvailability::Available => "available",
            VehicleAvailability::Reserved => "reserved",
            VehicleAvailability::InUse => "in_use",
        };
        f.write_str(label)
    }
}

/// Weight/volume a vehicle can carry. `0.0` means "not configured".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Capacity {
    pub weight_kg: f64,
    pub volume_m3: f64,
}

impl Capacity {
    pub fn new(weight_kg: f64, volume_m3: f64) -> Self {
        Self { weight_kg, volume_m3 }
    }
}

/// Vehicle model category, the place where capacities are configured
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleCategory {
    pub id: Uuid,
    pub name: String,
    pub weight_capacity: f64,
    pub volume_capacity: f64,
}

impl VehicleCategory {
    pub fn new(name: impl Into<String>, weight_capacity: f64, volume_capacity: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            weight_capacity,
            volume_capacity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    pub id: Uuid,
    pub name: String,
    pub license_plate: Option<String>,
    pub category: Option<VehicleCategory>,
    pub availability: VehicleAvailability,
}

impl Vehicle {
    pub fn new(name: impl Into<String>, category: Option<VehicleCategory>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            license_plate: None,
            category,
            availability: VehicleAvailability::Available,
        }
    }

    pub fn with_license_plate(mut self, plate: impl Into<String>) -> Self {
        self.license_plate = Some(plate.into());
        self
    }

    /// Capacity from the category, zero when the vehicle has none
    pub fn capacity(&self) -> Capacity {
        self.category
            .as_ref()
            .map(|c| Capacity::new(c.weight_capacity, c.volume_capacity))
            .unwrap_or_default()
    }

    /// Only vehicles with a positive weight capacity take part in matching
    pub fn has_defined_capacity(&self) -> bool {
        self.capacity().weight_kg > 0.0
    }
}

/// Read access to the fleet, plus optional capabilities the engine probes for.
pub trait VehicleDirectory: Send {
    fn vehicle(&self, id: &Uuid) -> Option<&Vehicle>;

    /// All vehicles, in registration order
    fn vehicles(&self) -> Vec<&Vehicle>;

    fn upsert(&mut self, vehicle: Vehicle) -> Result<(), CatalogError>;

    /// Availability tracking is optional; directories without it return `None`
    /// and the engine skips availability updates.
    fn availability_tracker(&mut self) -> Option<&mut dyn AvailabilityTracker> {
        None
    }
}

pub trait AvailabilityTracker {
    fn set_availability(
        &mut self,
        vehicle_id: &Uuid,
        availability: VehicleAvailability,
    ) -> Result<(), CatalogError>;
}
