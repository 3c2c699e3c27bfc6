use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::vehicle::{AvailabilityTracker, Vehicle, VehicleAvailability, VehicleDirectory};

/// In-memory fleet directory with an availability board
pub struct FleetRegistry {
    vehicles: HashMap<Uuid, Vehicle>,
    order: Vec<Uuid>,
    track_availability: bool,
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self {
            vehicles: HashMap::new(),
            order: Vec::new(),
            track_availability: true,
        }
    }

    /// Registry that never reports availability changes back
    pub fn without_availability_tracking() -> Self {
        Self {
            track_availability: false,
            ..Self::new()
        }
    }

    pub fn register(&mut self, vehicle: Vehicle) -> Uuid {
        let id = vehicle.id;
        if self.vehicles.insert(id, vehicle).is_none() {
            self.order.push(id);
        }
        id
    }

    pub fn get(&self, vehicle_id: &Uuid) -> Option<&Vehicle> {
        self.vehicles.get(vehicle_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Count of vehicles currently in the given state
    pub fn count_in(&self, availability: VehicleAvailability) -> usize {
        self.vehicles
            .values()
            .filter(|v| v.availability == availability)
            .count()
    }
}

impl Default for FleetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VehicleDirectory for FleetRegistry {
    fn vehicle(&self, id: &Uuid) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    fn vehicles(&self) -> Vec<&Vehicle> {
        self.order
            .iter()
            .filter_map(|id| self.vehicles.get(id))
            .collect()
    }

    fn upsert(&mut self, mut vehicle: Vehicle) -> Result<(), CatalogError> {
        if vehicle.name.trim().is_empty() {
            return Err(CatalogError::InvalidVehicle("vehicle name is required".to_string()));
        }
        if let Some(category) = &vehicle.category {
            let valid = |c: f64| c.is_finite() && c >= 0.0;
            if !valid(category.weight_capacity) || !valid(category.volume_capacity) {
                return Err(CatalogError::InvalidVehicle(format!(
                    "invalid capacity on category {}",
                    category.name
                )));
            }
        }
        // availability belongs to the board, not to the caller's copy
        if let Some(existing) = self.vehicles.get(&vehicle.id) {
            vehicle.availability = existing.availability;
        }
        self.register(vehicle);
        Ok(())
    }

    fn availability_tracker(&mut self) -> Option<&mut dyn AvailabilityTracker> {
        if self.track_availability {
            Some(self as &mut dyn AvailabilityTracker)
        } else {
            None
        }
    }
}

impl AvailabilityTracker for FleetRegistry {
    fn set_availability(
        &mut self,
        vehicle_id: &Uuid,
        availability: VehicleAvailability,
    ) -> Result<(), CatalogError> {
        let vehicle = self.vehicles.get_mut(vehicle_id)
            .ok_or_else(|| CatalogError::NotFound(vehicle_id.to_string()))?;

        debug!("Vehicle {} availability {} -> {}", vehicle.name, vehicle.availability, availability);
        vehicle.availability = availability;

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Vehicle not found: {0}")]
    NotFound(String),

    #[error("Invalid vehicle: {0}")]
    InvalidVehicle(String),
}
