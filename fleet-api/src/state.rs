use std::sync::{Arc, Mutex, MutexGuard};

use fleet_catalog::FleetRegistry;
use fleet_order::{AssignmentError, AssignmentManager};
use fleet_store::{app_config::Config, MemoryJournal, PrefixedSequence};

use crate::error::AppError;

/// Shared handler state. Requests are serialized through one lock around the
/// engine; handlers never hold it across an `.await`.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Mutex<AssignmentManager>>,
}

impl AppState {
    pub fn new(manager: AssignmentManager) -> Self {
        Self {
            engine: Arc::new(Mutex::new(manager)),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, AssignmentError> {
        let rules = &config.assignment;
        let fleet = if rules.track_vehicle_availability {
            FleetRegistry::new()
        } else {
            FleetRegistry::without_availability_tracking()
        };

        let mut manager = AssignmentManager::new(
            Box::new(fleet),
            Box::new(PrefixedSequence::new(rules.reference_prefix.clone(), rules.reference_padding)),
            Box::new(MemoryJournal::new()),
        );
        for seed in &config.fleet.vehicles {
            manager.register_vehicle(seed.to_vehicle())?;
        }
        tracing::info!("Fleet seeded with {} vehicle(s)", config.fleet.vehicles.len());

        Ok(Self::new(manager))
    }

    pub fn engine(&self) -> Result<MutexGuard<'_, AssignmentManager>, AppError> {
        self.engine
            .lock()
            .map_err(|_| AppError::InternalServerError("assignment engine lock poisoned".to_string()))
    }
}
