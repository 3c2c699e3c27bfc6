pub mod product;
pub mod vehicle;
pub mod registry;

pub use product::Product;
pub use vehicle::{AvailabilityTracker, Capacity, Vehicle, VehicleAvailability, VehicleCategory, VehicleDirectory};
pub use registry::{CatalogError, FleetRegistry};
