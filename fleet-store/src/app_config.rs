use fleet_catalog::{Vehicle, VehicleCategory};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub assignment: AssignmentRules,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub fleet: FleetSeed,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssignmentRules {
    #[serde(default = "default_prefix")]
    pub reference_prefix: String,
    #[serde(default = "default_padding")]
    pub reference_padding: usize,
    #[serde(default = "default_true")]
    pub track_vehicle_availability: bool,
}

impl Default for AssignmentRules {
    fn default() -> Self {
        Self {
            reference_prefix: default_prefix(),
            reference_padding: default_padding(),
            track_vehicle_availability: true,
        }
    }
}

fn default_prefix() -> String { "VA/".to_string() }
fn default_padding() -> usize { 5 }
fn default_true() -> bool { true }

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: default_filter() }
    }
}

fn default_filter() -> String {
    "fleet_api=debug,fleet_order=info,tower_http=debug".to_string()
}

/// Vehicles registered at startup
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FleetSeed {
    #[serde(default)]
    pub vehicles: Vec<VehicleSeed>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VehicleSeed {
    pub name: String,
    pub license_plate: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub weight_capacity_kg: f64,
    #[serde(default)]
    pub volume_capacity_m3: f64,
}

impl VehicleSeed {
    /// Vehicles without any capacity get no category, so matching skips them
    pub fn to_vehicle(&self) -> Vehicle {
        let category = (self.weight_capacity_kg > 0.0 || self.volume_capacity_m3 > 0.0).then(|| {
            VehicleCategory::new(
                self.category.clone().unwrap_or_else(|| self.name.clone()),
                self.weight_capacity_kg,
                self.volume_capacity_m3,
            )
        });
        let vehicle = Vehicle::new(self.name.clone(), category);
        match &self.license_plate {
            Some(plate) => vehicle.with_license_plate(plate.clone()),
            None => vehicle,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `FLEET__SERVER__PORT=9000`
            .add_source(config::Environment::with_prefix("FLEET").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
