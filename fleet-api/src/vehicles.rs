use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use fleet_catalog::{Vehicle, VehicleCategory};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterVehicleRequest {
    /// Present when updating a known vehicle
    pub id: Option<Uuid>,
    pub name: String,
    pub license_plate: Option<String>,
    pub category: Option<CategoryRequest>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub weight_capacity: f64,
    #[serde(default)]
    pub volume_capacity: f64,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/vehicles", post(register_vehicle).get(list_vehicles))
}

async fn register_vehicle(
    State(state): State<AppState>,
    Json(req): Json<RegisterVehicleRequest>,
) -> Result<(StatusCode, Json<Vehicle>), AppError> {
    let category = req
        .category
        .map(|c| VehicleCategory::new(c.name, c.weight_capacity, c.volume_capacity));
    let mut vehicle = Vehicle::new(req.name, category);
    vehicle.license_plate = req.license_plate;
    if let Some(id) = req.id {
        vehicle.id = id;
    }

    let mut engine = state.engine()?;
    let id = engine.register_vehicle(vehicle)?;
    let stored = engine
        .vehicle(&id)
        .cloned()
        .ok_or_else(|| AppError::NotFoundError(format!("Vehicle not found: {}", id)))?;

    Ok((StatusCode::CREATED, Json(stored)))
}

async fn list_vehicles(State(state): State<AppState>) -> Result<Json<Vec<Vehicle>>, AppError> {
    let engine = state.engine()?;
    Ok(Json(engine.vehicles().into_iter().cloned().collect()))
}
