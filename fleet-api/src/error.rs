use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fleet_catalog::CatalogError;
use fleet_order::AssignmentError;
use serde_json::{json, Value};

#[derive(Debug)]
pub enum AppError {
    ValidationError(String, Option<Value>),
    NotFoundError(String),
    ConflictError(String, Option<Value>),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match self {
            AppError::ValidationError(msg, details) => (StatusCode::UNPROCESSABLE_ENTITY, msg, details),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::ConflictError(msg, details) => (StatusCode::CONFLICT, msg, details),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string(), None)
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string(), None)
            }
        };

        let body = match details {
            Some(details) => json!({ "error": error_message, "details": details }),
            None => json!({ "error": error_message }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<AssignmentError> for AppError {
    fn from(err: AssignmentError) -> Self {
        let message = err.to_string();
        match err {
            AssignmentError::AlreadyAssigned { conflicts } => {
                AppError::ConflictError(message, Some(json!({ "conflicts": conflicts })))
            }
            AssignmentError::CapacityExceeded { violations, .. } => {
                AppError::ConflictError(message, Some(json!({ "violations": violations })))
            }
            AssignmentError::InvalidTransition { from, to } => {
                AppError::ConflictError(message, Some(json!({ "from": from, "to": to })))
            }
            AssignmentError::NotModifiable(_) => AppError::ConflictError(message, None),
            AssignmentError::NoEligibleVehicle {
                orders,
                required_weight,
                required_volume,
                max_weight_capacity,
            } => AppError::ValidationError(
                message,
                Some(json!({
                    "orders": orders,
                    "required_weight": required_weight,
                    "required_volume": required_volume,
                    "max_weight_capacity": max_weight_capacity,
                })),
            ),
            AssignmentError::EmptySelection
            | AssignmentError::EmptyOrder { .. }
            | AssignmentError::ZeroDemand
            | AssignmentError::NoVehicleCapacity
            | AssignmentError::NothingToUnassign
            | AssignmentError::InvalidOrder(_)
            | AssignmentError::Catalog(CatalogError::InvalidVehicle(_)) => {
                AppError::ValidationError(message, None)
            }
            AssignmentError::OrderNotFound(_)
            | AssignmentError::AssignmentNotFound(_)
            | AssignmentError::VehicleNotFound(_)
            | AssignmentError::Catalog(CatalogError::NotFound(_)) => AppError::NotFoundError(message),
            AssignmentError::Core(_) => AppError::InternalServerError(message),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}
