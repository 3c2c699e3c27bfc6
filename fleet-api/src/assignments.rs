use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, TimeZone, Utc};
use fleet_order::{Assignment, AssignmentError, AssignmentManager, UnassignSummary};
use fleet_shared::AssignmentEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OrderSelection {
    pub order_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ManualAssignmentRequest {
    pub vehicle_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddOrderRequest {
    pub order_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ChangeVehicleRequest {
    pub vehicle_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct JournalEntryResponse {
    pub id: Uuid,
    pub subject: &'static str,
    pub body: String,
    pub event: AssignmentEvent,
    pub recorded_at: Option<DateTime<Utc>>,
}

type Transition = fn(&mut AssignmentManager, &Uuid) -> Result<(), AssignmentError>;

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/assignments", post(assign).get(list_assignments))
        .route("/v1/assignments/unassign", post(unassign))
        .route("/v1/assignments/manual", post(create_manual))
        .route("/v1/assignments/{id}", get(get_assignment).delete(delete_assignment))
        .route("/v1/assignments/{id}/orders", post(add_order))
        .route("/v1/assignments/{id}/orders/{order_id}", delete(remove_order))
        .route("/v1/assignments/{id}/vehicle", put(change_vehicle))
        .route("/v1/assignments/{id}/confirm", post(confirm))
        .route("/v1/assignments/{id}/draft", post(revert_to_draft))
        .route("/v1/assignments/{id}/dispatch", post(dispatch))
        .route("/v1/assignments/{id}/complete", post(complete))
        .route("/v1/assignments/{id}/cancel", post(cancel))
        .route("/v1/assignments/{id}/journal", get(journal))
}

async fn assign(
    State(state): State<AppState>,
    Json(req): Json<OrderSelection>,
) -> Result<(StatusCode, Json<Assignment>), AppError> {
    let mut engine = state.engine()?;
    let id = engine.assign(&req.order_ids)?;
    Ok((StatusCode::CREATED, Json(find_assignment(&engine, &id)?)))
}

async fn unassign(
    State(state): State<AppState>,
    Json(req): Json<OrderSelection>,
) -> Result<Json<UnassignSummary>, AppError> {
    let mut engine = state.engine()?;
    Ok(Json(engine.unassign(&req.order_ids)?))
}

async fn create_manual(
    State(state): State<AppState>,
    Json(req): Json<ManualAssignmentRequest>,
) -> Result<(StatusCode, Json<Assignment>), AppError> {
    let mut engine = state.engine()?;
    let id = engine.create_assignment(&req.vehicle_id, req.notes)?;
    Ok((StatusCode::CREATED, Json(find_assignment(&engine, &id)?)))
}

async fn list_assignments(State(state): State<AppState>) -> Result<Json<Vec<Assignment>>, AppError> {
    let engine = state.engine()?;
    Ok(Json(engine.list_assignments().into_iter().cloned().collect()))
}

async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Assignment>, AppError> {
    let engine = state.engine()?;
    Ok(Json(find_assignment(&engine, &id)?))
}

async fn delete_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.engine()?.delete_assignment(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddOrderRequest>,
) -> Result<Json<Assignment>, AppError> {
    let mut engine = state.engine()?;
    engine.add_order(&id, &req.order_id)?;
    Ok(Json(find_assignment(&engine, &id)?))
}

async fn remove_order(
    State(state): State<AppState>,
    Path((id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Assignment>, AppError> {
    let mut engine = state.engine()?;
    engine.remove_order(&id, &order_id)?;
    Ok(Json(find_assignment(&engine, &id)?))
}

async fn change_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangeVehicleRequest>,
) -> Result<Json<Assignment>, AppError> {
    let mut engine = state.engine()?;
    engine.change_vehicle(&id, &req.vehicle_id)?;
    Ok(Json(find_assignment(&engine, &id)?))
}

async fn confirm(state: State<AppState>, id: Path<Uuid>) -> Result<Json<Assignment>, AppError> {
    apply(state, id, AssignmentManager::set_assigned)
}

async fn revert_to_draft(state: State<AppState>, id: Path<Uuid>) -> Result<Json<Assignment>, AppError> {
    apply(state, id, AssignmentManager::set_draft)
}

async fn dispatch(state: State<AppState>, id: Path<Uuid>) -> Result<Json<Assignment>, AppError> {
    apply(state, id, AssignmentManager::set_in_transit)
}

async fn complete(state: State<AppState>, id: Path<Uuid>) -> Result<Json<Assignment>, AppError> {
    apply(state, id, AssignmentManager::set_done)
}

async fn cancel(state: State<AppState>, id: Path<Uuid>) -> Result<Json<Assignment>, AppError> {
    apply(state, id, AssignmentManager::set_cancel)
}

async fn journal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<JournalEntryResponse>>, AppError> {
    let engine = state.engine()?;
    find_assignment(&engine, &id)?;

    let entries = engine
        .journal(&id)
        .into_iter()
        .map(|entry| JournalEntryResponse {
            id: entry.id,
            subject: entry.event.subject(),
            body: entry.event.body(),
            recorded_at: Utc.timestamp_opt(entry.timestamp, 0).single(),
            event: entry.event,
        })
        .collect();
    Ok(Json(entries))
}

// ============================================================================
// Helpers
// ============================================================================

fn apply(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    transition: Transition,
) -> Result<Json<Assignment>, AppError> {
    let mut engine = state.engine()?;
    transition(&mut *engine, &id)?;
    Ok(Json(find_assignment(&engine, &id)?))
}

fn find_assignment(engine: &AssignmentManager, id: &Uuid) -> Result<Assignment, AppError> {
    engine
        .get_assignment(id)
        .cloned()
        .ok_or_else(|| AppError::NotFoundError(format!("Assignment not found: {}", id)))
}
