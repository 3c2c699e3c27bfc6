use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use fleet_catalog::Product;
use fleet_order::{DeliveryOrder, FulfillmentState, StockMove};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DeliveryOrderRequest {
    pub id: Option<Uuid>,
    pub name: String,
    pub customer: String,
    pub origin: Option<String>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub state: Option<FulfillmentState>,
    #[serde(default)]
    pub moves: Vec<StockMoveRequest>,
}

#[derive(Debug, Deserialize)]
pub struct StockMoveRequest {
    pub id: Option<Uuid>,
    pub product: Option<ProductRequest>,
    pub quantity: f64,
    pub uom: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub id: Option<Uuid>,
    pub name: String,
    pub default_code: Option<String>,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub volume: f64,
}

impl DeliveryOrderRequest {
    fn into_order(self) -> DeliveryOrder {
        let mut order = DeliveryOrder::new(
            self.name,
            self.customer,
            self.scheduled_date.unwrap_or_else(Utc::now),
        );
        if let Some(id) = self.id {
            order.id = id;
        }
        if let Some(origin) = self.origin {
            order = order.with_origin(origin);
        }
        if let Some(state) = self.state {
            order.state = state;
        }
        for line in self.moves {
            order.add_move(line.into_move());
        }
        order
    }
}

impl StockMoveRequest {
    fn into_move(self) -> StockMove {
        let product = self.product.map(|p| {
            let mut product = Product::new(p.name, p.weight, p.volume);
            if let Some(id) = p.id {
                product.id = id;
            }
            product.default_code = p.default_code;
            product
        });
        StockMove {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            product,
            quantity: self.quantity,
            uom: self.uom.unwrap_or_else(|| "Units".to_string()),
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/delivery-orders", put(upsert_order))
        .route("/v1/delivery-orders/{id}", get(get_order))
}

async fn upsert_order(
    State(state): State<AppState>,
    Json(req): Json<DeliveryOrderRequest>,
) -> Result<Json<DeliveryOrder>, AppError> {
    let mut engine = state.engine()?;
    let id = engine.upsert_order(req.into_order())?;
    find_order(&engine, &id).map(Json)
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryOrder>, AppError> {
    let engine = state.engine()?;
    find_order(&engine, &id).map(Json)
}

fn find_order(engine: &fleet_order::AssignmentManager, id: &Uuid) -> Result<DeliveryOrder, AppError> {
    engine
        .get_order(id)
        .cloned()
        .ok_or_else(|| AppError::NotFoundError(format!("Delivery order not found: {}", id)))
}
