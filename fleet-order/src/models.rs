use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

use fleet_catalog::{Product, Vehicle};

/// Fulfillment status of a delivery order in the warehouse
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentState {
    #[default]
    Draft,
    Waiting,
    Confirmed,
    Ready,
    Done,
    Cancelled,
}

/// Assignment status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentState {
    Draft,
    Assigned,
    InTransit,
    Done,
    #[serde(rename = "cancel")]
    Cancelled,
}

impl AssignmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentState::Draft => "draft",
            AssignmentState::Assigned => "assigned",
            AssignmentState::InTransit => "in_transit",
            AssignmentState::Done => "done",
            AssignmentState::Cancelled => "cancel",
        }
    }

    /// No further transitions or membership changes
    pub fn is_terminal(&self) -> bool {
        matches!(self, AssignmentState::Done | AssignmentState::Cancelled)
    }

    /// The assignment currently holds its vehicle
    pub fn holds_vehicle(&self) -> bool {
        matches!(self, AssignmentState::Assigned | AssignmentState::InTransit)
    }
}

impl fmt::Display for AssignmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One product line on a delivery order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMove {
    pub id: Uuid,
    pub product: Option<Product>,
    pub quantity: f64,
    pub uom: String,
}

impl StockMove {
    pub fn new(product: Product, quantity: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            product: Some(product),
            quantity,
            uom: "Units".to_string(),
        }
    }

    pub fn total_weight(&self) -> f64 {
        match &self.product {
            Some(product) if product.has_weight() => self.quantity * product.weight,
            _ => 0.0,
        }
    }

    pub fn total_volume(&self) -> f64 {
        match &self.product {
            Some(product) if product.has_volume() => self.quantity * product.volume,
            _ => 0.0,
        }
    }
}

/// Outgoing delivery order, owned by the order-management system.
///
/// `vehicle_id` and `assignment_id` are the only fields this engine writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOrder {
    pub id: Uuid,
    pub name: String,
    pub customer: String,
    pub origin: Option<String>,
    pub scheduled_date: DateTime<Utc>,
    pub state: FulfillmentState,
    pub moves: Vec<StockMove>,
    pub vehicle_id: Option<Uuid>,
    pub assignment_id: Option<Uuid>,
}

impl DeliveryOrder {
    pub fn new(name: impl Into<String>, customer: impl Into<String>, scheduled_date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            customer: customer.into(),
            origin: None,
            scheduled_date,
            state: FulfillmentState::Confirmed,
            moves: Vec::new(),
            vehicle_id: None,
            assignment_id: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn add_move(&mut self, stock_move: StockMove) {
        self.moves.push(stock_move);
    }

    /// Total weight of all products on this delivery (kg)
    pub fn total_weight(&self) -> f64 {
        self.moves.iter().map(StockMove::total_weight).sum()
    }

    /// Total volume of all products on this delivery (m³)
    pub fn total_volume(&self) -> f64 {
        self.moves.iter().map(StockMove::total_volume).sum()
    }

    pub fn is_assigned(&self) -> bool {
        self.assignment_id.is_some()
    }

    pub fn link(&mut self, vehicle_id: Uuid, assignment_id: Uuid) {
        self.vehicle_id = Some(vehicle_id);
        self.assignment_id = Some(assignment_id);
    }

    pub fn unlink(&mut self) {
        self.vehicle_id = None;
        self.assignment_id = None;
    }
}

/// Delivery order line of an assignment, with the order's figures copied in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentPicking {
    pub id: Uuid,
    pub picking_id: Uuid,
    pub picking_name: String,
    pub customer: String,
    pub origin: Option<String>,
    pub scheduled_date: DateTime<Utc>,
    pub state: FulfillmentState,
    pub total_weight: f64,
    pub total_volume: f64,
}

impl AssignmentPicking {
    pub fn from_order(order: &DeliveryOrder) -> Self {
        Self {
            id: Uuid::new_v4(),
            picking_id: order.id,
            picking_name: order.name.clone(),
            customer: order.customer.clone(),
            origin: order.origin.clone(),
            scheduled_date: order.scheduled_date,
            state: order.state,
            total_weight: order.total_weight(),
            total_volume: order.total_volume(),
        }
    }
}

/// Per-product breakdown line used for loading lists and reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentProduct {
    pub id: Uuid,
    pub picking_id: Uuid,
    pub picking_name: String,
    pub move_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: f64,
    pub uom: String,
    pub unit_weight: f64,
    pub unit_volume: f64,
    pub total_weight: f64,
    pub total_volume: f64,
}

impl AssignmentProduct {
    /// `None` for moves without a product
    pub fn from_move(order: &DeliveryOrder, stock_move: &StockMove) -> Option<Self> {
        let product = stock_move.product.as_ref()?;
        Some(Self {
            id: Uuid::new_v4(),
            picking_id: order.id,
            picking_name: order.name.clone(),
            move_id: stock_move.id,
            product_id: product.id,
            product_name: product.display_name(),
            quantity: stock_move.quantity,
            uom: stock_move.uom.clone(),
            unit_weight: product.weight,
            unit_volume: product.volume,
            total_weight: stock_move.quantity * product.weight,
            total_volume: stock_move.quantity * product.volume,
        })
    }
}

/// A vehicle together with the delivery orders it carries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub name: String,
    pub vehicle_id: Uuid,
    pub vehicle_name: String,
    pub license_plate: Option<String>,
    pub assignment_date: DateTime<Utc>,
    pub pickings: Vec<AssignmentPicking>,
    pub product_lines: Vec<AssignmentProduct>,
    pub delivery_count: usize,
    pub vehicle_weight_capacity: f64,
    pub vehicle_volume_capacity: f64,
    pub total_weight: f64,
    pub total_volume: f64,
    pub weight_utilization: f64,
    pub volume_utilization: f64,
    pub state: AssignmentState,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(name: String, vehicle: &Vehicle) -> Self {
        let now = Utc::now();
        let mut assignment = Self {
            id: Uuid::new_v4(),
            name,
            vehicle_id: vehicle.id,
            vehicle_name: vehicle.name.clone(),
            license_plate: vehicle.license_plate.clone(),
            assignment_date: now,
            pickings: Vec::new(),
            product_lines: Vec::new(),
            delivery_count: 0,
            vehicle_weight_capacity: 0.0,
            vehicle_volume_capacity: 0.0,
            total_weight: 0.0,
            total_volume: 0.0,
            weight_utilization: 0.0,
            volume_utilization: 0.0,
            state: AssignmentState::Draft,
            notes: None,
            updated_at: now,
        };
        assignment.set_vehicle(vehicle);
        assignment
    }

    /// Point at another vehicle and refresh the capacity snapshot
    pub fn set_vehicle(&mut self, vehicle: &Vehicle) {
        let capacity = vehicle.capacity();
        self.vehicle_id = vehicle.id;
        self.vehicle_name = vehicle.name.clone();
        self.license_plate = vehicle.license_plate.clone();
        self.vehicle_weight_capacity = capacity.weight_kg;
        self.vehicle_volume_capacity = capacity.volume_m3;
        self.recompute();
    }

    /// Recalculate count, totals and utilization from the lines
    pub fn recompute(&mut self) {
        self.delivery_count = self.pickings.len();
        self.total_weight = self.pickings.iter().map(|p| p.total_weight).sum();
        self.total_volume = self.pickings.iter().map(|p| p.total_volume).sum();
        self.weight_utilization = utilization(self.total_weight, self.vehicle_weight_capacity);
        self.volume_utilization = utilization(self.total_volume, self.vehicle_volume_capacity);
        self.updated_at = Utc::now();
    }

    pub fn contains_order(&self, order_id: &Uuid) -> bool {
        self.pickings.iter().any(|p| p.picking_id == *order_id)
    }

    pub fn order_ids(&self) -> Vec<Uuid> {
        self.pickings.iter().map(|p| p.picking_id).collect()
    }

    pub fn update_state(&mut self, new_state: AssignmentState) {
        self.state = new_state;
        self.updated_at = Utc::now();
    }
}

/// Percentage of `capacity` used by `total`, zero when capacity is not configured
pub fn utilization(total: f64, capacity: f64) -> f64 {
    if capacity > 0.0 {
        total / capacity * 100.0
    } else {
        0.0
    }
}
