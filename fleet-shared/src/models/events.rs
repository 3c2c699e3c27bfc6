use uuid::Uuid;

/// Notable change on an assignment, as posted to its audit trail
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentEvent {
    Created {
        vehicle_name: String,
        license_plate: Option<String>,
        deliveries: usize,
        total_weight: f64,
        total_volume: f64,
        weight_utilization: f64,
        volume_utilization: f64,
    },
    OrderAdded {
        order_name: String,
    },
    OrderRemoved {
        order_name: String,
    },
    VehicleChanged {
        vehicle_name: String,
        license_plate: Option<String>,
    },
    StateChanged {
        from: String,
        to: String,
    },
    Dispatched {
        vehicle_name: String,
        license_plate: Option<String>,
        order_count: usize,
    },
    Completed {
        vehicle_name: String,
        order_count: usize,
    },
    Cancelled {
        vehicle_name: String,
        order_count: usize,
    },
}

impl AssignmentEvent {
    /// Short title shown above the message body
    pub fn subject(&self) -> &'static str {
        match self {
            AssignmentEvent::Created { .. } => "Assignment Created",
            AssignmentEvent::OrderAdded { .. } => "Delivery Order Added",
            AssignmentEvent::OrderRemoved { .. } => "Delivery Order Removed",
            AssignmentEvent::VehicleChanged { .. } => "Vehicle Changed",
            AssignmentEvent::StateChanged { .. } => "Status Changed",
            AssignmentEvent::Dispatched { .. } => "Vehicle Dispatched",
            AssignmentEvent::Completed { .. } => "Delivery Completed",
            AssignmentEvent::Cancelled { .. } => "Assignment Cancelled",
        }
    }

    /// Human readable message body
    pub fn body(&self) -> String {
        match self {
            AssignmentEvent::Created {
                vehicle_name,
                license_plate,
                deliveries,
                total_weight,
                total_volume,
                weight_utilization,
                volume_utilization,
            } => format!(
                "Vehicle: {} [{}]\nDeliveries: {}\nTotal Weight: {:.2} kg\nTotal Volume: {:.2} m³\nUtilization: {:.1}% (Weight), {:.1}% (Volume)",
                vehicle_name,
                plate_or_na(license_plate),
                deliveries,
                total_weight,
                total_volume,
                weight_utilization,
                volume_utilization,
            ),
            AssignmentEvent::OrderAdded { order_name } => {
                format!("Delivery order {} added to the assignment", order_name)
            }
            AssignmentEvent::OrderRemoved { order_name } => {
                format!("Delivery order {} removed from the assignment", order_name)
            }
            AssignmentEvent::VehicleChanged { vehicle_name, license_plate } => format!(
                "Vehicle changed to {} [{}]",
                vehicle_name,
                plate_or_na(license_plate)
            ),
            AssignmentEvent::StateChanged { from, to } => format!("Status: {} → {}", from, to),
            AssignmentEvent::Dispatched { vehicle_name, license_plate, order_count } => format!(
                "Vehicle {} [{}] dispatched with {} delivery order(s)",
                vehicle_name,
                plate_or_na(license_plate),
                order_count
            ),
            AssignmentEvent::Completed { vehicle_name, order_count } => format!(
                "All {} delivery order(s) delivered by {}",
                order_count, vehicle_name
            ),
            AssignmentEvent::Cancelled { vehicle_name, order_count } => format!(
                "Assignment of {} delivery order(s) to {} cancelled",
                order_count, vehicle_name
            ),
        }
    }
}

fn plate_or_na(plate: &Option<String>) -> &str {
    plate.as_deref().unwrap_or("N/A")
}

/// One append-only audit trail record
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct AuditEntry {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub assignment_name: String,
    pub event: AssignmentEvent,
    pub timestamp: i64,
}

impl AuditEntry {
    pub fn new(assignment_id: Uuid, assignment_name: impl Into<String>, event: AssignmentEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            assignment_id,
            assignment_name: assignment_name.into(),
            event,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}
