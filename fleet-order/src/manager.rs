use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};
use uuid::Uuid;

use fleet_catalog::{Vehicle, VehicleAvailability, VehicleDirectory};
use fleet_core::{EventLog, ReferenceSequence};
use fleet_shared::{AssignmentEvent, AuditEntry};

use crate::changes::ChangeHandler;
use crate::error::{AssignmentConflict, AssignmentError};
use crate::matcher::CapacityMatcher;
use crate::models::{Assignment, AssignmentState, DeliveryOrder};

/// Placeholder name until a reference is drawn from the sequence
const PENDING_REFERENCE: &str = "New";

/// Result of a bulk unassignment
#[derive(Debug, Clone, Default, Serialize)]
pub struct UnassignSummary {
    pub orders_unassigned: usize,
    pub assignments_deleted: Vec<String>,
}

/// Vehicle assignment engine.
///
/// Owns the delivery orders and assignments it has been handed and applies
/// every operation as one unit of work: an operation either succeeds
/// completely or leaves all records untouched. Callers sharing a manager
/// must serialize access (e.g. behind a mutex).
pub struct AssignmentManager {
    fleet: Box<dyn VehicleDirectory>,
    sequence: Box<dyn ReferenceSequence>,
    journal: Box<dyn EventLog>,
    orders: HashMap<Uuid, DeliveryOrder>,
    assignments: HashMap<Uuid, Assignment>,
}

impl AssignmentManager {
    pub fn new(
        fleet: Box<dyn VehicleDirectory>,
        sequence: Box<dyn ReferenceSequence>,
        journal: Box<dyn EventLog>,
    ) -> Self {
        Self {
            fleet,
            sequence,
            journal,
            orders: HashMap::new(),
            assignments: HashMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Fleet and order records
    // ------------------------------------------------------------------

    /// Register or update a vehicle.
    ///
    /// Open assignments on the vehicle pick up the new capacity; the update is
    /// refused if any of them would no longer fit.
    pub fn register_vehicle(&mut self, vehicle: Vehicle) -> Result<Uuid, AssignmentError> {
        let mut refreshed = Vec::new();
        for assignment in self.assignments.values() {
            if assignment.vehicle_id != vehicle.id || assignment.state.is_terminal() {
                continue;
            }
            let mut working = assignment.clone();
            ChangeHandler::swap_vehicle(&mut working, &vehicle);
            ChangeHandler::validate(&working)?;
            refreshed.push(working);
        }

        let id = vehicle.id;
        self.fleet.upsert(vehicle)?;
        for assignment in refreshed {
            self.assignments.insert(assignment.id, assignment);
        }
        Ok(id)
    }

    pub fn vehicle(&self, vehicle_id: &Uuid) -> Option<&Vehicle> {
        self.fleet.vehicle(vehicle_id)
    }

    pub fn vehicles(&self) -> Vec<&Vehicle> {
        self.fleet.vehicles()
    }

    /// Store a delivery order coming from the order-management system.
    ///
    /// Vehicle and assignment links are owned by this engine and survive the
    /// update. If the order sits on an open assignment, that assignment is
    /// re-synced and the capacity rule re-checked before anything is stored.
    /// Closed assignments keep the figures they were closed with.
    pub fn upsert_order(&mut self, mut order: DeliveryOrder) -> Result<Uuid, AssignmentError> {
        if order.name.trim().is_empty() {
            return Err(AssignmentError::InvalidOrder("reference name is required".to_string()));
        }
        if let Some(bad) = order.moves.iter().find(|m| !m.quantity.is_finite() || m.quantity < 0.0) {
            return Err(AssignmentError::InvalidOrder(format!(
                "invalid quantity {} on move {} of {}",
                bad.quantity, bad.id, order.name
            )));
        }

        match self.orders.get(&order.id) {
            Some(existing) => {
                order.vehicle_id = existing.vehicle_id;
                order.assignment_id = existing.assignment_id;
            }
            None => order.unlink(),
        }

        if let Some(assignment_id) = order.assignment_id {
            if let Some(current) = self.assignments.get(&assignment_id).filter(|a| !a.state.is_terminal()) {
                let mut working = current.clone();
                ChangeHandler::refresh_order(&mut working, &order);
                ChangeHandler::validate(&working).inspect_err(|e| {
                    warn!("Update of {} rejected: {}", order.name, e);
                })?;
                self.assignments.insert(assignment_id, working);
            }
        }

        let id = order.id;
        self.orders.insert(id, order);
        Ok(id)
    }

    pub fn get_order(&self, order_id: &Uuid) -> Option<&DeliveryOrder> {
        self.orders.get(order_id)
    }

    pub fn get_assignment(&self, assignment_id: &Uuid) -> Option<&Assignment> {
        self.assignments.get(assignment_id)
    }

    /// Newest first
    pub fn list_assignments(&self) -> Vec<&Assignment> {
        let mut assignments: Vec<&Assignment> = self.assignments.values().collect();
        assignments.sort_by(|a, b| {
            b.assignment_date
                .cmp(&a.assignment_date)
                .then_with(|| b.name.cmp(&a.name))
        });
        assignments
    }

    /// Audit trail of one assignment, oldest first
    pub fn journal(&self, assignment_id: &Uuid) -> Vec<AuditEntry> {
        self.journal.entries_for(assignment_id)
    }

    // ------------------------------------------------------------------
    // Batch operations
    // ------------------------------------------------------------------

    /// Put all `order_ids` on the smallest vehicle that carries them together.
    pub fn assign(&mut self, order_ids: &[Uuid]) -> Result<Uuid, AssignmentError> {
        let orders = self.resolve_orders(order_ids)?;

        let conflicts: Vec<AssignmentConflict> = orders
            .iter()
            .filter(|o| o.is_assigned())
            .map(|o| self.conflict_for(o))
            .collect();
        if !conflicts.is_empty() {
            let err = AssignmentError::AlreadyAssigned { conflicts };
            warn!("Vehicle assignment rejected: {}", err);
            return Err(err);
        }

        let refs: Vec<&DeliveryOrder> = orders.iter().collect();
        let vehicles = self.fleet.vehicles();
        let plan = CapacityMatcher::plan(&refs, &vehicles).inspect_err(|e| {
            warn!("Vehicle assignment rejected: {}", e);
        })?;
        let vehicle = plan.vehicle.clone();
        let demand = plan.demand;

        info!(
            "Starting vehicle assignment: {} deliveries, required load {:.2} kg / {:.2} m³",
            orders.len(),
            demand.weight_kg,
            demand.volume_m3
        );

        let mut assignment = Assignment::new(PENDING_REFERENCE.to_string(), &vehicle);
        assignment.update_state(AssignmentState::Assigned);
        for order in &orders {
            ChangeHandler::attach_order(&mut assignment, order);
        }
        ChangeHandler::validate(&assignment)?;
        assignment.name = self.sequence.next_reference()?;

        info!(
            "Selected vehicle {} ({:.2} kg / {:.2} m³) for {}",
            vehicle.name,
            assignment.vehicle_weight_capacity,
            assignment.vehicle_volume_capacity,
            assignment.name
        );

        let assignment_id = assignment.id;
        for order in &orders {
            if let Some(stored) = self.orders.get_mut(&order.id) {
                stored.link(vehicle.id, assignment_id);
            }
        }

        let event = AssignmentEvent::Created {
            vehicle_name: vehicle.name.clone(),
            license_plate: vehicle.license_plate.clone(),
            deliveries: assignment.delivery_count,
            total_weight: assignment.total_weight,
            total_volume: assignment.total_volume,
            weight_utilization: assignment.weight_utilization,
            volume_utilization: assignment.volume_utilization,
        };
        let name = assignment.name.clone();
        self.assignments.insert(assignment_id, assignment);
        self.refresh_availability(&vehicle.id);
        self.record(assignment_id, &name, event);

        Ok(assignment_id)
    }

    /// Delete every assignment carrying one of `order_ids` and free its orders.
    pub fn unassign(&mut self, order_ids: &[Uuid]) -> Result<UnassignSummary, AssignmentError> {
        let orders = self.resolve_orders(order_ids)?;

        let mut assignment_ids: Vec<Uuid> = Vec::new();
        for order in &orders {
            if let Some(id) = order.assignment_id {
                if !assignment_ids.contains(&id) {
                    assignment_ids.push(id);
                }
            }
        }
        if assignment_ids.is_empty() {
            return Err(AssignmentError::NothingToUnassign);
        }

        info!("Unassigning {} vehicle assignment(s)", assignment_ids.len());
        let mut summary = UnassignSummary::default();
        for id in &assignment_ids {
            if let Some(assignment) = self.assignments.get(id) {
                let deliveries: Vec<&str> = orders
                    .iter()
                    .filter(|o| o.assignment_id == Some(*id))
                    .map(|o| o.name.as_str())
                    .collect();
                info!(
                    "Assignment: {}, vehicle: {}, deliveries: {}",
                    assignment.name,
                    assignment.vehicle_name,
                    deliveries.join(", ")
                );
            }

            let (name, cleared) = self.teardown(id);
            summary.orders_unassigned += cleared;
            if let Some(name) = name {
                summary.assignments_deleted.push(name);
            }
        }

        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Record-level hooks
    // ------------------------------------------------------------------

    /// Empty draft assignment on a chosen vehicle
    pub fn create_assignment(
        &mut self,
        vehicle_id: &Uuid,
        notes: Option<String>,
    ) -> Result<Uuid, AssignmentError> {
        let vehicle = self.fleet.vehicle(vehicle_id).cloned()
            .ok_or(AssignmentError::VehicleNotFound(*vehicle_id))?;

        let mut assignment = Assignment::new(self.sequence.next_reference()?, &vehicle);
        assignment.notes = notes;

        let id = assignment.id;
        let name = assignment.name.clone();
        self.assignments.insert(id, assignment);
        self.record(id, &name, AssignmentEvent::Created {
            vehicle_name: vehicle.name,
            license_plate: vehicle.license_plate,
            deliveries: 0,
            total_weight: 0.0,
            total_volume: 0.0,
            weight_utilization: 0.0,
            volume_utilization: 0.0,
        });
        Ok(id)
    }

    /// Delete one assignment with its lines, freeing its orders
    pub fn delete_assignment(&mut self, assignment_id: &Uuid) -> Result<(), AssignmentError> {
        if !self.assignments.contains_key(assignment_id) {
            return Err(AssignmentError::AssignmentNotFound(*assignment_id));
        }
        let (name, cleared) = self.teardown(assignment_id);
        info!("Assignment {} deleted, {} order(s) released", name.unwrap_or_default(), cleared);
        Ok(())
    }

    pub fn add_order(&mut self, assignment_id: &Uuid, order_id: &Uuid) -> Result<(), AssignmentError> {
        let current = self.assignments.get(assignment_id)
            .ok_or(AssignmentError::AssignmentNotFound(*assignment_id))?;
        ChangeHandler::ensure_modifiable(current)?;

        let order = self.orders.get(order_id)
            .ok_or(AssignmentError::OrderNotFound(*order_id))?;

        if order.assignment_id.is_some_and(|other| other != *assignment_id) {
            return Err(AssignmentError::AlreadyAssigned {
                conflicts: vec![self.conflict_for(order)],
            });
        }
        if let Some(other) = self
            .assignments
            .values()
            .find(|a| a.id != *assignment_id && !a.state.is_terminal() && a.contains_order(order_id))
        {
            return Err(AssignmentError::AlreadyAssigned {
                conflicts: vec![AssignmentConflict {
                    order_id: order.id,
                    order_name: order.name.clone(),
                    vehicle_name: Some(other.vehicle_name.clone()),
                    assignment_name: other.name.clone(),
                }],
            });
        }

        let mut working = current.clone();
        ChangeHandler::attach_order(&mut working, order);
        ChangeHandler::validate(&working).inspect_err(|e| {
            warn!("Adding {} rejected: {}", order.name, e);
        })?;

        let order_name = order.name.clone();
        let vehicle_id = working.vehicle_id;
        let name = working.name.clone();
        self.assignments.insert(*assignment_id, working);
        if let Some(order) = self.orders.get_mut(order_id) {
            order.link(vehicle_id, *assignment_id);
        }
        self.record(*assignment_id, &name, AssignmentEvent::OrderAdded { order_name });
        Ok(())
    }

    pub fn remove_order(&mut self, assignment_id: &Uuid, order_id: &Uuid) -> Result<(), AssignmentError> {
        let current = self.assignments.get(assignment_id)
            .ok_or(AssignmentError::AssignmentNotFound(*assignment_id))?;
        ChangeHandler::ensure_modifiable(current)?;

        let mut working = current.clone();
        if !ChangeHandler::detach_order(&mut working, order_id) {
            return Err(AssignmentError::InvalidOrder(format!(
                "delivery order {} is not part of {}",
                order_id, working.name
            )));
        }
        ChangeHandler::validate(&working)?;

        let name = working.name.clone();
        self.assignments.insert(*assignment_id, working);

        let remaining = other_owner(&self.assignments, order_id);
        let mut order_name = order_id.to_string();
        if let Some(order) = self.orders.get_mut(order_id) {
            order_name = order.name.clone();
            match remaining {
                Some((vehicle_id, owner_id)) => order.link(vehicle_id, owner_id),
                None => order.unlink(),
            }
        }
        self.record(*assignment_id, &name, AssignmentEvent::OrderRemoved { order_name });
        Ok(())
    }

    pub fn change_vehicle(&mut self, assignment_id: &Uuid, vehicle_id: &Uuid) -> Result<(), AssignmentError> {
        let vehicle = self.fleet.vehicle(vehicle_id).cloned()
            .ok_or(AssignmentError::VehicleNotFound(*vehicle_id))?;
        let current = self.assignments.get(assignment_id)
            .ok_or(AssignmentError::AssignmentNotFound(*assignment_id))?;
        ChangeHandler::ensure_modifiable(current)?;

        let previous_vehicle = current.vehicle_id;
        let mut working = current.clone();
        ChangeHandler::swap_vehicle(&mut working, &vehicle);
        ChangeHandler::validate(&working).inspect_err(|e| {
            warn!("Vehicle change to {} rejected: {}", vehicle.name, e);
        })?;

        let state = working.state;
        let name = working.name.clone();
        for order_id in working.order_ids() {
            if let Some(order) = self.orders.get_mut(&order_id) {
                if order.assignment_id == Some(*assignment_id) {
                    order.vehicle_id = Some(vehicle.id);
                }
            }
        }
        self.assignments.insert(*assignment_id, working);

        if previous_vehicle != vehicle.id && state.holds_vehicle() {
            self.refresh_availability(&previous_vehicle);
            self.refresh_availability(&vehicle.id);
        }

        self.record(*assignment_id, &name, AssignmentEvent::VehicleChanged {
            vehicle_name: vehicle.name,
            license_plate: vehicle.license_plate,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------

    /// Transition: Draft → Assigned (vehicle reserved)
    pub fn set_assigned(&mut self, assignment_id: &Uuid) -> Result<(), AssignmentError> {
        self.transition(
            assignment_id,
            AssignmentState::Assigned,
            &[AssignmentState::Draft],
        )?;
        Ok(())
    }

    /// Transition: Assigned → Draft (vehicle released)
    pub fn set_draft(&mut self, assignment_id: &Uuid) -> Result<(), AssignmentError> {
        self.transition(
            assignment_id,
            AssignmentState::Draft,
            &[AssignmentState::Assigned],
        )?;
        Ok(())
    }

    /// Transition: Assigned → InTransit (vehicle dispatched)
    pub fn set_in_transit(&mut self, assignment_id: &Uuid) -> Result<(), AssignmentError> {
        let assignment = self.transition(
            assignment_id,
            AssignmentState::InTransit,
            &[AssignmentState::Assigned],
        )?;
        self.record(*assignment_id, &assignment.name, AssignmentEvent::Dispatched {
            vehicle_name: assignment.vehicle_name.clone(),
            license_plate: assignment.license_plate.clone(),
            order_count: assignment.delivery_count,
        });
        Ok(())
    }

    /// Transition: InTransit → Done (vehicle back in the pool)
    pub fn set_done(&mut self, assignment_id: &Uuid) -> Result<(), AssignmentError> {
        let assignment = self.transition(
            assignment_id,
            AssignmentState::Done,
            &[AssignmentState::InTransit],
        )?;
        self.record(*assignment_id, &assignment.name, AssignmentEvent::Completed {
            vehicle_name: assignment.vehicle_name.clone(),
            order_count: assignment.delivery_count,
        });
        Ok(())
    }

    /// Cancel from any non-terminal state.
    ///
    /// The cancelled record keeps its lines as history; its orders are freed
    /// so they can be planned again.
    pub fn set_cancel(&mut self, assignment_id: &Uuid) -> Result<(), AssignmentError> {
        let assignment = self.transition(
            assignment_id,
            AssignmentState::Cancelled,
            &[AssignmentState::Draft, AssignmentState::Assigned, AssignmentState::InTransit],
        )?;
        let released = self.release_orders(assignment_id);
        info!("{} order(s) released from cancelled {}", released, assignment.name);
        self.record(*assignment_id, &assignment.name, AssignmentEvent::Cancelled {
            vehicle_name: assignment.vehicle_name.clone(),
            order_count: assignment.delivery_count,
        });
        Ok(())
    }

    fn transition(
        &mut self,
        assignment_id: &Uuid,
        to: AssignmentState,
        allowed_from: &[AssignmentState],
    ) -> Result<Assignment, AssignmentError> {
        let assignment = self.assignments.get_mut(assignment_id)
            .ok_or(AssignmentError::AssignmentNotFound(*assignment_id))?;

        let from = assignment.state;
        if !allowed_from.contains(&from) {
            return Err(AssignmentError::InvalidTransition { from, to });
        }

        assignment.update_state(to);
        let snapshot = assignment.clone();
        info!("Assignment {}: {} → {}", snapshot.name, from, to);

        self.refresh_availability(&snapshot.vehicle_id);
        self.record(*assignment_id, &snapshot.name, AssignmentEvent::StateChanged {
            from: from.to_string(),
            to: to.to_string(),
        });
        Ok(snapshot)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn resolve_orders(&self, order_ids: &[Uuid]) -> Result<Vec<DeliveryOrder>, AssignmentError> {
        if order_ids.is_empty() {
            return Err(AssignmentError::EmptySelection);
        }
        let mut seen = HashSet::new();
        order_ids
            .iter()
            .filter(|id| seen.insert(**id))
            .map(|id| {
                self.orders.get(id).cloned()
                    .ok_or(AssignmentError::OrderNotFound(*id))
            })
            .collect()
    }

    fn conflict_for(&self, order: &DeliveryOrder) -> AssignmentConflict {
        let assignment_name = order
            .assignment_id
            .map(|id| {
                self.assignments
                    .get(&id)
                    .map(|a| a.name.clone())
                    .unwrap_or_else(|| id.to_string())
            })
            .unwrap_or_default();
        AssignmentConflict {
            order_id: order.id,
            order_name: order.name.clone(),
            vehicle_name: order
                .vehicle_id
                .and_then(|id| self.fleet.vehicle(&id))
                .map(|v| v.name.clone()),
            assignment_name,
        }
    }

    /// Remove an assignment and clear every order link pointing at it.
    /// Returns the deleted assignment's name (if it existed) and the number
    /// of orders whose links were cleared.
    fn teardown(&mut self, assignment_id: &Uuid) -> (Option<String>, usize) {
        let removed = self.assignments.remove(assignment_id);
        let cleared = self.release_orders(assignment_id);

        let name = removed.map(|assignment| {
            if assignment.state.holds_vehicle() {
                self.refresh_availability(&assignment.vehicle_id);
            }
            assignment.name
        });
        (name, cleared)
    }

    /// Move every order linked to `assignment_id` over to another open
    /// assignment still listing it, or clear its links. Returns the number
    /// of orders left unassigned.
    fn release_orders(&mut self, assignment_id: &Uuid) -> usize {
        let mut cleared = 0;
        for order in self.orders.values_mut() {
            if order.assignment_id != Some(*assignment_id) {
                continue;
            }
            match other_owner(&self.assignments, &order.id) {
                Some((vehicle_id, owner_id)) => order.link(vehicle_id, owner_id),
                None => {
                    order.unlink();
                    cleared += 1;
                }
            }
        }
        cleared
    }

    /// Derive the vehicle's availability from the assignments holding it:
    /// in use while any is in transit, reserved while any is assigned,
    /// available otherwise.
    fn refresh_availability(&mut self, vehicle_id: &Uuid) {
        let holders: Vec<AssignmentState> = self
            .assignments
            .values()
            .filter(|a| a.vehicle_id == *vehicle_id && a.state.holds_vehicle())
            .map(|a| a.state)
            .collect();

        let availability = if holders.contains(&AssignmentState::InTransit) {
            VehicleAvailability::InUse
        } else if holders.is_empty() {
            VehicleAvailability::Available
        } else {
            VehicleAvailability::Reserved
        };
        self.update_availability(vehicle_id, availability);
    }

    fn update_availability(&mut self, vehicle_id: &Uuid, availability: VehicleAvailability) {
        if let Some(tracker) = self.fleet.availability_tracker() {
            if let Err(err) = tracker.set_availability(vehicle_id, availability) {
                warn!("Could not mark vehicle {} {}: {}", vehicle_id, availability, err);
            }
        }
    }

    fn record(&mut self, assignment_id: Uuid, assignment_name: &str, event: AssignmentEvent) {
        let entry = AuditEntry::new(assignment_id, assignment_name, event);
        if let Err(err) = self.journal.append(entry) {
            warn!("Audit entry for {} dropped: {}", assignment_name, err);
        }
    }
}

/// Open assignment still listing `order_id`, as (vehicle, assignment)
fn other_owner(assignments: &HashMap<Uuid, Assignment>, order_id: &Uuid) -> Option<(Uuid, Uuid)> {
    assignments
        .values()
        .find(|a| !a.state.is_terminal() && a.contains_order(order_id))
        .map(|a| (a.vehicle_id, a.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StockMove;
    use chrono::Utc;
    use fleet_catalog::{FleetRegistry, Product, VehicleCategory};
    use fleet_store::{MemoryJournal, PrefixedSequence};

    fn vehicle(name: &str, weight: f64, volume: f64) -> Vehicle {
        Vehicle::new(name, Some(VehicleCategory::new(format!("{} category", name), weight, volume)))
            .with_license_plate(format!("{}-PLATE", name))
    }

    fn manager_with(fleet: FleetRegistry) -> AssignmentManager {
        AssignmentManager::new(
            Box::new(fleet),
            Box::new(PrefixedSequence::new("VA/", 5)),
            Box::new(MemoryJournal::new()),
        )
    }

    /// Fleet A (500 kg / 2 m³) and B (1000 kg / 5 m³)
    fn setup() -> (AssignmentManager, Uuid, Uuid) {
        let mut fleet = FleetRegistry::new();
        let a = fleet.register(vehicle("A", 500.0, 2.0));
        let b = fleet.register(vehicle("B", 1000.0, 5.0));
        (manager_with(fleet), a, b)
    }

    fn delivery(manager: &mut AssignmentManager, name: &str, weight: f64, volume: f64) -> Uuid {
        let mut order = DeliveryOrder::new(name, "Acme Corp", Utc::now());
        order.add_move(StockMove::new(Product::new("Goods", weight, volume), 1.0));
        manager.upsert_order(order).unwrap()
    }

    #[test]
    fn test_assign_selects_vehicle_covering_demand() {
        let (mut manager, a, b) = setup();
        let o1 = delivery(&mut manager, "WH/OUT/00001", 350.0, 0.5);
        let o2 = delivery(&mut manager, "WH/OUT/00002", 250.0, 0.5);

        let id = manager.assign(&[o1, o2]).unwrap();
        let assignment = manager.get_assignment(&id).unwrap();

        assert_eq!(assignment.vehicle_id, b);
        assert_eq!(assignment.name, "VA/00001");
        assert_eq!(assignment.state, AssignmentState::Assigned);
        assert_eq!(assignment.delivery_count, 2);
        assert_eq!(assignment.product_lines.len(), 2);
        assert!((assignment.weight_utilization - 60.0).abs() < 1e-9);

        for order_id in [o1, o2] {
            let order = manager.get_order(&order_id).unwrap();
            assert_eq!(order.vehicle_id, Some(b));
            assert_eq!(order.assignment_id, Some(id));
        }
        assert_eq!(manager.vehicle(&b).unwrap().availability, VehicleAvailability::Reserved);
        assert_eq!(manager.vehicle(&a).unwrap().availability, VehicleAvailability::Available);

        let journal = manager.journal(&id);
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].event.subject(), "Assignment Created");
    }

    #[test]
    fn test_assign_rejects_already_assigned_batch() {
        let (mut manager, _, _) = setup();
        let o1 = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);
        let o2 = delivery(&mut manager, "WH/OUT/00002", 100.0, 0.0);
        manager.assign(&[o1]).unwrap();

        match manager.assign(&[o2, o1]) {
            Err(AssignmentError::AlreadyAssigned { conflicts }) => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].order_name, "WH/OUT/00001");
                assert_eq!(conflicts[0].assignment_name, "VA/00001");
                assert_eq!(conflicts[0].vehicle_name.as_deref(), Some("A"));
            }
            other => panic!("expected AlreadyAssigned, got {:?}", other),
        }

        assert_eq!(manager.list_assignments().len(), 1);
        assert!(!manager.get_order(&o2).unwrap().is_assigned());
    }

    #[test]
    fn test_zero_demand_creates_nothing() {
        let (mut manager, _, _) = setup();
        let o = delivery(&mut manager, "WH/OUT/00001", 0.0, 0.3);

        assert!(matches!(manager.assign(&[o]), Err(AssignmentError::ZeroDemand)));
        assert!(manager.list_assignments().is_empty());
        assert!(!manager.get_order(&o).unwrap().is_assigned());
    }

    #[test]
    fn test_no_eligible_vehicle_leaves_orders_untouched() {
        let (mut manager, _, _) = setup();
        let o1 = delivery(&mut manager, "WH/OUT/00001", 700.0, 1.0);
        let o2 = delivery(&mut manager, "WH/OUT/00002", 400.0, 1.0);

        assert!(matches!(
            manager.assign(&[o1, o2]),
            Err(AssignmentError::NoEligibleVehicle { .. })
        ));
        assert!(manager.list_assignments().is_empty());
        assert!(!manager.get_order(&o1).unwrap().is_assigned());
    }

    #[test]
    fn test_assign_unknown_order() {
        let (mut manager, _, _) = setup();
        let missing = Uuid::new_v4();
        assert!(matches!(manager.assign(&[missing]), Err(AssignmentError::OrderNotFound(id)) if id == missing));
        assert!(matches!(manager.assign(&[]), Err(AssignmentError::EmptySelection)));
    }

    #[test]
    fn test_add_order_over_capacity_is_rolled_back() {
        let (mut manager, a, _) = setup();
        let o1 = delivery(&mut manager, "WH/OUT/00001", 400.0, 0.0);
        let o2 = delivery(&mut manager, "WH/OUT/00002", 125.0, 0.0);
        let id = manager.assign(&[o1]).unwrap();
        assert_eq!(manager.get_assignment(&id).unwrap().vehicle_id, a);

        match manager.add_order(&id, &o2) {
            Err(AssignmentError::CapacityExceeded { violations, .. }) => {
                assert!((violations[0].utilization.unwrap() - 105.0).abs() < 1e-9);
                assert!((violations[0].excess - 25.0).abs() < 1e-9);
            }
            other => panic!("expected CapacityExceeded, got {:?}", other),
        }

        let assignment = manager.get_assignment(&id).unwrap();
        assert_eq!(assignment.delivery_count, 1);
        assert_eq!(assignment.total_weight, 400.0);
        assert_eq!(assignment.product_lines.len(), 1);
        assert!(!manager.get_order(&o2).unwrap().is_assigned());
    }

    #[test]
    fn test_add_and_remove_order() {
        let (mut manager, a, _) = setup();
        let o1 = delivery(&mut manager, "WH/OUT/00001", 200.0, 0.0);
        let o2 = delivery(&mut manager, "WH/OUT/00002", 100.0, 0.0);
        let id = manager.assign(&[o1]).unwrap();

        manager.add_order(&id, &o2).unwrap();
        let assignment = manager.get_assignment(&id).unwrap();
        assert_eq!(assignment.delivery_count, 2);
        assert!(assignment.weight_utilization <= 100.0);
        assert_eq!(manager.get_order(&o2).unwrap().vehicle_id, Some(a));

        manager.remove_order(&id, &o1).unwrap();
        assert_eq!(manager.get_assignment(&id).unwrap().total_weight, 100.0);
        assert!(!manager.get_order(&o1).unwrap().is_assigned());

        assert!(matches!(
            manager.remove_order(&id, &o1),
            Err(AssignmentError::InvalidOrder(_))
        ));

        let subjects: Vec<&str> = manager.journal(&id).iter().map(|e| e.event.subject()).collect();
        assert_eq!(subjects, vec!["Assignment Created", "Delivery Order Added", "Delivery Order Removed"]);
    }

    #[test]
    fn test_add_order_owned_elsewhere() {
        let (mut manager, _, b) = setup();
        let o1 = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);
        let first = manager.assign(&[o1]).unwrap();
        let second = manager.create_assignment(&b, None).unwrap();

        match manager.add_order(&second, &o1) {
            Err(AssignmentError::AlreadyAssigned { conflicts }) => {
                assert_eq!(conflicts[0].assignment_name, manager.get_assignment(&first).unwrap().name);
            }
            other => panic!("expected AlreadyAssigned, got {:?}", other),
        }
    }

    #[test]
    fn test_unassign_restores_orders() {
        let (mut manager, _, b) = setup();
        let o1 = delivery(&mut manager, "WH/OUT/00001", 300.0, 1.0);
        let o2 = delivery(&mut manager, "WH/OUT/00002", 300.0, 1.0);
        let id = manager.assign(&[o1, o2]).unwrap();

        let summary = manager.unassign(&[o1]).unwrap();

        assert_eq!(summary.orders_unassigned, 2);
        assert_eq!(summary.assignments_deleted, vec!["VA/00001".to_string()]);
        assert!(manager.get_assignment(&id).is_none());
        assert!(!manager.get_order(&o1).unwrap().is_assigned());
        assert!(manager.get_order(&o2).unwrap().vehicle_id.is_none());
        assert_eq!(manager.vehicle(&b).unwrap().availability, VehicleAvailability::Available);

        // orders can be planned again
        assert!(manager.assign(&[o1, o2]).is_ok());
    }

    #[test]
    fn test_unassign_requires_an_assignment() {
        let (mut manager, _, _) = setup();
        let o = delivery(&mut manager, "WH/OUT/00001", 300.0, 1.0);
        assert!(matches!(manager.unassign(&[o]), Err(AssignmentError::NothingToUnassign)));
    }

    #[test]
    fn test_unassign_groups_by_assignment() {
        let (mut manager, _, _) = setup();
        let o1 = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);
        let o2 = delivery(&mut manager, "WH/OUT/00002", 100.0, 0.0);
        let o3 = delivery(&mut manager, "WH/OUT/00003", 100.0, 0.0);
        manager.assign(&[o1]).unwrap();
        manager.assign(&[o2]).unwrap();

        let summary = manager.unassign(&[o1, o2, o3]).unwrap();

        assert_eq!(summary.assignments_deleted.len(), 2);
        assert_eq!(summary.orders_unassigned, 2);
        assert!(manager.list_assignments().is_empty());
    }

    #[test]
    fn test_full_lifecycle_updates_vehicle() {
        let (mut manager, a, _) = setup();
        let o = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);
        let id = manager.assign(&[o]).unwrap();

        manager.set_in_transit(&id).unwrap();
        assert_eq!(manager.get_assignment(&id).unwrap().state, AssignmentState::InTransit);
        assert_eq!(manager.vehicle(&a).unwrap().availability, VehicleAvailability::InUse);

        manager.set_done(&id).unwrap();
        assert_eq!(manager.get_assignment(&id).unwrap().state, AssignmentState::Done);
        assert_eq!(manager.vehicle(&a).unwrap().availability, VehicleAvailability::Available);

        let journal = manager.journal(&id);
        let dispatched = journal
            .iter()
            .find(|e| matches!(e.event, AssignmentEvent::Dispatched { .. }))
            .unwrap();
        assert!(dispatched.event.body().contains("A [A-PLATE] dispatched with 1 delivery order(s)"));
        assert!(journal.iter().any(|e| matches!(e.event, AssignmentEvent::Completed { .. })));
    }

    #[test]
    fn test_revert_to_draft_and_confirm() {
        let (mut manager, a, _) = setup();
        let o = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);
        let id = manager.assign(&[o]).unwrap();

        manager.set_draft(&id).unwrap();
        assert_eq!(manager.vehicle(&a).unwrap().availability, VehicleAvailability::Available);

        manager.set_assigned(&id).unwrap();
        assert_eq!(manager.vehicle(&a).unwrap().availability, VehicleAvailability::Reserved);
    }

    #[test]
    fn test_invalid_transitions() {
        let (mut manager, _, _) = setup();
        let o = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);
        let id = manager.assign(&[o]).unwrap();

        assert!(matches!(
            manager.set_done(&id),
            Err(AssignmentError::InvalidTransition { from: AssignmentState::Assigned, to: AssignmentState::Done })
        ));

        manager.set_cancel(&id).unwrap();
        assert!(manager.set_cancel(&id).is_err());
        assert!(manager.set_assigned(&id).is_err());
    }

    #[test]
    fn test_closed_assignment_rejects_changes() {
        let (mut manager, _, b) = setup();
        let o1 = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);
        let o2 = delivery(&mut manager, "WH/OUT/00002", 100.0, 0.0);
        let id = manager.assign(&[o1]).unwrap();
        manager.set_cancel(&id).unwrap();

        assert!(matches!(manager.add_order(&id, &o2), Err(AssignmentError::NotModifiable(_))));
        assert!(matches!(manager.change_vehicle(&id, &b), Err(AssignmentError::NotModifiable(_))));
    }

    #[test]
    fn test_change_vehicle_propagates() {
        let (mut manager, a, b) = setup();
        let o = delivery(&mut manager, "WH/OUT/00001", 300.0, 1.0);
        let id = manager.assign(&[o]).unwrap();

        manager.change_vehicle(&id, &b).unwrap();

        let assignment = manager.get_assignment(&id).unwrap();
        assert_eq!(assignment.vehicle_id, b);
        assert!((assignment.weight_utilization - 30.0).abs() < 1e-9);
        assert_eq!(manager.get_order(&o).unwrap().vehicle_id, Some(b));
        assert_eq!(manager.vehicle(&a).unwrap().availability, VehicleAvailability::Available);
        assert_eq!(manager.vehicle(&b).unwrap().availability, VehicleAvailability::Reserved);

        let last = manager.journal(&id).pop().unwrap();
        assert!(last.event.body().contains("Vehicle changed to B"));
    }

    #[test]
    fn test_change_to_small_vehicle_is_rejected() {
        let (mut manager, a, b) = setup();
        let o = delivery(&mut manager, "WH/OUT/00001", 800.0, 1.0);
        let id = manager.assign(&[o]).unwrap();

        assert!(matches!(
            manager.change_vehicle(&id, &a),
            Err(AssignmentError::CapacityExceeded { .. })
        ));
        assert_eq!(manager.get_assignment(&id).unwrap().vehicle_id, b);
        assert_eq!(manager.get_order(&o).unwrap().vehicle_id, Some(b));
    }

    #[test]
    fn test_order_update_resyncs_assignment() {
        let (mut manager, _, _) = setup();
        let o = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);
        let id = manager.assign(&[o]).unwrap();

        let mut update = manager.get_order(&o).unwrap().clone();
        update.moves[0].quantity = 4.0;
        update.unlink();
        manager.upsert_order(update).unwrap();

        let assignment = manager.get_assignment(&id).unwrap();
        assert_eq!(assignment.total_weight, 400.0);
        assert_eq!(assignment.product_lines[0].quantity, 4.0);
        // links are engine-owned and survive the update
        assert_eq!(manager.get_order(&o).unwrap().assignment_id, Some(id));
    }

    #[test]
    fn test_order_update_over_capacity_is_rejected() {
        let (mut manager, _, _) = setup();
        let o = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);
        let id = manager.assign(&[o]).unwrap();

        let mut update = manager.get_order(&o).unwrap().clone();
        update.moves[0].quantity = 6.0;

        assert!(matches!(
            manager.upsert_order(update),
            Err(AssignmentError::CapacityExceeded { .. })
        ));
        assert_eq!(manager.get_order(&o).unwrap().moves[0].quantity, 1.0);
        assert_eq!(manager.get_assignment(&id).unwrap().total_weight, 100.0);
    }

    #[test]
    fn test_vehicle_capacity_update_respects_open_assignments() {
        let (mut manager, a, _) = setup();
        let o = delivery(&mut manager, "WH/OUT/00001", 400.0, 0.0);
        let id = manager.assign(&[o]).unwrap();

        let mut shrunk = manager.vehicle(&a).unwrap().clone();
        shrunk.category = Some(VehicleCategory::new("Tiny", 300.0, 1.0));
        assert!(manager.register_vehicle(shrunk).is_err());

        let mut grown = manager.vehicle(&a).unwrap().clone();
        grown.category = Some(VehicleCategory::new("Bigger", 800.0, 4.0));
        manager.register_vehicle(grown).unwrap();
        assert!((manager.get_assignment(&id).unwrap().weight_utilization - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_delete_assignment_frees_orders() {
        let (mut manager, a, _) = setup();
        let o = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);
        let id = manager.assign(&[o]).unwrap();

        manager.delete_assignment(&id).unwrap();

        assert!(manager.get_assignment(&id).is_none());
        assert!(!manager.get_order(&o).unwrap().is_assigned());
        assert_eq!(manager.vehicle(&a).unwrap().availability, VehicleAvailability::Available);
        assert!(matches!(
            manager.delete_assignment(&id),
            Err(AssignmentError::AssignmentNotFound(_))
        ));
    }

    #[test]
    fn test_manual_assignment_starts_in_draft() {
        let (mut manager, a, _) = setup();
        let o = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);
        let id = manager.create_assignment(&a, Some("Morning run".to_string())).unwrap();

        manager.add_order(&id, &o).unwrap();
        let assignment = manager.get_assignment(&id).unwrap();
        assert_eq!(assignment.state, AssignmentState::Draft);
        assert_eq!(assignment.notes.as_deref(), Some("Morning run"));
        assert_eq!(manager.vehicle(&a).unwrap().availability, VehicleAvailability::Available);

        manager.set_assigned(&id).unwrap();
        assert_eq!(manager.vehicle(&a).unwrap().availability, VehicleAvailability::Reserved);
    }

    #[test]
    fn test_shared_vehicle_stays_reserved_while_held() {
        let mut fleet = FleetRegistry::new();
        let only = fleet.register(vehicle("Only", 1000.0, 0.0));
        let mut manager = manager_with(fleet);
        let o1 = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);
        let o2 = delivery(&mut manager, "WH/OUT/00002", 100.0, 0.0);
        let first = manager.assign(&[o1]).unwrap();
        manager.assign(&[o2]).unwrap();

        manager.set_cancel(&first).unwrap();
        assert_eq!(manager.vehicle(&only).unwrap().availability, VehicleAvailability::Reserved);
    }

    #[test]
    fn test_shared_vehicle_availability_follows_holders() {
        let mut fleet = FleetRegistry::new();
        let only = fleet.register(vehicle("Only", 1000.0, 0.0));
        let mut manager = manager_with(fleet);
        let o1 = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);
        let o2 = delivery(&mut manager, "WH/OUT/00002", 100.0, 0.0);
        let o3 = delivery(&mut manager, "WH/OUT/00003", 100.0, 0.0);
        let availability = |m: &AssignmentManager| m.vehicle(&only).unwrap().availability;

        let x = manager.assign(&[o1]).unwrap();
        let y = manager.assign(&[o2]).unwrap();
        assert_eq!(availability(&manager), VehicleAvailability::Reserved);

        manager.set_in_transit(&x).unwrap();
        assert_eq!(availability(&manager), VehicleAvailability::InUse);

        manager.set_done(&x).unwrap();
        assert_eq!(availability(&manager), VehicleAvailability::Reserved);

        manager.set_in_transit(&y).unwrap();
        let z = manager.assign(&[o3]).unwrap();
        assert_eq!(availability(&manager), VehicleAvailability::InUse);

        manager.set_done(&y).unwrap();
        assert_eq!(availability(&manager), VehicleAvailability::Reserved);

        manager.set_cancel(&z).unwrap();
        assert_eq!(availability(&manager), VehicleAvailability::Available);
    }

    #[test]
    fn test_cancelled_orders_can_be_planned_again() {
        let (mut manager, _, b) = setup();
        let o = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);
        let first = manager.assign(&[o]).unwrap();

        manager.set_cancel(&first).unwrap();

        assert!(!manager.get_order(&o).unwrap().is_assigned());
        let cancelled = manager.get_assignment(&first).unwrap();
        assert_eq!(cancelled.state, AssignmentState::Cancelled);
        assert_eq!(cancelled.delivery_count, 1);

        let second = manager.assign(&[o]).unwrap();
        assert_eq!(manager.get_assignment(&second).unwrap().name, "VA/00002");
        assert_eq!(manager.get_order(&o).unwrap().assignment_id, Some(second));

        // the cancelled record still lists the order but no longer owns it
        manager.unassign(&[o]).unwrap();
        let draft = manager.create_assignment(&b, None).unwrap();
        manager.add_order(&draft, &o).unwrap();
        assert_eq!(manager.get_order(&o).unwrap().assignment_id, Some(draft));
    }

    #[test]
    fn test_order_update_leaves_closed_assignment_alone() {
        let (mut manager, _, _) = setup();
        let o = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);
        let id = manager.assign(&[o]).unwrap();
        manager.set_in_transit(&id).unwrap();
        manager.set_done(&id).unwrap();

        let mut update = manager.get_order(&o).unwrap().clone();
        update.moves[0].quantity = 5.0;
        manager.upsert_order(update.clone()).unwrap();

        update.moves[0].quantity = 50.0;
        manager.upsert_order(update).unwrap();

        let done = manager.get_assignment(&id).unwrap();
        assert_eq!(done.total_weight, 100.0);
        assert_eq!(done.product_lines[0].quantity, 1.0);
        assert_eq!(manager.get_order(&o).unwrap().moves[0].quantity, 50.0);
    }

    #[test]
    fn test_non_finite_quantity_is_rejected() {
        let (mut manager, _, _) = setup();
        for quantity in [f64::NAN, f64::INFINITY, -1.0] {
            let mut order = DeliveryOrder::new("WH/OUT/00001", "Acme Corp", Utc::now());
            order.add_move(StockMove::new(Product::new("Goods", 10.0, 0.0), quantity));

            assert!(matches!(manager.upsert_order(order), Err(AssignmentError::InvalidOrder(_))));
        }
    }

    #[test]
    fn test_failed_assignment_does_not_consume_reference() {
        let (mut manager, _, _) = setup();
        let heavy = delivery(&mut manager, "WH/OUT/00001", 5000.0, 0.0);
        let light = delivery(&mut manager, "WH/OUT/00002", 100.0, 0.0);

        assert!(manager.assign(&[heavy]).is_err());
        let id = manager.assign(&[light]).unwrap();

        assert_eq!(manager.get_assignment(&id).unwrap().name, "VA/00001");
        assert_eq!(manager.journal(&id)[0].assignment_name, "VA/00001");
    }

    #[test]
    fn test_availability_tracking_is_optional() {
        let mut fleet = FleetRegistry::without_availability_tracking();
        let van = fleet.register(vehicle("Van", 500.0, 2.0));
        let mut manager = manager_with(fleet);
        let o = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);

        let id = manager.assign(&[o]).unwrap();
        manager.set_in_transit(&id).unwrap();

        assert_eq!(manager.vehicle(&van).unwrap().availability, VehicleAvailability::Available);
    }

    #[test]
    fn test_list_is_newest_first() {
        let (mut manager, _, _) = setup();
        let o1 = delivery(&mut manager, "WH/OUT/00001", 100.0, 0.0);
        let o2 = delivery(&mut manager, "WH/OUT/00002", 100.0, 0.0);
        manager.assign(&[o1]).unwrap();
        manager.assign(&[o2]).unwrap();

        let names: Vec<&str> = manager.list_assignments().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["VA/00002", "VA/00001"]);
    }
}
