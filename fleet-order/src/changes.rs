use tracing::debug;
use uuid::Uuid;

use fleet_catalog::Vehicle;

use crate::capacity::check_capacity;
use crate::error::AssignmentError;
use crate::models::{Assignment, AssignmentPicking, AssignmentProduct, DeliveryOrder};

/// Structural changes to an assignment's membership and vehicle.
///
/// All functions work on the assignment value they are given; the manager
/// applies them to a working copy and only stores it once `validate` passes.
pub struct ChangeHandler;

impl ChangeHandler {
    /// Add `order` to the assignment and materialize its product lines.
    ///
    /// Returns the number of product lines created. Lines already present for
    /// the same order and stock move are skipped.
    pub fn attach_order(assignment: &mut Assignment, order: &DeliveryOrder) -> usize {
        if !assignment.contains_order(&order.id) {
            assignment.pickings.push(AssignmentPicking::from_order(order));
        }

        let created = Self::materialize_lines(assignment, order);
        assignment.recompute();
        created
    }

    /// Drop the order and its product lines. Returns whether it was a member.
    pub fn detach_order(assignment: &mut Assignment, order_id: &Uuid) -> bool {
        let before = assignment.pickings.len();
        assignment.pickings.retain(|p| p.picking_id != *order_id);
        assignment.product_lines.retain(|l| l.picking_id != *order_id);
        assignment.recompute();
        assignment.pickings.len() != before
    }

    /// Re-read the figures of an order that changed upstream
    pub fn refresh_order(assignment: &mut Assignment, order: &DeliveryOrder) {
        let Some(picking) = assignment.pickings.iter_mut().find(|p| p.picking_id == order.id) else {
            return;
        };
        let id = picking.id;
        *picking = AssignmentPicking { id, ..AssignmentPicking::from_order(order) };

        assignment.product_lines.retain(|l| l.picking_id != order.id);
        Self::materialize_lines(assignment, order);
        assignment.recompute();
    }

    /// Point the assignment at `vehicle`, refreshing capacity and utilization
    pub fn swap_vehicle(assignment: &mut Assignment, vehicle: &Vehicle) {
        assignment.set_vehicle(vehicle);
    }

    /// Membership and vehicle changes are closed once the assignment ends
    pub fn ensure_modifiable(assignment: &Assignment) -> Result<(), AssignmentError> {
        if assignment.state.is_terminal() {
            return Err(AssignmentError::NotModifiable(assignment.name.clone()));
        }
        Ok(())
    }

    /// Capacity invariant; run after every structural change
    pub fn validate(assignment: &Assignment) -> Result<(), AssignmentError> {
        check_capacity(assignment).map_err(|violations| AssignmentError::CapacityExceeded {
            assignment: assignment.name.clone(),
            violations,
        })
    }

    fn materialize_lines(assignment: &mut Assignment, order: &DeliveryOrder) -> usize {
        let mut created = 0;
        for stock_move in &order.moves {
            let exists = assignment
                .product_lines
                .iter()
                .any(|l| l.picking_id == order.id && l.move_id == stock_move.id);
            if exists {
                continue;
            }
            if let Some(line) = AssignmentProduct::from_move(order, stock_move) {
                assignment.product_lines.push(line);
                created += 1;
            }
        }

        if created > 0 {
            debug!("{} product line(s) materialized for {} on {}", created, order.name, assignment.name);
            assignment
                .product_lines
                .sort_by(|a, b| a.picking_name.cmp(&b.picking_name));
        }
        created
    }
}
