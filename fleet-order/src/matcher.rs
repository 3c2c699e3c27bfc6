use serde::Serialize;
use std::cmp::Ordering;

use fleet_catalog::Vehicle;

use crate::capacity::CAPACITY_TOLERANCE;
use crate::error::AssignmentError;
use crate::models::DeliveryOrder;

/// Combined load of a batch of delivery orders
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoadDemand {
    pub weight_kg: f64,
    pub volume_m3: f64,
}

impl LoadDemand {
    pub fn of_orders<'a>(orders: impl IntoIterator<Item = &'a DeliveryOrder>) -> Self {
        orders.into_iter().fold(Self::default(), |acc, order| Self {
            weight_kg: acc.weight_kg + order.total_weight(),
            volume_m3: acc.volume_m3 + order.total_volume(),
        })
    }
}

/// Outcome of a successful match
#[derive(Debug, Clone)]
pub struct MatchPlan<'a> {
    pub vehicle: &'a Vehicle,
    pub demand: LoadDemand,
}

/// Best-fit vehicle selection for a batch of delivery orders
pub struct CapacityMatcher;

impl CapacityMatcher {
    /// Pick the smallest vehicle that can carry all `orders` together.
    ///
    /// Callers reject already-assigned orders first; this only looks at
    /// loads and capacities.
    pub fn plan<'a>(
        orders: &[&DeliveryOrder],
        vehicles: &[&'a Vehicle],
    ) -> Result<MatchPlan<'a>, AssignmentError> {
        if orders.is_empty() {
            return Err(AssignmentError::EmptySelection);
        }

        if let Some(order) = orders.iter().find(|o| o.moves.is_empty()) {
            return Err(AssignmentError::EmptyOrder { order: order.name.clone() });
        }

        let demand = LoadDemand::of_orders(orders.iter().copied());
        if demand.weight_kg <= 0.0 {
            return Err(AssignmentError::ZeroDemand);
        }

        let candidates: Vec<&'a Vehicle> = vehicles
            .iter()
            .copied()
            .filter(|v| v.has_defined_capacity())
            .collect();
        if candidates.is_empty() {
            return Err(AssignmentError::NoVehicleCapacity);
        }

        let mut suitable = Self::eligible(&demand, &candidates);
        if suitable.is_empty() {
            let max_weight_capacity = candidates
                .iter()
                .map(|v| v.capacity().weight_kg)
                .fold(0.0, f64::max);
            return Err(AssignmentError::NoEligibleVehicle {
                orders: orders.iter().map(|o| o.name.clone()).collect(),
                required_weight: demand.weight_kg,
                required_volume: demand.volume_m3,
                max_weight_capacity,
            });
        }

        // stable: equal capacities keep registration order
        suitable.sort_by(|a, b| Self::by_capacity(a, b));

        Ok(MatchPlan {
            vehicle: suitable[0],
            demand,
        })
    }

    /// Vehicles whose capacity covers `demand`.
    ///
    /// Volume only counts when there is volume to carry and the vehicle has a
    /// volume capacity configured.
    pub fn eligible<'a>(demand: &LoadDemand, vehicles: &[&'a Vehicle]) -> Vec<&'a Vehicle> {
        vehicles
            .iter()
            .copied()
            .filter(|v| {
                let capacity = v.capacity();
                if capacity.weight_kg + CAPACITY_TOLERANCE < demand.weight_kg {
                    return false;
                }
                if demand.volume_m3 > 0.0 && capacity.volume_m3 > 0.0 {
                    return capacity.volume_m3 + CAPACITY_TOLERANCE >= demand.volume_m3;
                }
                true
            })
            .collect()
    }

    fn by_capacity(a: &Vehicle, b: &Vehicle) -> Ordering {
        let (ca, cb) = (a.capacity(), b.capacity());
        ca.weight_kg
            .total_cmp(&cb.weight_kg)
            .then(ca.volume_m3.total_cmp(&cb.volume_m3))
    }
}
