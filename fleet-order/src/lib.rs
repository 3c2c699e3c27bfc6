pub mod models;
pub mod error;
pub mod matcher;
pub mod capacity;
pub mod changes;
pub mod manager;

pub use models::{
    Assignment, AssignmentPicking, AssignmentProduct, AssignmentState, DeliveryOrder,
    FulfillmentState, StockMove,
};
pub use error::{AssignmentConflict, AssignmentError};
pub use matcher::{CapacityMatcher, LoadDemand, MatchPlan};
pub use capacity::{CapacityViolation, Dimension};
pub use changes::ChangeHandler;
pub use manager::{AssignmentManager, UnassignSummary};
