pub mod models;

pub use models::events::{AssignmentEvent, AuditEntry};
