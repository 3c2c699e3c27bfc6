use fleet_shared::AuditEntry;
use uuid::Uuid;

/// Append-only audit trail the engine posts to after every state change.
///
/// The surrounding record system owns storage and rendering; the engine only
/// appends and reads back what was appended for a given assignment.
pub trait EventLog: Send {
    fn append(&mut self, entry: AuditEntry) -> crate::CoreResult<()>;

    fn entries_for(&self, assignment_id: &Uuid) -> Vec<AuditEntry>;
}
