use fleet_core::{CoreError, CoreResult, EventLog};
use fleet_shared::AuditEntry;
use tracing::debug;
use uuid::Uuid;

/// In-process audit trail
#[derive(Debug, Default)]
pub struct MemoryJournal {
    entries: Vec<AuditEntry>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EventLog for MemoryJournal {
    fn append(&mut self, entry: AuditEntry) -> CoreResult<()> {
        if entry.assignment_id.is_nil() {
            return Err(CoreError::ValidationError(format!(
                "audit entry {} has no assignment",
                entry.id
            )));
        }
        debug!("[{}] {}", entry.assignment_name, entry.event.subject());
        self.entries.push(entry);
        Ok(())
    }

    fn entries_for(&self, assignment_id: &Uuid) -> Vec<AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.assignment_id == *assignment_id)
            .cloned()
            .collect()
    }
}
