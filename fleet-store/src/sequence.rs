use fleet_core::{CoreError, CoreResult, ReferenceSequence};

/// Counter-backed references such as `VA/00001`.
///
/// Numbers are never handed out twice, even when the caller later rolls back
/// the operation that reserved one.
#[derive(Debug, Clone)]
pub struct PrefixedSequence {
    prefix: String,
    padding: usize,
    next: u64,
}

impl PrefixedSequence {
    pub fn new(prefix: impl Into<String>, padding: usize) -> Self {
        Self::starting_at(prefix, padding, 1)
    }

    pub fn starting_at(prefix: impl Into<String>, padding: usize, next: u64) -> Self {
        Self {
            prefix: prefix.into(),
            padding,
            next,
        }
    }

    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl Default for PrefixedSequence {
    fn default() -> Self {
        Self::new("VA/", 5)
    }
}

impl ReferenceSequence for PrefixedSequence {
    fn next_reference(&mut self) -> CoreResult<String> {
        let number = self.next;
        self.next = number
            .checked_add(1)
            .ok_or_else(|| CoreError::InternalError(format!("sequence {} exhausted", self.prefix)))?;
        Ok(format!("{}{:0width$}", self.prefix, number, width = self.padding))
    }
}
