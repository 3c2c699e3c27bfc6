/// Source of human readable assignment references (e.g. `VA/00042`)
pub trait ReferenceSequence: Send {
    /// Reserve the next reference. Each call yields a new value.
    fn next_reference(&mut self) -> crate::CoreResult<String>;
}
