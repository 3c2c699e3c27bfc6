pub mod app_config;
pub mod journal;
pub mod sequence;

pub use journal::MemoryJournal;
pub use sequence::PrefixedSequence;
