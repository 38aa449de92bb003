//! Domain layer: the record abstraction and an in-memory record graph.

pub mod error;
pub mod memory;
pub mod record;

pub use error::DomainError;
pub use memory::{MemoryRecord, RecordData, RecordStore};
pub use record::{BuiltinProperty, FieldItem, Record};
