//! Best-effort persistence of generation results.
//!
//! Stores never hold credentials: records carry the sanitized repository URL
//! only. Callers log store failures and carry on.

pub mod store;

pub use store::{GenerationRecord, JsonlRecordStore, MemoryRecordStore, NullRecordStore, RecordStore};
