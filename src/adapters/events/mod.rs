//! Event bus adapters.
//!
//! - `InMemoryEventBus` - In-process bus with bounded retention

mod in_memory;

pub use in_memory::{InMemoryEventBus, DEFAULT_RETENTION};
