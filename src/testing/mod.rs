//! Fakes for driving services and the router without PostgreSQL or network access.

mod memory_store;
mod recorders;

pub use memory_store::MemoryStore;
pub use recorders::{RecordingMailer, RecordingPushTransport};
