//! Access core: who a principal is, and what it may do.

pub mod error;
pub mod guard;
pub mod identity;
pub mod role;

pub use error::{AccessError, AccessResult};
pub use identity::{resolve, CustomerScope, Identity};
pub use role::{Plan, Role, UnknownRole};
