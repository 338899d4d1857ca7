pub mod manager;
pub mod models;
pub mod pg_store;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use pg_store::PgStore;
pub use store::{IdentityStore, MemberStore, PushStore, SessionStore, Store, StoreResult, TeamStore};
