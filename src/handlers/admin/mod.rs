pub mod teams;
pub mod users;

use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    pub customer_id: Option<Uuid>,
}
