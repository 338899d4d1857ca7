use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::access::Plan;

/// A tenant. Sessions, teams and customer-scoped memberships belong to exactly one customer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub plan: Option<String>,
    pub logo_url: Option<String>,
    pub organization_id: Option<Uuid>,
}

impl Customer {
    pub fn plan(&self) -> Plan {
        Plan::from_column(self.plan.as_deref())
    }
}

