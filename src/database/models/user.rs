use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Account profile used to look principals up by email.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub email: String,
}
