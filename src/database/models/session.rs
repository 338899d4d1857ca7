use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A guest conversation handled by the chatbot and, when escalated, by staff.
///
/// Read state, assignment and lifecycle are independent fields rather than one
/// state enum: a session can be unread, assigned to a team and ended at once.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatSession {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub status: String,
    pub needs_human: bool,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub read_by: Option<Uuid>,
    pub assigned_user_id: Option<Uuid>,
    pub assigned_team_id: Option<Uuid>,
    pub escalation_level: i32,
    pub is_suspicious: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn is_assigned(&self) -> bool {
        self.assigned_user_id.is_some() || self.assigned_team_id.is_some()
    }
}

/// Session row joined with its customer's name for dashboard listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub session: ChatSession,
    pub customer_name: Option<String>,
}

/// Which sessions a listing or bulk update may touch. `None` means every customer.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub customer_ids: Option<Vec<Uuid>>,
    pub limit: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Bot,
    Human,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::Bot => "bot",
            SenderType::Human => "human",
        }
    }
}

/// Append-only chat message.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: String,
    pub sender_type: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub session_id: Uuid,
    pub role: MessageRole,
    pub sender_type: SenderType,
    pub content: String,
}

/// Append-only audit entry, one per assignment change.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Escalation {
    pub id: Uuid,
    pub session_id: Uuid,
    pub from_user_id: Option<Uuid>,
    pub from_team_id: Option<Uuid>,
    pub to_user_id: Option<Uuid>,
    pub to_team_id: Option<Uuid>,
    pub reason: Option<String>,
    pub note: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEscalation {
    pub session_id: Uuid,
    pub from_user_id: Option<Uuid>,
    pub from_team_id: Option<Uuid>,
    pub to_user_id: Option<Uuid>,
    pub to_team_id: Option<Uuid>,
    pub reason: Option<String>,
    pub note: Option<String>,
    pub created_by: Uuid,
}

/// New assignment written onto the session row.
#[derive(Debug, Clone, Copy)]
pub struct Assignment {
    pub user_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub escalation_level: i32,
}
