//! Store traits.
//!
//! Every read and write the access core performs goes through these traits, so
//! handlers and services receive a store handle instead of reaching for a
//! global client. `PgStore` backs them with PostgreSQL, `MemoryStore` with
//! in-process maps for tests.
//!
//! Each call is an independent, failable round trip. Two calls made during one
//! logical operation do not observe a shared snapshot.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::*;

pub type StoreResult<T> = Result<T, DatabaseError>;

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn is_superadmin(&self, user_id: Uuid) -> StoreResult<bool>;
    /// Email-keyed lookup against rows written by the old registry.
    async fn is_superadmin_by_email(&self, email: &str) -> StoreResult<bool>;
    async fn memberships_for_user(&self, user_id: Uuid) -> StoreResult<Vec<MembershipRow>>;
    async fn legacy_membership(&self, user_id: Uuid) -> StoreResult<Option<LegacyMembership>>;
    async fn customers_in_organization(&self, organization_id: Uuid) -> StoreResult<Vec<Uuid>>;
    async fn get_customer(&self, customer_id: Uuid) -> StoreResult<Option<Customer>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserProfile>>;
}

#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn list_teams(&self, customer_id: Uuid) -> StoreResult<Vec<TeamSummary>>;
    async fn get_team(&self, customer_id: Uuid, team_id: Uuid) -> StoreResult<Option<Team>>;
    /// Fails with `UniqueViolation` when the customer already has a team of that name.
    async fn insert_team(&self, team: NewTeam) -> StoreResult<Team>;
    /// Returns false when no team matched.
    async fn update_team(&self, customer_id: Uuid, team_id: Uuid, update: TeamUpdate) -> StoreResult<bool>;
    /// Clears the default flag on every team of the customer except `keep`.
    async fn clear_default_team(&self, customer_id: Uuid, keep: Uuid) -> StoreResult<()>;
    async fn count_team_members(&self, team_id: Uuid) -> StoreResult<i64>;
    async fn delete_team(&self, customer_id: Uuid, team_id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait MemberStore: Send + Sync {
    /// Active customer-scoped members with their profile email and team name.
    async fn list_members(&self, customer_id: Uuid) -> StoreResult<Vec<MemberEntry>>;
    async fn list_pending_invites(&self, customer_id: Uuid) -> StoreResult<Vec<Invite>>;
    async fn count_active_members(&self, customer_id: Uuid) -> StoreResult<i64>;
    async fn customer_membership(&self, customer_id: Uuid, user_id: Uuid) -> StoreResult<Option<MembershipRow>>;
    async fn insert_membership(&self, membership: NewMembership) -> StoreResult<MembershipRow>;
    async fn update_membership(&self, customer_id: Uuid, user_id: Uuid, update: MembershipUpdate) -> StoreResult<bool>;
    async fn delete_membership(&self, customer_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
    async fn find_pending_invite(&self, customer_id: Uuid, email: &str) -> StoreResult<Option<Invite>>;
    async fn set_invite_status(&self, invite_id: Uuid, status: InviteStatus) -> StoreResult<()>;
    /// Fails with `UniqueViolation` when a pending invite exists for the same customer and email.
    async fn insert_invite(&self, invite: NewInvite) -> StoreResult<Invite>;
    async fn delete_invite(&self, customer_id: Uuid, invite_id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Soft-deleted sessions are never returned.
    async fn get_session(&self, session_id: Uuid) -> StoreResult<Option<ChatSession>>;
    /// Excludes soft-deleted and suspicious sessions, newest activity first.
    async fn list_sessions(&self, filter: SessionFilter) -> StoreResult<Vec<SessionListItem>>;
    async fn mark_read(&self, session_id: Uuid, reader: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
    async fn mark_unread(&self, session_id: Uuid) -> StoreResult<()>;
    /// Flips every unread session in scope to read. Returns the number of rows changed.
    async fn mark_all_read(&self, customer_ids: Option<Vec<Uuid>>, reader: Uuid, at: DateTime<Utc>) -> StoreResult<u64>;
    async fn update_assignment(&self, session_id: Uuid, assignment: Assignment) -> StoreResult<()>;
    async fn insert_escalation(&self, escalation: NewEscalation) -> StoreResult<Escalation>;
    async fn list_escalations(&self, session_id: Uuid) -> StoreResult<Vec<Escalation>>;
    async fn soft_delete_session(&self, session_id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
    async fn hard_delete_session(&self, session_id: Uuid) -> StoreResult<()>;
    /// Oldest first.
    async fn list_messages(&self, session_id: Uuid) -> StoreResult<Vec<ChatMessage>>;
    async fn insert_message(&self, message: NewMessage) -> StoreResult<ChatMessage>;
    /// Clears `needs_human` and bumps `updated_at` after a staff reply.
    async fn touch_after_reply(&self, session_id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
    async fn mark_notifications_handled(&self, session_id: Uuid) -> StoreResult<u64>;
}

#[async_trait]
pub trait PushStore: Send + Sync {
    /// Inserts or refreshes the subscription keyed by `(user_id, endpoint)`.
    async fn upsert_subscription(&self, subscription: NewSubscription) -> StoreResult<()>;
    async fn delete_subscription(&self, user_id: Uuid, endpoint: &str) -> StoreResult<bool>;
    async fn subscriptions_for_user(&self, user_id: Uuid) -> StoreResult<Vec<PushSubscription>>;
    async fn subscriptions_for_customer(&self, customer_id: Uuid) -> StoreResult<Vec<PushSubscription>>;
    async fn delete_subscriptions_by_endpoint(&self, endpoint: &str) -> StoreResult<u64>;
}

/// Everything the API needs from the backing store.
#[async_trait]
pub trait Store: IdentityStore + TeamStore + MemberStore + SessionStore + PushStore {
    async fn ping(&self) -> StoreResult<()>;
}
