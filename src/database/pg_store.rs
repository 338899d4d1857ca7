use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::manager::DatabaseManager;
use super::models::*;
use super::store::{IdentityStore, MemberStore, PushStore, SessionStore, Store, StoreResult, TeamStore};

const SESSION_COLUMNS: &str = r#"
    s.id, s.customer_id, s.guest_name, s.guest_email, s.guest_phone, s.status,
    s.needs_human, s.is_read, s.read_at, s.read_by, s.assigned_user_id,
    s.assigned_team_id, s.escalation_level, s.is_suspicious, s.deleted_at,
    s.created_at, s.updated_at
"#;

const INVITE_COLUMNS: &str = r#"
    id, customer_id, email, role, team_id, token_hash, status, invited_by, expires_at, created_at
"#;

const MEMBERSHIP_COLUMNS: &str = r#"
    id, user_id, organization_id, customer_id, role, team_id, status, created_at
"#;

/// PostgreSQL-backed store built on one shared pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn is_superadmin(&self, user_id: Uuid) -> StoreResult<bool> {
        let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM superadmins WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn is_superadmin_by_email(&self, email: &str) -> StoreResult<bool> {
        let found: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM superadmins WHERE lower(email) = lower($1) LIMIT 1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    async fn memberships_for_user(&self, user_id: Uuid) -> StoreResult<Vec<MembershipRow>> {
        let sql = format!(
            "SELECT {} FROM memberships WHERE user_id = $1 AND status = 'active' ORDER BY created_at",
            MEMBERSHIP_COLUMNS
        );
        let rows = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn legacy_membership(&self, user_id: Uuid) -> StoreResult<Option<LegacyMembership>> {
        let row = sqlx::query_as::<_, LegacyMembership>(
            "SELECT user_id, customer_id, role FROM dashboard_users WHERE user_id = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn customers_in_organization(&self, organization_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let ids: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM customers WHERE organization_id = $1")
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn get_customer(&self, customer_id: Uuid) -> StoreResult<Option<Customer>> {
        let row = sqlx::query_as::<_, Customer>(
            "SELECT id, name, slug, plan, logo_url, organization_id FROM customers WHERE id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserProfile>(
            "SELECT user_id, email FROM user_profiles WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl TeamStore for PgStore {
    async fn list_teams(&self, customer_id: Uuid) -> StoreResult<Vec<TeamSummary>> {
        let rows = sqlx::query_as::<_, TeamSummary>(
            r#"
            SELECT t.id, t.name, t.description, t.is_default, t.created_at,
                   COUNT(m.id) AS member_count
            FROM teams t
            LEFT JOIN memberships m ON m.team_id = t.id
            WHERE t.customer_id = $1
            GROUP BY t.id
            ORDER BY t.name
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_team(&self, customer_id: Uuid, team_id: Uuid) -> StoreResult<Option<Team>> {
        let row = sqlx::query_as::<_, Team>(
            r#"
            SELECT id, customer_id, name, description, is_default, created_at
            FROM teams WHERE id = $1 AND customer_id = $2
            "#,
        )
        .bind(team_id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_team(&self, team: NewTeam) -> StoreResult<Team> {
        let row = sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (customer_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id, customer_id, name, description, is_default, created_at
            "#,
        )
        .bind(team.customer_id)
        .bind(&team.name)
        .bind(&team.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_team(&self, customer_id: Uuid, team_id: Uuid, update: TeamUpdate) -> StoreResult<bool> {
        let (set_description, description) = match update.description {
            Some(d) => (true, d),
            None => (false, None),
        };
        let result = sqlx::query(
            r#"
            UPDATE teams SET
                name = COALESCE($3, name),
                description = CASE WHEN $4 THEN $5 ELSE description END,
                is_default = COALESCE($6, is_default)
            WHERE id = $2 AND customer_id = $1
            "#,
        )
        .bind(customer_id)
        .bind(team_id)
        .bind(update.name)
        .bind(set_description)
        .bind(description)
        .bind(update.is_default)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_default_team(&self, customer_id: Uuid, keep: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE teams SET is_default = false WHERE customer_id = $1 AND id <> $2 AND is_default")
            .bind(customer_id)
            .bind(keep)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_team_members(&self, team_id: Uuid) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM memberships WHERE team_id = $1")
            .bind(team_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete_team(&self, customer_id: Uuid, team_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1 AND customer_id = $2")
            .bind(team_id)
            .bind(customer_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl MemberStore for PgStore {
    async fn list_members(&self, customer_id: Uuid) -> StoreResult<Vec<MemberEntry>> {
        let rows = sqlx::query_as::<_, MemberEntry>(
            r#"
            SELECT m.user_id, p.email, m.role, m.team_id, t.name AS team_name,
                   m.status, m.created_at, false AS is_invite
            FROM memberships m
            LEFT JOIN user_profiles p ON p.user_id = m.user_id
            LEFT JOIN teams t ON t.id = m.team_id
            WHERE m.customer_id = $1 AND m.status = 'active'
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_pending_invites(&self, customer_id: Uuid) -> StoreResult<Vec<Invite>> {
        let sql = format!(
            "SELECT {} FROM user_invites WHERE customer_id = $1 AND status = 'pending' ORDER BY created_at",
            INVITE_COLUMNS
        );
        let rows = sqlx::query_as::<_, Invite>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count_active_members(&self, customer_id: Uuid) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM memberships WHERE customer_id = $1 AND status = 'active'",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn customer_membership(&self, customer_id: Uuid, user_id: Uuid) -> StoreResult<Option<MembershipRow>> {
        let sql = format!(
            "SELECT {} FROM memberships WHERE customer_id = $1 AND user_id = $2",
            MEMBERSHIP_COLUMNS
        );
        let row = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(customer_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_membership(&self, membership: NewMembership) -> StoreResult<MembershipRow> {
        let sql = format!(
            r#"
            INSERT INTO memberships (user_id, customer_id, role, team_id, status)
            VALUES ($1, $2, $3, $4, 'active')
            RETURNING {}
            "#,
            MEMBERSHIP_COLUMNS
        );
        let row = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(membership.user_id)
            .bind(membership.customer_id)
            .bind(membership.role.as_str())
            .bind(membership.team_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_membership(&self, customer_id: Uuid, user_id: Uuid, update: MembershipUpdate) -> StoreResult<bool> {
        let (set_team, team_id) = match update.team_id {
            Some(t) => (true, t),
            None => (false, None),
        };
        let result = sqlx::query(
            r#"
            UPDATE memberships SET
                role = COALESCE($3, role),
                team_id = CASE WHEN $4 THEN $5 ELSE team_id END
            WHERE customer_id = $1 AND user_id = $2
            "#,
        )
        .bind(customer_id)
        .bind(user_id)
        .bind(update.role.map(|r| r.as_str()))
        .bind(set_team)
        .bind(team_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_membership(&self, customer_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM memberships WHERE customer_id = $1 AND user_id = $2")
            .bind(customer_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_pending_invite(&self, customer_id: Uuid, email: &str) -> StoreResult<Option<Invite>> {
        let sql = format!(
            "SELECT {} FROM user_invites WHERE customer_id = $1 AND email = $2 AND status = 'pending'",
            INVITE_COLUMNS
        );
        let row = sqlx::query_as::<_, Invite>(&sql)
            .bind(customer_id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn set_invite_status(&self, invite_id: Uuid, status: InviteStatus) -> StoreResult<()> {
        sqlx::query("UPDATE user_invites SET status = $2 WHERE id = $1")
            .bind(invite_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_invite(&self, invite: NewInvite) -> StoreResult<Invite> {
        let sql = format!(
            r#"
            INSERT INTO user_invites (customer_id, email, role, team_id, token_hash, status, invited_by, expires_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7)
            RETURNING {}
            "#,
            INVITE_COLUMNS
        );
        let row = sqlx::query_as::<_, Invite>(&sql)
            .bind(invite.customer_id)
            .bind(&invite.email)
            .bind(&invite.role)
            .bind(invite.team_id)
            .bind(&invite.token_hash)
            .bind(invite.invited_by)
            .bind(invite.expires_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_invite(&self, customer_id: Uuid, invite_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM user_invites WHERE id = $1 AND customer_id = $2")
            .bind(invite_id)
            .bind(customer_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn get_session(&self, session_id: Uuid) -> StoreResult<Option<ChatSession>> {
        let sql = format!(
            "SELECT {} FROM chat_sessions s WHERE s.id = $1 AND s.deleted_at IS NULL",
            SESSION_COLUMNS
        );
        let row = sqlx::query_as::<_, ChatSession>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_sessions(&self, filter: SessionFilter) -> StoreResult<Vec<SessionListItem>> {
        let sql = format!(
            r#"
            SELECT {}, c.name AS customer_name
            FROM chat_sessions s
            LEFT JOIN customers c ON c.id = s.customer_id
            WHERE s.deleted_at IS NULL
              AND NOT s.is_suspicious
              AND ($1::uuid[] IS NULL OR s.customer_id = ANY($1))
            ORDER BY s.updated_at DESC
            LIMIT $2
            "#,
            SESSION_COLUMNS
        );
        let rows = sqlx::query_as::<_, SessionListItem>(&sql)
            .bind(filter.customer_ids)
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn mark_read(&self, session_id: Uuid, reader: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE chat_sessions SET is_read = true, read_at = $2, read_by = $3 WHERE id = $1")
            .bind(session_id)
            .bind(at)
            .bind(reader)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_unread(&self, session_id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE chat_sessions SET is_read = false, read_at = NULL, read_by = NULL WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_all_read(&self, customer_ids: Option<Vec<Uuid>>, reader: Uuid, at: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE chat_sessions SET is_read = true, read_at = $2, read_by = $3
            WHERE NOT is_read
              AND deleted_at IS NULL
              AND ($1::uuid[] IS NULL OR customer_id = ANY($1))
            "#,
        )
        .bind(customer_ids)
        .bind(at)
        .bind(reader)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn update_assignment(&self, session_id: Uuid, assignment: Assignment) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE chat_sessions
            SET assigned_user_id = $2, assigned_team_id = $3, escalation_level = $4
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .bind(assignment.user_id)
        .bind(assignment.team_id)
        .bind(assignment.escalation_level)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_escalation(&self, escalation: NewEscalation) -> StoreResult<Escalation> {
        let row = sqlx::query_as::<_, Escalation>(
            r#"
            INSERT INTO session_escalations
                (session_id, from_user_id, from_team_id, to_user_id, to_team_id, reason, note, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, session_id, from_user_id, from_team_id, to_user_id, to_team_id,
                      reason, note, created_by, created_at
            "#,
        )
        .bind(escalation.session_id)
        .bind(escalation.from_user_id)
        .bind(escalation.from_team_id)
        .bind(escalation.to_user_id)
        .bind(escalation.to_team_id)
        .bind(&escalation.reason)
        .bind(&escalation.note)
        .bind(escalation.created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_escalations(&self, session_id: Uuid) -> StoreResult<Vec<Escalation>> {
        let rows = sqlx::query_as::<_, Escalation>(
            r#"
            SELECT id, session_id, from_user_id, from_team_id, to_user_id, to_team_id,
                   reason, note, created_by, created_at
            FROM session_escalations WHERE session_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn soft_delete_session(&self, session_id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE chat_sessions SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL")
            .bind(session_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn hard_delete_session(&self, session_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM chat_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_messages(&self, session_id: Uuid) -> StoreResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, session_id, role, sender_type, content, created_at
            FROM chat_messages WHERE session_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_message(&self, message: NewMessage) -> StoreResult<ChatMessage> {
        let row = sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO chat_messages (session_id, role, sender_type, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, session_id, role, sender_type, content, created_at
            "#,
        )
        .bind(message.session_id)
        .bind(message.role.as_str())
        .bind(message.sender_type.as_str())
        .bind(&message.content)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn touch_after_reply(&self, session_id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE chat_sessions SET needs_human = false, updated_at = $2 WHERE id = $1")
            .bind(session_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_notifications_handled(&self, session_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'handled' WHERE session_id = $1 AND status <> 'handled'",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PushStore for PgStore {
    async fn upsert_subscription(&self, subscription: NewSubscription) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO push_subscriptions (user_id, customer_id, endpoint, p256dh, auth, updated_at)
            VALUES ($1, $2, $3, $4, $5, now())
            ON CONFLICT (user_id, endpoint) DO UPDATE SET
                customer_id = EXCLUDED.customer_id,
                p256dh = EXCLUDED.p256dh,
                auth = EXCLUDED.auth,
                updated_at = now()
            "#,
        )
        .bind(subscription.user_id)
        .bind(subscription.customer_id)
        .bind(&subscription.endpoint)
        .bind(&subscription.p256dh)
        .bind(&subscription.auth)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_subscription(&self, user_id: Uuid, endpoint: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE user_id = $1 AND endpoint = $2")
            .bind(user_id)
            .bind(endpoint)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn subscriptions_for_user(&self, user_id: Uuid) -> StoreResult<Vec<PushSubscription>> {
        let rows = sqlx::query_as::<_, PushSubscription>(
            "SELECT id, user_id, customer_id, endpoint, p256dh, auth, updated_at FROM push_subscriptions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn subscriptions_for_customer(&self, customer_id: Uuid) -> StoreResult<Vec<PushSubscription>> {
        let rows = sqlx::query_as::<_, PushSubscription>(
            "SELECT id, user_id, customer_id, endpoint, p256dh, auth, updated_at FROM push_subscriptions WHERE customer_id = $1",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_subscriptions_by_endpoint(&self, endpoint: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE endpoint = $1")
            .bind(endpoint)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        DatabaseManager::health_check(&self.pool).await
    }
}
