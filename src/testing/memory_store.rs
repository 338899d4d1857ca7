use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::access::Role;
use crate::database::models::*;
use crate::database::store::{IdentityStore, MemberStore, PushStore, SessionStore, Store, StoreResult, TeamStore};
use crate::database::DatabaseError;

#[derive(Debug, Clone)]
struct SuperadminRow {
    user_id: Option<Uuid>,
    email: Option<String>,
}

#[derive(Debug, Clone)]
struct NotificationRow {
    session_id: Uuid,
    status: String,
}

#[derive(Debug, Default)]
struct State {
    organizations: HashMap<Uuid, String>,
    customers: Vec<Customer>,
    profiles: Vec<UserProfile>,
    superadmins: Vec<SuperadminRow>,
    teams: Vec<Team>,
    memberships: Vec<MembershipRow>,
    legacy: Vec<LegacyMembership>,
    invites: Vec<Invite>,
    sessions: Vec<ChatSession>,
    messages: Vec<ChatMessage>,
    escalations: Vec<Escalation>,
    notifications: Vec<NotificationRow>,
    subscriptions: Vec<PushSubscription>,
    fail_assignment_updates: bool,
    fail_escalation_inserts: bool,
    fail_message_inserts: bool,
    unreachable: bool,
}

/// In-process [`Store`] with the same visibility and uniqueness rules as the
/// PostgreSQL schema. Seeding and inspection helpers live alongside.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

fn injected(what: &str) -> DatabaseError {
    DatabaseError::QueryError(format!("injected {} failure", what))
}

fn in_filter(filter: &Option<Vec<Uuid>>, customer_id: Uuid) -> bool {
    filter.as_ref().map_or(true, |ids| ids.contains(&customer_id))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Seeding

    pub async fn add_organization(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.organizations.insert(id, name.to_string());
        id
    }

    pub async fn add_customer(&self, name: &str, organization_id: Option<Uuid>, plan: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.customers.push(Customer {
            id,
            name: name.to_string(),
            slug: name.to_ascii_lowercase().replace(' ', "-"),
            plan: plan.map(str::to_string),
            logo_url: None,
            organization_id,
        });
        id
    }

    /// Registers an account and returns its user id.
    pub async fn add_user(&self, email: &str) -> Uuid {
        let user_id = Uuid::new_v4();
        self.state.lock().await.profiles.push(UserProfile {
            user_id,
            email: email.to_ascii_lowercase(),
        });
        user_id
    }

    pub async fn add_superadmin(&self, user_id: Option<Uuid>, email: Option<&str>) {
        self.state.lock().await.superadmins.push(SuperadminRow {
            user_id,
            email: email.map(str::to_string),
        });
    }

    pub async fn add_customer_membership(&self, user_id: Uuid, customer_id: Uuid, role: Role, team_id: Option<Uuid>) {
        let mut state = self.state.lock().await;
        let created_at = Utc::now() + Duration::microseconds(state.memberships.len() as i64);
        state.memberships.push(MembershipRow {
            id: Uuid::new_v4(),
            user_id,
            organization_id: None,
            customer_id: Some(customer_id),
            role: role.as_str().to_string(),
            team_id,
            status: "active".to_string(),
            created_at,
        });
    }

    pub async fn add_org_membership(&self, user_id: Uuid, organization_id: Uuid, role: Role) {
        let mut state = self.state.lock().await;
        let created_at = Utc::now() + Duration::microseconds(state.memberships.len() as i64);
        state.memberships.push(MembershipRow {
            id: Uuid::new_v4(),
            user_id,
            organization_id: Some(organization_id),
            customer_id: None,
            role: role.as_str().to_string(),
            team_id: None,
            status: "active".to_string(),
            created_at,
        });
    }

    pub async fn add_legacy_membership(&self, user_id: Uuid, customer_id: Uuid, role: &str) {
        self.state.lock().await.legacy.push(LegacyMembership {
            user_id,
            customer_id,
            role: role.to_string(),
        });
    }

    pub async fn add_team(&self, customer_id: Uuid, name: &str, is_default: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.teams.push(Team {
            id,
            customer_id,
            name: name.to_string(),
            description: None,
            is_default,
            created_at: Utc::now(),
        });
        id
    }

    /// Unread session waiting for a human.
    pub async fn add_session(&self, customer_id: Uuid, guest_email: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let mut state = self.state.lock().await;
        let updated_at = now + Duration::milliseconds(state.sessions.len() as i64);
        state.sessions.push(ChatSession {
            id,
            customer_id,
            guest_name: Some("Guest".to_string()),
            guest_email: guest_email.map(str::to_string),
            guest_phone: None,
            status: "active".to_string(),
            needs_human: true,
            is_read: false,
            read_at: None,
            read_by: None,
            assigned_user_id: None,
            assigned_team_id: None,
            escalation_level: 0,
            is_suspicious: false,
            deleted_at: None,
            created_at: now,
            updated_at,
        });
        id
    }

    pub async fn update_session<F>(&self, session_id: Uuid, f: F)
    where
        F: FnOnce(&mut ChatSession),
    {
        if let Some(s) = self.state.lock().await.sessions.iter_mut().find(|s| s.id == session_id) {
            f(s);
        }
    }

    pub async fn add_pending_notification(&self, session_id: Uuid) {
        self.state.lock().await.notifications.push(NotificationRow {
            session_id,
            status: "pending".to_string(),
        });
    }

    pub async fn set_invite_expiry(&self, invite_id: Uuid, expires_at: DateTime<Utc>) {
        if let Some(i) = self.state.lock().await.invites.iter_mut().find(|i| i.id == invite_id) {
            i.expires_at = expires_at;
        }
    }

    pub async fn add_subscription(&self, user_id: Uuid, customer_id: Option<Uuid>, endpoint: &str) {
        self.state.lock().await.subscriptions.push(PushSubscription {
            id: Uuid::new_v4(),
            user_id,
            customer_id,
            endpoint: endpoint.to_string(),
            p256dh: "p256dh-key".to_string(),
            auth: "auth-secret".to_string(),
            updated_at: Utc::now(),
        });
    }

    pub async fn fail_assignment_updates(&self, fail: bool) {
        self.state.lock().await.fail_assignment_updates = fail;
    }

    pub async fn fail_escalation_inserts(&self, fail: bool) {
        self.state.lock().await.fail_escalation_inserts = fail;
    }

    pub async fn fail_message_inserts(&self, fail: bool) {
        self.state.lock().await.fail_message_inserts = fail;
    }

    /// Makes `ping` fail, as a lost database connection would.
    pub async fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().await.unreachable = unreachable;
    }

    // Inspection

    /// Session row including soft-deleted ones.
    pub async fn session(&self, session_id: Uuid) -> Option<ChatSession> {
        self.state.lock().await.sessions.iter().find(|s| s.id == session_id).cloned()
    }

    pub async fn messages(&self, session_id: Uuid) -> Vec<ChatMessage> {
        self.state
            .lock()
            .await
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect()
    }

    pub async fn escalations(&self, session_id: Uuid) -> Vec<Escalation> {
        self.state
            .lock()
            .await
            .escalations
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect()
    }

    pub async fn notification_statuses(&self, session_id: Uuid) -> Vec<String> {
        self.state
            .lock()
            .await
            .notifications
            .iter()
            .filter(|n| n.session_id == session_id)
            .map(|n| n.status.clone())
            .collect()
    }

    pub async fn teams(&self, customer_id: Uuid) -> Vec<Team> {
        self.state
            .lock()
            .await
            .teams
            .iter()
            .filter(|t| t.customer_id == customer_id)
            .cloned()
            .collect()
    }

    pub async fn invites(&self, customer_id: Uuid) -> Vec<Invite> {
        self.state
            .lock()
            .await
            .invites
            .iter()
            .filter(|i| i.customer_id == customer_id)
            .cloned()
            .collect()
    }

    pub async fn membership(&self, customer_id: Uuid, user_id: Uuid) -> Option<MembershipRow> {
        self.state
            .lock()
            .await
            .memberships
            .iter()
            .find(|m| m.customer_id == Some(customer_id) && m.user_id == user_id)
            .cloned()
    }

    pub async fn subscriptions(&self) -> Vec<PushSubscription> {
        self.state.lock().await.subscriptions.clone()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn is_superadmin(&self, user_id: Uuid) -> StoreResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .superadmins
            .iter()
            .any(|s| s.user_id == Some(user_id)))
    }

    async fn is_superadmin_by_email(&self, email: &str) -> StoreResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .superadmins
            .iter()
            .any(|s| s.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email))))
    }

    async fn memberships_for_user(&self, user_id: Uuid) -> StoreResult<Vec<MembershipRow>> {
        let state = self.state.lock().await;
        let mut rows: Vec<MembershipRow> = state
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id && m.status == "active")
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);
        Ok(rows)
    }

    async fn legacy_membership(&self, user_id: Uuid) -> StoreResult<Option<LegacyMembership>> {
        Ok(self
            .state
            .lock()
            .await
            .legacy
            .iter()
            .find(|l| l.user_id == user_id)
            .cloned())
    }

    async fn customers_in_organization(&self, organization_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(self
            .state
            .lock()
            .await
            .customers
            .iter()
            .filter(|c| c.organization_id == Some(organization_id))
            .map(|c| c.id)
            .collect())
    }

    async fn get_customer(&self, customer_id: Uuid) -> StoreResult<Option<Customer>> {
        Ok(self
            .state
            .lock()
            .await
            .customers
            .iter()
            .find(|c| c.id == customer_id)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self
            .state
            .lock()
            .await
            .profiles
            .iter()
            .find(|p| p.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}

#[async_trait]
impl TeamStore for MemoryStore {
    async fn list_teams(&self, customer_id: Uuid) -> StoreResult<Vec<TeamSummary>> {
        let state = self.state.lock().await;
        let mut teams: Vec<TeamSummary> = state
            .teams
            .iter()
            .filter(|t| t.customer_id == customer_id)
            .map(|t| TeamSummary {
                id: t.id,
                name: t.name.clone(),
                description: t.description.clone(),
                is_default: t.is_default,
                created_at: t.created_at,
                member_count: state.memberships.iter().filter(|m| m.team_id == Some(t.id)).count() as i64,
            })
            .collect();
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(teams)
    }

    async fn get_team(&self, customer_id: Uuid, team_id: Uuid) -> StoreResult<Option<Team>> {
        Ok(self
            .state
            .lock()
            .await
            .teams
            .iter()
            .find(|t| t.id == team_id && t.customer_id == customer_id)
            .cloned())
    }

    async fn insert_team(&self, team: NewTeam) -> StoreResult<Team> {
        let mut state = self.state.lock().await;
        if state
            .teams
            .iter()
            .any(|t| t.customer_id == team.customer_id && t.name == team.name)
        {
            return Err(DatabaseError::UniqueViolation("teams_customer_name_key".to_string()));
        }
        let row = Team {
            id: Uuid::new_v4(),
            customer_id: team.customer_id,
            name: team.name,
            description: team.description,
            is_default: false,
            created_at: Utc::now(),
        };
        state.teams.push(row.clone());
        Ok(row)
    }

    async fn update_team(&self, customer_id: Uuid, team_id: Uuid, update: TeamUpdate) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        if let Some(name) = &update.name {
            if state
                .teams
                .iter()
                .any(|t| t.customer_id == customer_id && t.id != team_id && &t.name == name)
            {
                return Err(DatabaseError::UniqueViolation("teams_customer_name_key".to_string()));
            }
        }
        let Some(team) = state
            .teams
            .iter_mut()
            .find(|t| t.id == team_id && t.customer_id == customer_id)
        else {
            return Ok(false);
        };
        if let Some(name) = update.name {
            team.name = name;
        }
        if let Some(description) = update.description {
            team.description = description;
        }
        if let Some(is_default) = update.is_default {
            team.is_default = is_default;
        }
        Ok(true)
    }

    async fn clear_default_team(&self, customer_id: Uuid, keep: Uuid) -> StoreResult<()> {
        for team in self.state.lock().await.teams.iter_mut() {
            if team.customer_id == customer_id && team.id != keep {
                team.is_default = false;
            }
        }
        Ok(())
    }

    async fn count_team_members(&self, team_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .state
            .lock()
            .await
            .memberships
            .iter()
            .filter(|m| m.team_id == Some(team_id))
            .count() as i64)
    }

    async fn delete_team(&self, customer_id: Uuid, team_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.teams.len();
        state.teams.retain(|t| !(t.id == team_id && t.customer_id == customer_id));
        Ok(state.teams.len() < before)
    }
}

#[async_trait]
impl MemberStore for MemoryStore {
    async fn list_members(&self, customer_id: Uuid) -> StoreResult<Vec<MemberEntry>> {
        let state = self.state.lock().await;
        let mut members: Vec<MemberEntry> = state
            .memberships
            .iter()
            .filter(|m| m.customer_id == Some(customer_id) && m.status == "active")
            .map(|m| MemberEntry {
                user_id: m.user_id,
                email: state
                    .profiles
                    .iter()
                    .find(|p| p.user_id == m.user_id)
                    .map(|p| p.email.clone()),
                role: m.role.clone(),
                team_id: m.team_id,
                team_name: m
                    .team_id
                    .and_then(|t| state.teams.iter().find(|team| team.id == t))
                    .map(|t| t.name.clone()),
                status: m.status.clone(),
                created_at: m.created_at,
                is_invite: false,
            })
            .collect();
        members.sort_by_key(|m| m.created_at);
        Ok(members)
    }

    async fn list_pending_invites(&self, customer_id: Uuid) -> StoreResult<Vec<Invite>> {
        Ok(self
            .state
            .lock()
            .await
            .invites
            .iter()
            .filter(|i| i.customer_id == customer_id && i.is_pending())
            .cloned()
            .collect())
    }

    async fn count_active_members(&self, customer_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .state
            .lock()
            .await
            .memberships
            .iter()
            .filter(|m| m.customer_id == Some(customer_id) && m.status == "active")
            .count() as i64)
    }

    async fn customer_membership(&self, customer_id: Uuid, user_id: Uuid) -> StoreResult<Option<MembershipRow>> {
        Ok(self.membership(customer_id, user_id).await)
    }

    async fn insert_membership(&self, membership: NewMembership) -> StoreResult<MembershipRow> {
        let mut state = self.state.lock().await;
        if state
            .memberships
            .iter()
            .any(|m| m.user_id == membership.user_id && m.customer_id == Some(membership.customer_id))
        {
            return Err(DatabaseError::UniqueViolation("memberships_user_customer_key".to_string()));
        }
        let row = MembershipRow {
            id: Uuid::new_v4(),
            user_id: membership.user_id,
            organization_id: None,
            customer_id: Some(membership.customer_id),
            role: membership.role.as_str().to_string(),
            team_id: membership.team_id,
            status: "active".to_string(),
            created_at: Utc::now(),
        };
        state.memberships.push(row.clone());
        Ok(row)
    }

    async fn update_membership(&self, customer_id: Uuid, user_id: Uuid, update: MembershipUpdate) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let Some(m) = state
            .memberships
            .iter_mut()
            .find(|m| m.customer_id == Some(customer_id) && m.user_id == user_id)
        else {
            return Ok(false);
        };
        if let Some(role) = update.role {
            m.role = role.as_str().to_string();
        }
        if let Some(team_id) = update.team_id {
            m.team_id = team_id;
        }
        Ok(true)
    }

    async fn delete_membership(&self, customer_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.memberships.len();
        state
            .memberships
            .retain(|m| !(m.customer_id == Some(customer_id) && m.user_id == user_id));
        Ok(state.memberships.len() < before)
    }

    async fn find_pending_invite(&self, customer_id: Uuid, email: &str) -> StoreResult<Option<Invite>> {
        Ok(self
            .state
            .lock()
            .await
            .invites
            .iter()
            .find(|i| i.customer_id == customer_id && i.email == email && i.is_pending())
            .cloned())
    }

    async fn set_invite_status(&self, invite_id: Uuid, status: InviteStatus) -> StoreResult<()> {
        if let Some(i) = self.state.lock().await.invites.iter_mut().find(|i| i.id == invite_id) {
            i.status = status.as_str().to_string();
        }
        Ok(())
    }

    async fn insert_invite(&self, invite: NewInvite) -> StoreResult<Invite> {
        let mut state = self.state.lock().await;
        if state
            .invites
            .iter()
            .any(|i| i.customer_id == invite.customer_id && i.email == invite.email && i.is_pending())
        {
            return Err(DatabaseError::UniqueViolation("user_invites_pending_key".to_string()));
        }
        let row = Invite {
            id: Uuid::new_v4(),
            customer_id: invite.customer_id,
            email: invite.email,
            role: invite.role,
            team_id: invite.team_id,
            token_hash: invite.token_hash,
            status: InviteStatus::Pending.as_str().to_string(),
            invited_by: invite.invited_by,
            expires_at: invite.expires_at,
            created_at: Utc::now(),
        };
        state.invites.push(row.clone());
        Ok(row)
    }

    async fn delete_invite(&self, customer_id: Uuid, invite_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.invites.len();
        state
            .invites
            .retain(|i| !(i.id == invite_id && i.customer_id == customer_id));
        Ok(state.invites.len() < before)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get_session(&self, session_id: Uuid) -> StoreResult<Option<ChatSession>> {
        Ok(self
            .state
            .lock()
            .await
            .sessions
            .iter()
            .find(|s| s.id == session_id && s.deleted_at.is_none())
            .cloned())
    }

    async fn list_sessions(&self, filter: SessionFilter) -> StoreResult<Vec<SessionListItem>> {
        let state = self.state.lock().await;
        let mut rows: Vec<SessionListItem> = state
            .sessions
            .iter()
            .filter(|s| s.deleted_at.is_none() && !s.is_suspicious && in_filter(&filter.customer_ids, s.customer_id))
            .map(|s| SessionListItem {
                session: s.clone(),
                customer_name: state
                    .customers
                    .iter()
                    .find(|c| c.id == s.customer_id)
                    .map(|c| c.name.clone()),
            })
            .collect();
        rows.sort_by(|a, b| b.session.updated_at.cmp(&a.session.updated_at));
        rows.truncate(filter.limit.max(0) as usize);
        Ok(rows)
    }

    async fn mark_read(&self, session_id: Uuid, reader: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        self.update_session(session_id, |s| {
            s.is_read = true;
            s.read_at = Some(at);
            s.read_by = Some(reader);
        })
        .await;
        Ok(())
    }

    async fn mark_unread(&self, session_id: Uuid) -> StoreResult<()> {
        self.update_session(session_id, |s| {
            s.is_read = false;
            s.read_at = None;
            s.read_by = None;
        })
        .await;
        Ok(())
    }

    async fn mark_all_read(&self, customer_ids: Option<Vec<Uuid>>, reader: Uuid, at: DateTime<Utc>) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        let mut changed = 0;
        for s in state.sessions.iter_mut() {
            if !s.is_read && s.deleted_at.is_none() && in_filter(&customer_ids, s.customer_id) {
                s.is_read = true;
                s.read_at = Some(at);
                s.read_by = Some(reader);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn update_assignment(&self, session_id: Uuid, assignment: Assignment) -> StoreResult<()> {
        if self.state.lock().await.fail_assignment_updates {
            return Err(injected("assignment"));
        }
        self.update_session(session_id, |s| {
            s.assigned_user_id = assignment.user_id;
            s.assigned_team_id = assignment.team_id;
            s.escalation_level = assignment.escalation_level;
        })
        .await;
        Ok(())
    }

    async fn insert_escalation(&self, escalation: NewEscalation) -> StoreResult<Escalation> {
        let mut state = self.state.lock().await;
        if state.fail_escalation_inserts {
            return Err(injected("escalation"));
        }
        let created_at = Utc::now() + Duration::microseconds(state.escalations.len() as i64);
        let row = Escalation {
            id: Uuid::new_v4(),
            session_id: escalation.session_id,
            from_user_id: escalation.from_user_id,
            from_team_id: escalation.from_team_id,
            to_user_id: escalation.to_user_id,
            to_team_id: escalation.to_team_id,
            reason: escalation.reason,
            note: escalation.note,
            created_by: escalation.created_by,
            created_at,
        };
        state.escalations.push(row.clone());
        Ok(row)
    }

    async fn list_escalations(&self, session_id: Uuid) -> StoreResult<Vec<Escalation>> {
        let mut rows = self.escalations(session_id).await;
        rows.sort_by_key(|e| e.created_at);
        Ok(rows)
    }

    async fn soft_delete_session(&self, session_id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        self.update_session(session_id, |s| {
            if s.deleted_at.is_none() {
                s.deleted_at = Some(at);
            }
        })
        .await;
        Ok(())
    }

    async fn hard_delete_session(&self, session_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.sessions.retain(|s| s.id != session_id);
        state.messages.retain(|m| m.session_id != session_id);
        state.escalations.retain(|e| e.session_id != session_id);
        Ok(())
    }

    async fn list_messages(&self, session_id: Uuid) -> StoreResult<Vec<ChatMessage>> {
        let mut rows = self.messages(session_id).await;
        rows.sort_by_key(|m| m.created_at);
        Ok(rows)
    }

    async fn insert_message(&self, message: NewMessage) -> StoreResult<ChatMessage> {
        let mut state = self.state.lock().await;
        if state.fail_message_inserts {
            return Err(injected("message"));
        }
        let created_at = Utc::now() + Duration::microseconds(state.messages.len() as i64);
        let row = ChatMessage {
            id: Uuid::new_v4(),
            session_id: message.session_id,
            role: message.role.as_str().to_string(),
            sender_type: message.sender_type.as_str().to_string(),
            content: message.content,
            created_at,
        };
        state.messages.push(row.clone());
        Ok(row)
    }

    async fn touch_after_reply(&self, session_id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        self.update_session(session_id, |s| {
            s.needs_human = false;
            s.updated_at = at;
        })
        .await;
        Ok(())
    }

    async fn mark_notifications_handled(&self, session_id: Uuid) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        let mut changed = 0;
        for n in state.notifications.iter_mut() {
            if n.session_id == session_id && n.status != "handled" {
                n.status = "handled".to_string();
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl PushStore for MemoryStore {
    async fn upsert_subscription(&self, subscription: NewSubscription) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        if let Some(existing) = state
            .subscriptions
            .iter_mut()
            .find(|s| s.user_id == subscription.user_id && s.endpoint == subscription.endpoint)
        {
            existing.customer_id = subscription.customer_id;
            existing.p256dh = subscription.p256dh;
            existing.auth = subscription.auth;
            existing.updated_at = now;
            return Ok(());
        }
        state.subscriptions.push(PushSubscription {
            id: Uuid::new_v4(),
            user_id: subscription.user_id,
            customer_id: subscription.customer_id,
            endpoint: subscription.endpoint,
            p256dh: subscription.p256dh,
            auth: subscription.auth,
            updated_at: now,
        });
        Ok(())
    }

    async fn delete_subscription(&self, user_id: Uuid, endpoint: &str) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.subscriptions.len();
        state
            .subscriptions
            .retain(|s| !(s.user_id == user_id && s.endpoint == endpoint));
        Ok(state.subscriptions.len() < before)
    }

    async fn subscriptions_for_user(&self, user_id: Uuid) -> StoreResult<Vec<PushSubscription>> {
        Ok(self
            .state
            .lock()
            .await
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn subscriptions_for_customer(&self, customer_id: Uuid) -> StoreResult<Vec<PushSubscription>> {
        Ok(self
            .state
            .lock()
            .await
            .subscriptions
            .iter()
            .filter(|s| s.customer_id == Some(customer_id))
            .cloned()
            .collect())
    }

    async fn delete_subscriptions_by_endpoint(&self, endpoint: &str) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.subscriptions.len();
        state.subscriptions.retain(|s| s.endpoint != endpoint);
        Ok((before - state.subscriptions.len()) as u64)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        if self.state.lock().await.unreachable {
            return Err(injected("ping"));
        }
        Ok(())
    }
}
