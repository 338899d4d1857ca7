use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::access::guard::{can_touch_owner, ensure_administer, ensure_not_self, ensure_seat_available};
use crate::access::{AccessError, AccessResult, Identity, Role};
use crate::config::AppConfig;
use crate::database::models::{
    Invite, InviteStatus, MemberEntry, MembershipUpdate, NewInvite, NewMembership,
};
use crate::database::{DatabaseError, Store};

#[derive(Debug, Clone, Deserialize)]
pub struct InviteRequest {
    pub email: String,
    pub role: Option<String>,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct MemberUpdateRequest {
    pub role: Option<String>,
    pub team_id: Option<Option<Uuid>>,
}

/// What an invite turned into.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InviteOutcome {
    /// The email already had an account; it was granted access directly.
    MemberAdded { user_id: Uuid, role: Role },
    /// `token` is returned once and never stored in clear.
    InviteCreated { invite: Invite, token: String },
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// 32 random bytes rendered as 64 hex characters.
pub fn generate_invite_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn grantable_role(role: Option<&str>) -> AccessResult<Role> {
    let role = match role.map(str::trim).filter(|r| !r.is_empty()) {
        None => Role::Member,
        Some(r) => r
            .parse::<Role>()
            .map_err(|e| AccessError::validation("role", e.to_string()))?,
    };
    if role == Role::Owner {
        return Err(AccessError::CannotGrantOwner);
    }
    Ok(role)
}

/// User management for one customer: listing, invites, role changes and removal.
pub struct MemberService {
    store: Arc<dyn Store>,
    config: Arc<AppConfig>,
}

impl MemberService {
    pub fn new(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    async fn ensure_team_belongs(&self, customer_id: Uuid, team_id: Option<Uuid>) -> AccessResult<()> {
        if let Some(team_id) = team_id {
            if self.store.get_team(customer_id, team_id).await?.is_none() {
                return Err(AccessError::validation("team_id", "Team does not belong to this customer"));
            }
        }
        Ok(())
    }

    /// Active members followed by unexpired pending invites.
    pub async fn list(&self, identity: &Identity, customer_id: Uuid) -> AccessResult<Vec<MemberEntry>> {
        ensure_administer(identity, customer_id)?;

        let mut entries = self.store.list_members(customer_id).await?;
        for entry in entries.iter_mut() {
            if entry.email.is_none() {
                let id = entry.user_id.simple().to_string();
                entry.email = Some(format!("user-{}", &id[..8]));
            }
        }

        let team_names: HashMap<Uuid, String> = self
            .store
            .list_teams(customer_id)
            .await?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();

        let now = Utc::now();
        let invites = self.store.list_pending_invites(customer_id).await?;
        entries.extend(invites.into_iter().filter(|i| !i.is_expired_at(now)).map(|i| MemberEntry {
            user_id: i.id,
            email: Some(i.email),
            role: i.role,
            team_name: i.team_id.and_then(|t| team_names.get(&t).cloned()),
            team_id: i.team_id,
            status: i.status,
            created_at: i.created_at,
            is_invite: true,
        }));
        Ok(entries)
    }

    /// Adds an existing account directly, or records an invite for an unknown email.
    pub async fn invite(&self, identity: &Identity, customer_id: Uuid, request: InviteRequest) -> AccessResult<InviteOutcome> {
        ensure_administer(identity, customer_id)?;

        let email = normalize_email(&request.email);
        if email.is_empty() || !email.contains('@') {
            return Err(AccessError::validation("email", "A valid email is required"));
        }
        let role = grantable_role(request.role.as_deref())?;
        self.ensure_team_belongs(customer_id, request.team_id).await?;

        let customer = self
            .store
            .get_customer(customer_id)
            .await?
            .ok_or(AccessError::NotFound("Customer"))?;
        let active = self.store.count_active_members(customer_id).await?;
        ensure_seat_available(customer.plan(), active)?;

        if let Some(user) = self.store.find_user_by_email(&email).await? {
            if self.store.customer_membership(customer_id, user.user_id).await?.is_some() {
                return Err(AccessError::AlreadyHasAccess);
            }
            self.store
                .insert_membership(NewMembership {
                    user_id: user.user_id,
                    customer_id,
                    role,
                    team_id: request.team_id,
                })
                .await
                .map_err(|e| match e {
                    DatabaseError::UniqueViolation(_) => AccessError::AlreadyHasAccess,
                    other => AccessError::Store(other),
                })?;
            info!("{} added {} to customer {} as {}", identity.user_id(), email, customer_id, role);
            return Ok(InviteOutcome::MemberAdded {
                user_id: user.user_id,
                role,
            });
        }

        let now = Utc::now();
        if let Some(existing) = self.store.find_pending_invite(customer_id, &email).await? {
            if !existing.is_expired_at(now) {
                return Err(AccessError::DuplicateInvite);
            }
            debug!("Expiring stale invite {} for {}", existing.id, email);
            self.store.set_invite_status(existing.id, InviteStatus::Expired).await?;
        }

        let token = generate_invite_token();
        let invite = self
            .store
            .insert_invite(NewInvite {
                customer_id,
                email: email.clone(),
                role: role.as_str().to_string(),
                team_id: request.team_id,
                token_hash: hash_token(&token),
                invited_by: identity.user_id(),
                expires_at: now + Duration::days(self.config.invites.expiry_days),
            })
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueViolation(_) => AccessError::DuplicateInvite,
                other => AccessError::Store(other),
            })?;

        info!("{} invited {} to customer {}", identity.user_id(), email, customer_id);
        Ok(InviteOutcome::InviteCreated { invite, token })
    }

    pub async fn update(
        &self,
        identity: &Identity,
        customer_id: Uuid,
        user_id: Uuid,
        request: MemberUpdateRequest,
    ) -> AccessResult<()> {
        ensure_administer(identity, customer_id)?;

        let target = self
            .store
            .customer_membership(customer_id, user_id)
            .await?
            .ok_or(AccessError::NotFound("User"))?;
        if !can_touch_owner(identity, target.role(), self.config.security.superadmin_overrides_owner) {
            return Err(AccessError::CannotChangeOwner);
        }

        let role = match request.role.as_deref() {
            Some(r) => Some(grantable_role(Some(r))?),
            None => None,
        };
        if let Some(team_id) = request.team_id {
            self.ensure_team_belongs(customer_id, team_id).await?;
        }
        if role.is_none() && request.team_id.is_none() {
            return Err(AccessError::validation("user", "No fields to update"));
        }

        let found = self
            .store
            .update_membership(customer_id, user_id, MembershipUpdate {
                role,
                team_id: request.team_id,
            })
            .await?;
        if !found {
            return Err(AccessError::NotFound("User"));
        }
        info!("{} updated member {} of customer {}", identity.user_id(), user_id, customer_id);
        Ok(())
    }

    /// Removes a member, or a pending invite when `is_invite` is set (`user_id` is then the invite id).
    pub async fn remove(&self, identity: &Identity, customer_id: Uuid, user_id: Uuid, is_invite: bool) -> AccessResult<()> {
        ensure_administer(identity, customer_id)?;

        if is_invite {
            if !self.store.delete_invite(customer_id, user_id).await? {
                return Err(AccessError::NotFound("Invite"));
            }
            info!("{} withdrew invite {} of customer {}", identity.user_id(), user_id, customer_id);
            return Ok(());
        }

        ensure_not_self(identity, user_id)?;
        let target = self
            .store
            .customer_membership(customer_id, user_id)
            .await?
            .ok_or(AccessError::NotFound("User"))?;
        if !can_touch_owner(identity, target.role(), self.config.security.superadmin_overrides_owner) {
            return Err(AccessError::CannotRemoveOwner);
        }

        if !self.store.delete_membership(customer_id, user_id).await? {
            return Err(AccessError::NotFound("User"));
        }
        info!("{} removed member {} from customer {}", identity.user_id(), user_id, customer_id);
        Ok(())
    }
}
