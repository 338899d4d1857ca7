//! Identity resolution.
//!
//! Turns an authenticated [`Principal`] into the set of customers it may act
//! on and the role it holds on each. Precedence, highest first:
//!
//! 1. superadmin registry (by user id; by email only when legacy lookups are on)
//! 2. an organization-scoped membership, covering every customer in that organization
//! 3. customer-scoped memberships
//! 4. the legacy single-tenant membership table
//!
//! Nothing resolved means an empty scope, which grants nothing.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::Principal;
use crate::database::models::{Membership, MembershipScope};
use crate::database::{IdentityStore, StoreResult};

use super::Role;

/// Customers an identity can see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "customer_ids", rename_all = "snake_case")]
pub enum CustomerScope {
    All,
    Only(BTreeSet<Uuid>),
}

impl CustomerScope {
    pub fn contains(&self, customer_id: Uuid) -> bool {
        match self {
            CustomerScope::All => true,
            CustomerScope::Only(ids) => ids.contains(&customer_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CustomerScope::Only(ids) if ids.is_empty())
    }

    /// Store filter for this scope. `None` means unrestricted.
    pub fn as_filter(&self) -> Option<Vec<Uuid>> {
        match self {
            CustomerScope::All => None,
            CustomerScope::Only(ids) => Some(ids.iter().copied().collect()),
        }
    }
}

/// Resolved access of one principal for the lifetime of one request.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub principal: Principal,
    pub is_superadmin: bool,
    pub accessible: CustomerScope,
    pub org_scope: Option<Uuid>,
    pub roles: HashMap<Uuid, Role>,
}

impl Identity {
    pub fn superadmin(principal: Principal) -> Self {
        Self {
            principal,
            is_superadmin: true,
            accessible: CustomerScope::All,
            org_scope: None,
            roles: HashMap::new(),
        }
    }

    pub fn without_access(principal: Principal) -> Self {
        Self {
            principal,
            is_superadmin: false,
            accessible: CustomerScope::Only(BTreeSet::new()),
            org_scope: None,
            roles: HashMap::new(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.principal.id
    }

    pub fn role_for(&self, customer_id: Uuid) -> Option<Role> {
        self.roles.get(&customer_id).copied()
    }
}

/// Resolves `principal` against the store.
///
/// `legacy_email` enables the email-keyed superadmin lookup for registry rows
/// that predate user ids.
pub async fn resolve<S>(store: &S, principal: &Principal, legacy_email: bool) -> StoreResult<Identity>
where
    S: IdentityStore + ?Sized,
{
    if is_superadmin(store, principal, legacy_email).await? {
        debug!("Principal {} resolved as superadmin", principal.id);
        return Ok(Identity::superadmin(principal.clone()));
    }

    let memberships: Vec<Membership> = store
        .memberships_for_user(principal.id)
        .await?
        .into_iter()
        .filter_map(|row| match Membership::try_from(row) {
            Ok(m) => Some(m),
            Err(e) => {
                warn!("Skipping membership for {}: {}", principal.id, e);
                None
            }
        })
        .collect();

    let org_membership = memberships.iter().find_map(|m| match m.scope {
        MembershipScope::Organization(org) => Some((org, m.role)),
        MembershipScope::Customer(_) => None,
    });

    if let Some((org, role)) = org_membership {
        let customers = store.customers_in_organization(org).await?;
        debug!(
            "Principal {} resolved through organization {} ({} customers, role {})",
            principal.id,
            org,
            customers.len(),
            role
        );
        let roles = customers.iter().map(|c| (*c, role)).collect();
        return Ok(Identity {
            principal: principal.clone(),
            is_superadmin: false,
            accessible: CustomerScope::Only(customers.into_iter().collect()),
            org_scope: Some(org),
            roles,
        });
    }

    let direct: Vec<(Uuid, Role)> = if memberships.is_empty() {
        match store.legacy_membership(principal.id).await? {
            Some(legacy) => {
                debug!("Principal {} resolved through legacy membership", principal.id);
                let m = Membership::from(legacy);
                match m.scope {
                    MembershipScope::Customer(c) => vec![(c, m.role)],
                    MembershipScope::Organization(_) => Vec::new(),
                }
            }
            None => Vec::new(),
        }
    } else {
        memberships
            .iter()
            .filter_map(|m| match m.scope {
                MembershipScope::Customer(c) => Some((c, m.role)),
                MembershipScope::Organization(_) => None,
            })
            .collect()
    };

    if direct.is_empty() {
        debug!("Principal {} has no access", principal.id);
        return Ok(Identity::without_access(principal.clone()));
    }

    let mut roles = HashMap::with_capacity(direct.len());
    for (customer, role) in direct {
        // Duplicate grants on one customer keep the stronger role
        roles
            .entry(customer)
            .and_modify(|r: &mut Role| *r = (*r).max(role))
            .or_insert(role);
    }

    Ok(Identity {
        principal: principal.clone(),
        is_superadmin: false,
        accessible: CustomerScope::Only(roles.keys().copied().collect()),
        org_scope: None,
        roles,
    })
}

async fn is_superadmin<S>(store: &S, principal: &Principal, legacy_email: bool) -> StoreResult<bool>
where
    S: IdentityStore + ?Sized,
{
    if store.is_superadmin(principal.id).await? {
        return Ok(true);
    }
    if legacy_email && !principal.email.is_empty() {
        let found = store.is_superadmin_by_email(&principal.email).await?;
        if found {
            warn!(
                "Superadmin {} matched by email only; registry row should be keyed by user id",
                principal.id
            );
        }
        return Ok(found);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    fn principal(email: &str) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn superadmin_by_id_sees_everything() {
        let store = MemoryStore::new();
        let p = principal("root@desk.test");
        store.add_superadmin(Some(p.id), None).await;

        let identity = resolve(&store, &p, false).await.unwrap();
        assert!(identity.is_superadmin);
        assert_eq!(identity.accessible, CustomerScope::All);
    }

    #[tokio::test]
    async fn email_superadmin_requires_legacy_flag() {
        let store = MemoryStore::new();
        let p = principal("Old.Root@desk.test");
        store.add_superadmin(None, Some("old.root@desk.test")).await;

        let strict = resolve(&store, &p, false).await.unwrap();
        assert!(!strict.is_superadmin);
        assert!(strict.accessible.is_empty());

        let legacy = resolve(&store, &p, true).await.unwrap();
        assert!(legacy.is_superadmin);
    }

    #[tokio::test]
    async fn organization_scope_takes_precedence() {
        let store = MemoryStore::new();
        let org = store.add_organization("Group").await;
        let a = store.add_customer("A", Some(org), None).await;
        let b = store.add_customer("B", Some(org), None).await;
        let outside = store.add_customer("C", None, None).await;
        let p = principal("staff@desk.test");
        store.add_customer_membership(p.id, outside, Role::Owner, None).await;
        store.add_org_membership(p.id, org, Role::Manager).await;

        let identity = resolve(&store, &p, false).await.unwrap();
        assert_eq!(identity.org_scope, Some(org));
        assert_eq!(identity.accessible, CustomerScope::Only([a, b].into_iter().collect()));
        assert_eq!(identity.role_for(a), Some(Role::Manager));
        assert_eq!(identity.role_for(outside), None);
    }

    #[tokio::test]
    async fn customer_memberships_carry_their_own_roles() {
        let store = MemoryStore::new();
        let a = store.add_customer("A", None, None).await;
        let b = store.add_customer("B", None, None).await;
        let p = principal("staff@desk.test");
        store.add_customer_membership(p.id, a, Role::Admin, None).await;
        store.add_customer_membership(p.id, b, Role::Viewer, None).await;

        let identity = resolve(&store, &p, false).await.unwrap();
        assert_eq!(identity.role_for(a), Some(Role::Admin));
        assert_eq!(identity.role_for(b), Some(Role::Viewer));
        assert!(identity.accessible.contains(a) && identity.accessible.contains(b));
    }

    #[tokio::test]
    async fn legacy_table_used_only_without_memberships() {
        let store = MemoryStore::new();
        let a = store.add_customer("A", None, None).await;
        let p = principal("legacy@desk.test");
        store.add_legacy_membership(p.id, a, "admin").await;

        let identity = resolve(&store, &p, false).await.unwrap();
        assert_eq!(identity.role_for(a), Some(Role::Admin));

        let b = store.add_customer("B", None, None).await;
        store.add_customer_membership(p.id, b, Role::Member, None).await;
        let identity = resolve(&store, &p, false).await.unwrap();
        assert_eq!(identity.role_for(a), None);
        assert_eq!(identity.role_for(b), Some(Role::Member));
    }

    #[tokio::test]
    async fn no_grants_means_empty_scope() {
        let store = MemoryStore::new();
        let identity = resolve(&store, &principal("nobody@desk.test"), true).await.unwrap();
        assert!(!identity.is_superadmin);
        assert!(identity.accessible.is_empty());
        assert_eq!(identity.accessible.as_filter(), Some(Vec::new()));
    }
}
