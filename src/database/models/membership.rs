use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::access::Role;
use crate::database::DatabaseError;

/// Raw `memberships` row. Exactly one of `organization_id` / `customer_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MembershipRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub role: String,
    pub team_id: Option<Uuid>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// What a membership grants access over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MembershipScope {
    Organization(Uuid),
    Customer(Uuid),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub scope: MembershipScope,
    pub role: Role,
    pub team_id: Option<Uuid>,
    pub status: String,
}

impl MembershipRow {
    /// Parsed role. Unrecognised values degrade to the least privileged role.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or_else(|e| {
            tracing::warn!("Membership {} has {}; treating as viewer", self.id, e);
            Role::Viewer
        })
    }
}

impl TryFrom<MembershipRow> for Membership {
    type Error = DatabaseError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        let scope = match (row.organization_id, row.customer_id) {
            (Some(org), None) => MembershipScope::Organization(org),
            (None, Some(customer)) => MembershipScope::Customer(customer),
            _ => {
                return Err(DatabaseError::InvalidRow(format!(
                    "membership {} must have exactly one of organization_id or customer_id",
                    row.id
                )))
            }
        };
        let role = row.role();

        Ok(Membership {
            id: row.id,
            user_id: row.user_id,
            scope,
            role,
            team_id: row.team_id,
            status: row.status,
        })
    }
}

/// Row of the single-tenant table that predates `memberships`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LegacyMembership {
    pub user_id: Uuid,
    pub customer_id: Uuid,
    pub role: String,
}

impl From<LegacyMembership> for Membership {
    fn from(legacy: LegacyMembership) -> Self {
        let role = legacy.role.parse().unwrap_or(Role::Viewer);
        Membership {
            // Legacy rows have no id of their own
            id: Uuid::nil(),
            user_id: legacy.user_id,
            scope: MembershipScope::Customer(legacy.customer_id),
            role,
            team_id: None,
            status: "active".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewMembership {
    pub user_id: Uuid,
    pub customer_id: Uuid,
    pub role: Role,
    pub team_id: Option<Uuid>,
}

/// Partial update of a customer-scoped membership. `team_id: Some(None)` clears the team.
#[derive(Debug, Clone, Default)]
pub struct MembershipUpdate {
    pub role: Option<Role>,
    pub team_id: Option<Option<Uuid>>,
}

/// One line of the user-management listing: an active member or a pending invite.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MemberEntry {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: String,
    pub team_id: Option<Uuid>,
    pub team_name: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub is_invite: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(org: Option<Uuid>, customer: Option<Uuid>) -> MembershipRow {
        MembershipRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            organization_id: org,
            customer_id: customer,
            role: "admin".to_string(),
            team_id: None,
            status: "active".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn exactly_one_scope_is_required() {
        let id = Uuid::new_v4();
        assert!(matches!(
            Membership::try_from(row(Some(id), None)).map(|m| m.scope),
            Ok(MembershipScope::Organization(o)) if o == id
        ));
        assert!(matches!(
            Membership::try_from(row(None, Some(id))).map(|m| m.scope),
            Ok(MembershipScope::Customer(c)) if c == id
        ));
        assert!(Membership::try_from(row(Some(id), Some(id))).is_err());
        assert!(Membership::try_from(row(None, None)).is_err());
    }

    #[test]
    fn unknown_role_degrades_to_viewer() {
        let mut r = row(None, Some(Uuid::new_v4()));
        r.role = "superuser".to_string();
        assert_eq!(r.role(), Role::Viewer);
    }
}
