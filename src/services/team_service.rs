use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::access::guard::{ensure_administer, ensure_view};
use crate::access::{AccessError, AccessResult, Identity};
use crate::database::models::{NewTeam, Team, TeamSummary, TeamUpdate};
use crate::database::{DatabaseError, Store};

fn duplicate_name(err: DatabaseError) -> AccessError {
    match err {
        DatabaseError::UniqueViolation(_) => AccessError::DuplicateTeamName,
        other => AccessError::Store(other),
    }
}

pub struct TeamService {
    store: Arc<dyn Store>,
}

impl TeamService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, identity: &Identity, customer_id: Uuid) -> AccessResult<Vec<TeamSummary>> {
        ensure_view(identity, customer_id)?;
        Ok(self.store.list_teams(customer_id).await?)
    }

    pub async fn create(
        &self,
        identity: &Identity,
        customer_id: Uuid,
        name: &str,
        description: Option<String>,
    ) -> AccessResult<Team> {
        ensure_administer(identity, customer_id)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(AccessError::validation("name", "Team name is required"));
        }

        let team = self
            .store
            .insert_team(NewTeam {
                customer_id,
                name: name.to_string(),
                description: description.filter(|d| !d.trim().is_empty()),
            })
            .await
            .map_err(duplicate_name)?;

        info!("Team '{}' created for customer {} by {}", team.name, customer_id, identity.user_id());
        Ok(team)
    }

    /// Applies a partial update. Making a team the default clears the flag on
    /// every other team of the customer once the update itself has succeeded.
    pub async fn update(
        &self,
        identity: &Identity,
        customer_id: Uuid,
        team_id: Uuid,
        mut update: TeamUpdate,
    ) -> AccessResult<Team> {
        ensure_administer(identity, customer_id)?;

        if update.is_empty() {
            return Err(AccessError::validation("team", "No fields to update"));
        }
        if let Some(name) = update.name.as_mut() {
            *name = name.trim().to_string();
            if name.is_empty() {
                return Err(AccessError::validation("name", "Team name is required"));
            }
        }

        if self.store.get_team(customer_id, team_id).await?.is_none() {
            return Err(AccessError::NotFound("Team"));
        }

        let becomes_default = update.is_default == Some(true);
        let found = self
            .store
            .update_team(customer_id, team_id, update)
            .await
            .map_err(duplicate_name)?;
        if !found {
            return Err(AccessError::NotFound("Team"));
        }

        if becomes_default {
            self.store.clear_default_team(customer_id, team_id).await?;
        }

        self.store
            .get_team(customer_id, team_id)
            .await?
            .ok_or(AccessError::NotFound("Team"))
    }

    /// Refuses while members are still attached to the team.
    pub async fn delete(&self, identity: &Identity, customer_id: Uuid, team_id: Uuid) -> AccessResult<()> {
        ensure_administer(identity, customer_id)?;

        if self.store.get_team(customer_id, team_id).await?.is_none() {
            return Err(AccessError::NotFound("Team"));
        }

        let count = self.store.count_team_members(team_id).await?;
        if count > 0 {
            return Err(AccessError::TeamHasMembers { count });
        }

        if !self.store.delete_team(customer_id, team_id).await? {
            return Err(AccessError::NotFound("Team"));
        }
        info!("Team {} deleted from customer {} by {}", team_id, customer_id, identity.user_id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{resolve, Role};
    use crate::auth::Principal;
    use crate::testing::MemoryStore;

    async fn setup(role: Role) -> (Arc<MemoryStore>, TeamService, Identity, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let customer = store.add_customer("Bella", None, None).await;
        let principal = Principal {
            id: store.add_user("admin@bella.test").await,
            email: "admin@bella.test".into(),
        };
        store.add_customer_membership(principal.id, customer, role, None).await;
        let identity = resolve(store.as_ref(), &principal, false).await.unwrap();
        (store.clone(), TeamService::new(store), identity, customer)
    }

    #[tokio::test]
    async fn only_admins_create_teams() {
        let (_, service, manager, customer) = setup(Role::Manager).await;
        assert!(matches!(
            service.create(&manager, customer, "Floor", None).await,
            Err(AccessError::Forbidden(_))
        ));
        assert!(service.list(&manager, customer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_names_conflict() {
        let (_, service, admin, customer) = setup(Role::Admin).await;
        service.create(&admin, customer, "Floor", None).await.unwrap();
        assert!(matches!(
            service.create(&admin, customer, " Floor ", None).await,
            Err(AccessError::DuplicateTeamName)
        ));
        assert!(matches!(
            service.create(&admin, customer, "  ", None).await,
            Err(AccessError::Validation { field: "name", .. })
        ));
    }

    #[tokio::test]
    async fn at_most_one_default_team() {
        let (store, service, admin, customer) = setup(Role::Owner).await;
        let a = service.create(&admin, customer, "A", None).await.unwrap();
        let b = service.create(&admin, customer, "B", None).await.unwrap();
        let c = service.create(&admin, customer, "C", None).await.unwrap();

        for id in [a.id, c.id, b.id, b.id] {
            let update = TeamUpdate {
                is_default: Some(true),
                ..TeamUpdate::default()
            };
            service.update(&admin, customer, id, update).await.unwrap();
            let defaults: Vec<Uuid> = store
                .teams(customer)
                .await
                .into_iter()
                .filter(|t| t.is_default)
                .map(|t| t.id)
                .collect();
            assert_eq!(defaults, vec![id]);
        }
    }

    #[tokio::test]
    async fn failed_update_keeps_existing_default() {
        let (store, service, admin, customer) = setup(Role::Admin).await;
        let a = service.create(&admin, customer, "A", None).await.unwrap();
        let b = service.create(&admin, customer, "B", None).await.unwrap();
        let make_default = TeamUpdate {
            is_default: Some(true),
            ..TeamUpdate::default()
        };
        service.update(&admin, customer, a.id, make_default).await.unwrap();

        let clash = TeamUpdate {
            name: Some("A".into()),
            is_default: Some(true),
            ..TeamUpdate::default()
        };
        assert!(matches!(
            service.update(&admin, customer, b.id, clash).await,
            Err(AccessError::DuplicateTeamName)
        ));

        let defaults: Vec<String> = store
            .teams(customer)
            .await
            .into_iter()
            .filter(|t| t.is_default)
            .map(|t| t.name)
            .collect();
        assert_eq!(defaults, vec!["A".to_string()]);
    }

    #[tokio::test]
    async fn team_with_members_cannot_be_deleted() {
        let (store, service, admin, customer) = setup(Role::Admin).await;
        let team = service.create(&admin, customer, "Kitchen", None).await.unwrap();
        store
            .add_customer_membership(Uuid::new_v4(), customer, Role::Member, Some(team.id))
            .await;
        store
            .add_customer_membership(Uuid::new_v4(), customer, Role::Member, Some(team.id))
            .await;

        assert!(matches!(
            service.delete(&admin, customer, team.id).await,
            Err(AccessError::TeamHasMembers { count: 2 })
        ));

        let empty = service.create(&admin, customer, "Bar", None).await.unwrap();
        service.delete(&admin, customer, empty.id).await.unwrap();
        assert_eq!(store.teams(customer).await.len(), 1);
    }
}
