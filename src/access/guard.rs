use tracing::warn;
use uuid::Uuid;

use super::error::{AccessError, AccessResult};
use super::identity::Identity;
use super::{Plan, Role};

pub fn can_view(identity: &Identity, customer_id: Uuid) -> bool {
    identity.is_superadmin || identity.accessible.contains(customer_id)
}

pub fn can_administer(identity: &Identity, customer_id: Uuid) -> bool {
    identity.is_superadmin || identity.role_for(customer_id).is_some_and(|r| r.is_admin())
}

/// Session-level mutation right (assign, delete). Viewers may read and reply only.
pub fn can_manage(identity: &Identity, customer_id: Uuid) -> bool {
    identity.is_superadmin || identity.role_for(customer_id).is_some_and(|r| r >= Role::Member)
}

pub fn ensure_view(identity: &Identity, customer_id: Uuid) -> AccessResult<()> {
    if can_view(identity, customer_id) {
        return Ok(());
    }
    warn!("{} denied view on customer {}", identity.user_id(), customer_id);
    Err(AccessError::forbidden("You do not have access to this customer"))
}

pub fn ensure_administer(identity: &Identity, customer_id: Uuid) -> AccessResult<()> {
    if can_administer(identity, customer_id) {
        return Ok(());
    }
    warn!("{} denied administration of customer {}", identity.user_id(), customer_id);
    Err(AccessError::forbidden("Admin access required"))
}

pub fn ensure_manage(identity: &Identity, customer_id: Uuid) -> AccessResult<()> {
    if can_manage(identity, customer_id) {
        return Ok(());
    }
    warn!("{} denied session management on customer {}", identity.user_id(), customer_id);
    Err(AccessError::forbidden("Your role does not allow this action"))
}

/// Owner memberships are immutable through the API. With
/// `superadmin_overrides` set, superadmins are exempt.
pub fn can_touch_owner(identity: &Identity, target_role: Role, superadmin_overrides: bool) -> bool {
    target_role != Role::Owner || (superadmin_overrides && identity.is_superadmin)
}

pub fn ensure_not_self(identity: &Identity, target_user: Uuid) -> AccessResult<()> {
    if identity.user_id() == target_user {
        return Err(AccessError::CannotRemoveSelf);
    }
    Ok(())
}

/// Seat check before adding a member. Counts only active members.
///
/// Check-then-act: two concurrent adds may both pass and exceed the limit by one.
pub fn ensure_seat_available(plan: Plan, active_members: i64) -> AccessResult<()> {
    let limit = plan.seat_limit();
    if active_members >= limit {
        return Err(AccessError::PlanLimitExceeded {
            limit,
            current: active_members,
        });
    }
    Ok(())
}
