use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::access::guard::{can_view, ensure_manage, ensure_view};
use crate::access::{AccessError, AccessResult, Identity};
use crate::config::AppConfig;
use crate::database::models::{
    Assignment, ChatMessage, ChatSession, Escalation, MessageRole, NewEscalation, NewMessage,
    SenderType, SessionFilter, SessionListItem,
};
use crate::database::Store;
use crate::notify::{GuestReply, Mailer};

/// Target of an `assign` action. Naming neither a user nor a team unassigns.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub to_user_id: Option<Uuid>,
    pub to_team_id: Option<Uuid>,
    pub reason: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SessionAction {
    MarkAsRead,
    MarkAsUnread,
    Assign(AssignRequest),
    Delete,
}

impl SessionAction {
    pub fn parse(action: &str, data: Option<Value>) -> AccessResult<Self> {
        match action {
            "markAsRead" => Ok(SessionAction::MarkAsRead),
            "markAsUnread" => Ok(SessionAction::MarkAsUnread),
            "delete" => Ok(SessionAction::Delete),
            "assign" => {
                let request = match data {
                    None | Some(Value::Null) => AssignRequest::default(),
                    Some(v) => serde_json::from_value(v)
                        .map_err(|e| AccessError::validation("data", format!("Invalid assign data: {}", e)))?,
                };
                Ok(SessionAction::Assign(request))
            }
            other => Err(AccessError::UnknownAction(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionAction::MarkAsRead => "markAsRead",
            SessionAction::MarkAsUnread => "markAsUnread",
            SessionAction::Assign(_) => "assign",
            SessionAction::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation: Option<Escalation>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyOutcome {
    pub message: ChatMessage,
    pub email_sent: bool,
}

/// State transitions of a chat session, each gated by the access guard.
///
/// A session outside the caller's scope is reported as not found, never as
/// forbidden. Role shortfalls on a visible session are forbidden.
pub struct SessionService {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    config: Arc<AppConfig>,
}

impl SessionService {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: Arc<AppConfig>) -> Self {
        Self { store, mailer, config }
    }

    async fn visible_session(&self, identity: &Identity, session_id: Uuid) -> AccessResult<ChatSession> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or(AccessError::NotFound("Session"))?;

        if !can_view(identity, session.customer_id) {
            debug!("Session {} hidden from {}", session_id, identity.user_id());
            return Err(AccessError::NotFound("Session"));
        }
        Ok(session)
    }

    /// Resolves an optional customer filter against the identity's scope.
    /// `Some(empty)` means nothing is in scope.
    fn scope_filter(&self, identity: &Identity, customer_id: Option<Uuid>) -> AccessResult<Option<Vec<Uuid>>> {
        match customer_id {
            Some(c) => {
                ensure_view(identity, c)?;
                Ok(Some(vec![c]))
            }
            None if identity.is_superadmin => Ok(None),
            None => Ok(identity.accessible.as_filter()),
        }
    }

    pub async fn list(&self, identity: &Identity, customer_id: Option<Uuid>) -> AccessResult<Vec<SessionListItem>> {
        let customer_ids = self.scope_filter(identity, customer_id)?;
        if customer_ids.as_ref().is_some_and(|ids| ids.is_empty()) {
            return Ok(Vec::new());
        }

        let filter = SessionFilter {
            customer_ids,
            limit: self.config.sessions.list_limit,
        };
        Ok(self.store.list_sessions(filter).await?)
    }

    pub async fn messages(&self, identity: &Identity, session_id: Uuid) -> AccessResult<Vec<ChatMessage>> {
        let session = self.visible_session(identity, session_id).await?;
        Ok(self.store.list_messages(session.id).await?)
    }

    pub async fn escalations(&self, identity: &Identity, session_id: Uuid) -> AccessResult<Vec<Escalation>> {
        let session = self.visible_session(identity, session_id).await?;
        Ok(self.store.list_escalations(session.id).await?)
    }

    pub async fn apply(&self, identity: &Identity, session_id: Uuid, action: SessionAction) -> AccessResult<SessionOutcome> {
        let name = action.name();
        let escalation = match action {
            SessionAction::MarkAsRead => {
                self.mark_as_read(identity, session_id).await?;
                None
            }
            SessionAction::MarkAsUnread => {
                self.mark_as_unread(identity, session_id).await?;
                None
            }
            SessionAction::Assign(request) => Some(self.assign(identity, session_id, request).await?),
            SessionAction::Delete => {
                self.delete(identity, session_id).await?;
                None
            }
        };
        Ok(SessionOutcome { action: name, escalation })
    }

    pub async fn mark_as_read(&self, identity: &Identity, session_id: Uuid) -> AccessResult<()> {
        let session = self.visible_session(identity, session_id).await?;
        self.store.mark_read(session.id, identity.user_id(), Utc::now()).await?;
        Ok(())
    }

    pub async fn mark_as_unread(&self, identity: &Identity, session_id: Uuid) -> AccessResult<()> {
        let session = self.visible_session(identity, session_id).await?;
        self.store.mark_unread(session.id).await?;
        Ok(())
    }

    /// Marks every unread session in scope as read. Returns the number changed.
    pub async fn mark_all_as_read(&self, identity: &Identity, customer_id: Option<Uuid>) -> AccessResult<u64> {
        let customer_ids = self.scope_filter(identity, customer_id)?;
        if customer_ids.as_ref().is_some_and(|ids| ids.is_empty()) {
            return Ok(0);
        }

        let changed = self
            .store
            .mark_all_read(customer_ids, identity.user_id(), Utc::now())
            .await?;
        info!("{} marked {} session(s) as read", identity.user_id(), changed);
        Ok(changed)
    }

    /// Hands the session to a user or a team and appends the audit entry.
    ///
    /// Both writes are always attempted. If only one lands the caller gets
    /// `AssignmentIncomplete` instead of a silent success.
    pub async fn assign(&self, identity: &Identity, session_id: Uuid, request: AssignRequest) -> AccessResult<Escalation> {
        let session = self.visible_session(identity, session_id).await?;
        ensure_manage(identity, session.customer_id)?;

        if request.to_user_id.is_some() && request.to_team_id.is_some() {
            return Err(AccessError::validation("data", "Assign to a user or a team, not both"));
        }
        if let Some(team_id) = request.to_team_id {
            if self.store.get_team(session.customer_id, team_id).await?.is_none() {
                return Err(AccessError::validation("toTeamId", "Team does not belong to this customer"));
            }
        }

        let escalation_level = if session.is_assigned() {
            session.escalation_level.max(0) + 1
        } else {
            1
        };

        let updated = self
            .store
            .update_assignment(
                session.id,
                Assignment {
                    user_id: request.to_user_id,
                    team_id: request.to_team_id,
                    escalation_level,
                },
            )
            .await;
        if let Err(e) = &updated {
            error!("Failed to update assignment of session {}: {}", session.id, e);
        }

        let audit = self
            .store
            .insert_escalation(NewEscalation {
                session_id: session.id,
                from_user_id: session.assigned_user_id,
                from_team_id: session.assigned_team_id,
                to_user_id: request.to_user_id,
                to_team_id: request.to_team_id,
                reason: request.reason,
                note: request.note,
                created_by: identity.user_id(),
            })
            .await;

        match (updated, audit) {
            (Ok(()), Ok(escalation)) => {
                info!(
                    "Session {} assigned by {} (level {})",
                    session.id,
                    identity.user_id(),
                    escalation_level
                );
                Ok(escalation)
            }
            (Err(_), Ok(_)) => Err(AccessError::AssignmentIncomplete {
                assignment_saved: false,
                audit_saved: true,
            }),
            (Ok(()), Err(e)) => {
                error!("Failed to record escalation for session {}: {}", session.id, e);
                Err(AccessError::AssignmentIncomplete {
                    assignment_saved: true,
                    audit_saved: false,
                })
            }
            (Err(e), Err(audit_err)) => {
                error!("Failed to record escalation for session {}: {}", session.id, audit_err);
                Err(AccessError::Store(e))
            }
        }
    }

    /// Soft delete unless hard deletes are configured.
    pub async fn delete(&self, identity: &Identity, session_id: Uuid) -> AccessResult<()> {
        let session = self.visible_session(identity, session_id).await?;
        ensure_manage(identity, session.customer_id)?;

        if self.config.sessions.hard_delete {
            self.store.hard_delete_session(session.id).await?;
            info!("Session {} hard-deleted by {}", session.id, identity.user_id());
        } else {
            self.store.soft_delete_session(session.id, Utc::now()).await?;
            info!("Session {} deleted by {}", session.id, identity.user_id());
        }
        Ok(())
    }

    /// Posts a staff message. Everything after the message insert is best effort.
    pub async fn reply(&self, identity: &Identity, session_id: Uuid, message: &str) -> AccessResult<ReplyOutcome> {
        let session = self.visible_session(identity, session_id).await?;
        if message.trim().is_empty() {
            return Err(AccessError::validation("message", "Message is required"));
        }

        let saved = self
            .store
            .insert_message(NewMessage {
                session_id: session.id,
                role: MessageRole::Assistant,
                sender_type: SenderType::Human,
                content: message.to_string(),
            })
            .await
            .map_err(|e| {
                error!("Failed to save reply for session {}: {}", session.id, e);
                AccessError::Store(e)
            })?;

        if let Err(e) = self.store.touch_after_reply(session.id, Utc::now()).await {
            warn!("Failed to update session {} after reply: {}", session.id, e);
        }
        match self.store.mark_notifications_handled(session.id).await {
            Ok(n) => debug!("Marked {} notification(s) handled for session {}", n, session.id),
            Err(e) => warn!("Failed to mark notifications for session {}: {}", session.id, e),
        }

        let email_sent = match session.guest_email.as_deref().map(str::trim) {
            Some(to) if !to.is_empty() => self.dispatch_guest_email(&session, to, message),
            _ => false,
        };

        Ok(ReplyOutcome {
            message: saved,
            email_sent,
        })
    }

    /// Spawns the guest email. Returns whether a dispatch was started.
    fn dispatch_guest_email(&self, session: &ChatSession, to: &str, message: &str) -> bool {
        if !self.mailer.is_enabled() {
            info!("Email API key not configured; skipping guest reply email for {}", session.id);
            return false;
        }

        let store = Arc::clone(&self.store);
        let mailer = Arc::clone(&self.mailer);
        let config = Arc::clone(&self.config);
        let customer_id = session.customer_id;
        let session_id = session.id;
        let guest_name = session.guest_name.clone();
        let to = to.to_string();
        let message = message.to_string();

        tokio::spawn(async move {
            let customer = match store.get_customer(customer_id).await {
                Ok(Some(c)) => c,
                Ok(None) => {
                    warn!("Customer {} missing; guest email for {} not sent", customer_id, session_id);
                    return;
                }
                Err(e) => {
                    warn!("Customer lookup failed; guest email for {} not sent: {}", session_id, e);
                    return;
                }
            };
            let email = GuestReply {
                to,
                guest_name,
                customer_name: customer.name,
                customer_slug: customer.slug,
                message,
            }
            .render(&config.notify);

            if let Err(e) = mailer.send(email).await {
                warn!("Guest reply email for session {} failed: {}", session_id, e);
            }
        });
        true
    }
}
