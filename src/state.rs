use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Store;
use crate::notify::{Mailer, PushTransport};
use crate::services::{MemberService, PushService, SessionService, TeamService};

/// Everything a request handler may touch, built once per process.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub push: Arc<dyn PushTransport>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        push: Arc<dyn PushTransport>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            mailer,
            push,
            config: Arc::new(config),
        }
    }

    pub fn sessions(&self) -> SessionService {
        SessionService::new(self.store.clone(), self.mailer.clone(), self.config.clone())
    }

    pub fn teams(&self) -> TeamService {
        TeamService::new(self.store.clone())
    }

    pub fn members(&self) -> MemberService {
        MemberService::new(self.store.clone(), self.config.clone())
    }

    pub fn push_service(&self) -> PushService {
        PushService::new(self.store.clone(), self.push.clone(), self.config.notify.clone())
    }
}
