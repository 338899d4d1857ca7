use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub sessions: SessionConfig,
    pub invites: InviteConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    #[serde(skip_serializing)]
    pub internal_api_key: Option<String>,
    pub cors_origins: Vec<String>,
    /// Also match superadmin rows by email. Only for stores that still carry
    /// email-keyed rows from the old registry.
    pub legacy_email_superadmin: bool,
    /// Whether a superadmin may change or remove a tenant owner.
    pub superadmin_overrides_owner: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Destroy session rows on delete instead of setting `deleted_at`.
    pub hard_delete: bool,
    pub list_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteConfig {
    pub expiry_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(skip_serializing)]
    pub resend_api_key: Option<String>,
    pub email_api_url: String,
    pub email_from_address: String,
    pub chat_domain: String,
    pub push_relay_url: Option<String>,
    pub push_icon: String,
    pub push_badge: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Some(v) = env::var("DESK_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("INTERNAL_API_KEY") {
            self.security.internal_api_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_LEGACY_EMAIL_SUPERADMIN") {
            self.security.legacy_email_superadmin = v.parse().unwrap_or(self.security.legacy_email_superadmin);
        }
        if let Ok(v) = env::var("SECURITY_SUPERADMIN_OVERRIDES_OWNER") {
            self.security.superadmin_overrides_owner = v.parse().unwrap_or(self.security.superadmin_overrides_owner);
        }

        // Session overrides
        if let Ok(v) = env::var("SESSIONS_HARD_DELETE") {
            self.sessions.hard_delete = v.parse().unwrap_or(self.sessions.hard_delete);
        }
        if let Ok(v) = env::var("SESSIONS_LIST_LIMIT") {
            self.sessions.list_limit = v.parse().unwrap_or(self.sessions.list_limit);
        }

        // Invite overrides
        if let Ok(v) = env::var("INVITES_EXPIRY_DAYS") {
            self.invites.expiry_days = v.parse().unwrap_or(self.invites.expiry_days);
        }

        // Notification overrides
        if let Ok(v) = env::var("RESEND_API_KEY") {
            self.notify.resend_api_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Ok(v) = env::var("NOTIFY_EMAIL_API_URL") {
            self.notify.email_api_url = v;
        }
        if let Ok(v) = env::var("NOTIFY_EMAIL_FROM") {
            self.notify.email_from_address = v;
        }
        if let Ok(v) = env::var("NOTIFY_CHAT_DOMAIN") {
            self.notify.chat_domain = v;
        }
        if let Ok(v) = env::var("PUSH_RELAY_URL") {
            self.notify.push_relay_url = Some(v).filter(|u| !u.is_empty());
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7, // 1 week
                internal_api_key: None,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                legacy_email_superadmin: true,
                superadmin_overrides_owner: false,
            },
            sessions: SessionConfig::default(),
            invites: InviteConfig::default(),
            notify: NotifyConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                internal_api_key: None,
                cors_origins: vec!["https://staging.example.com".to_string()],
                legacy_email_superadmin: false,
                superadmin_overrides_owner: false,
            },
            sessions: SessionConfig::default(),
            invites: InviteConfig::default(),
            notify: NotifyConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: false,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                internal_api_key: None,
                cors_origins: vec!["https://app.example.com".to_string()],
                legacy_email_superadmin: false,
                superadmin_overrides_owner: false,
            },
            sessions: SessionConfig::default(),
            invites: InviteConfig::default(),
            notify: NotifyConfig::default(),
        }
    }

    /// Development preset without any environment lookups. Used by tests.
    pub fn for_tests(jwt_secret: &str) -> Self {
        let mut config = Self::development();
        config.security.jwt_secret = jwt_secret.to_string();
        config.security.internal_api_key = Some("test-internal-key".to_string());
        config.security.legacy_email_superadmin = false;
        config
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hard_delete: false,
            list_limit: 100,
        }
    }
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self { expiry_days: 7 }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            email_api_url: "https://api.resend.com/emails".to_string(),
            email_from_address: "support@example.com".to_string(),
            chat_domain: "example.com".to_string(),
            push_relay_url: None,
            push_icon: "/icons/icon-192x192.png".to_string(),
            push_badge: "/icons/icon-96x96.png".to_string(),
        }
    }
}

// Loaded once per process by the binaries; services receive it through AppState
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
