use once_cell::sync::Lazy;
use std::env;

use crate::invites::InviteList;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub gate: GateConfig,
    pub audit: AuditConfig,
    pub chatkit: ChatKitConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Which gate variant is active. One switch instead of parallel middlewares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Invite token in URL / `fm_invite` cookie (default).
    Token,
    /// HTTP basic auth against BASIC_AUTH_USER / BASIC_AUTH_PASS.
    Basic,
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub mode: GateMode,
    /// Allowlist parsed once at startup. The upstream deployment re-parsed
    /// the env string per request; we trade that live-reload for startup
    /// validation and an immutable snapshot.
    pub invites: InviteList,
    pub basic_auth_user: Option<String>,
    pub basic_auth_pass: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub ttl_days: u64,
    pub upstash_url: Option<String>,
    pub upstash_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatKitConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub public_key: String,
    pub workflow_id: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("NODE_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        };

        let invites = InviteList::parse(&env::var("INVITE_TOKENS").unwrap_or_default());
        if invites.is_empty() {
            // Fail-closed mode: every gated request will be sent to /login.
            tracing::warn!("INVITE_TOKENS is empty or unset; all gated traffic will be denied");
        }

        let mode = match env::var("GATE_MODE").as_deref() {
            Ok("basic") => GateMode::Basic,
            _ => GateMode::Token,
        };

        let ttl_days = env::var("AUDIT_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(14);

        Self {
            environment,
            gate: GateConfig {
                mode,
                invites,
                // Empty-string credentials count as unset: the basic-auth
                // gate is disabled, not enabled with empty values.
                basic_auth_user: non_empty_var("BASIC_AUTH_USER"),
                basic_auth_pass: non_empty_var("BASIC_AUTH_PASS"),
            },
            audit: AuditConfig {
                ttl_days,
                upstash_url: env::var("UPSTASH_REDIS_REST_URL").ok(),
                upstash_token: env::var("UPSTASH_REDIS_REST_TOKEN").ok(),
            },
            chatkit: ChatKitConfig {
                api_base: env::var("CHATKIT_API_BASE")
                    .unwrap_or_else(|_| "https://api.openai.com".to_string()),
                api_key: env::var("OPENAI_API_KEY").ok(),
                public_key: env::var("NEXT_PUBLIC_CHATKIT_PUBLIC_KEY").unwrap_or_default(),
                workflow_id: env::var("NEXT_PUBLIC_CHATKIT_WORKFLOW_ID").unwrap_or_default(),
            },
        }
    }

    /// Session cookies carry the Secure flag only in production, so local
    /// plain-http development keeps working.
    pub fn secure_cookies(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
