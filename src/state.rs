use std::sync::Arc;
use std::time::Duration;

use crate::auth::credentials::CredentialVerifier;
use crate::auth::token::TokenService;
use crate::config::{AppConfig, SessionBackend};
use crate::directory::{Directory, MemoryDirectory, PgDirectory};
use crate::session::memory::MemorySessionStore;
use crate::session::redis::RedisSessionStore;
use crate::session::registry::SessionRegistry;
use crate::session::store::SessionStore;

/// Shared service handles threaded through routers and guards.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub registry: Arc<SessionRegistry>,
    pub directory: Arc<dyn Directory>,
    pub credentials: Arc<CredentialVerifier>,
    /// Session indirection is off in legacy cookie deployments.
    pub session_cookie_enabled: bool,
}

impl AppState {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let store: Arc<dyn SessionStore> = match cfg.session.backend {
            SessionBackend::Redis => {
                let timeout = Duration::from_millis(cfg.session.command_timeout_ms);
                match RedisSessionStore::new(&cfg.session.redis_url, timeout) {
                    Ok(store) => Arc::new(store),
                    Err(e) => {
                        // A bad URL is a config mistake; sessions degrade to
                        // process-local rather than taking auth down.
                        tracing::error!("redis session store unavailable ({}), using memory", e);
                        Arc::new(MemorySessionStore::new())
                    }
                }
            }
            SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
        };

        let directory: Arc<dyn Directory> = match std::env::var("DATABASE_URL") {
            Ok(url) => match PgDirectory::connect_lazy(&url) {
                Ok(pg) => Arc::new(pg),
                Err(e) => {
                    tracing::error!("directory unavailable ({}), using empty memory directory", e);
                    Arc::new(MemoryDirectory::new())
                }
            },
            Err(_) => Arc::new(MemoryDirectory::new()),
        };

        Self::assemble(cfg, store, directory)
    }

    /// Wire explicit store/directory implementations; used by tests and by
    /// embedders that manage their own pools.
    pub fn assemble(
        cfg: &AppConfig,
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new(
            store,
            Duration::from_secs(cfg.session.ttl_secs),
        ));
        let tokens = Arc::new(TokenService::new(&cfg.auth));
        let credentials = Arc::new(CredentialVerifier::new(directory.clone(), &cfg.auth));

        Self {
            tokens,
            registry,
            directory,
            credentials,
            session_cookie_enabled: !cfg.auth.cookie_carries_refresh,
        }
    }
}
