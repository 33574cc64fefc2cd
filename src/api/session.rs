//! Session credentials and the refresh-and-retry protocol.
//!
//! Callers snapshot the credential (token + version) before a request. When a
//! request comes back unauthorized, they hand that version to
//! `refresh_after`: the first caller through performs the refresh, and every
//! concurrent caller waits on the same lock, then finds the version already
//! advanced and reuses the fresh token. Each request retries at most once; a
//! refresh failure terminates the session (credentials cleared, event
//! emitted).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::errors::{DirectoryError, DirectoryResult};
use crate::events::{ControllerEvent, EventBus};
use crate::logger::{self, LogTag};
use crate::persistence::LocalStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// External collaborator that exchanges a refresh token for a new pair.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> DirectoryResult<TokenPair>;
}

/// Credential snapshot handed to the request layer.
#[derive(Debug, Clone)]
pub struct Credential {
    pub access_token: String,
    pub version: u64,
}

pub struct SessionManager {
    provider: Arc<dyn AuthProvider>,
    store: Arc<LocalStore>,
    tokens: RwLock<Option<TokenPair>>,
    /// Bumped on every token install or clear; used to detect that another
    /// caller already completed a refresh.
    version: AtomicU64,
    refresh_lock: Mutex<()>,
    events: EventBus,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn AuthProvider>, store: Arc<LocalStore>, events: EventBus) -> Self {
        let tokens = store.state().tokens;
        Self {
            provider,
            store,
            tokens: RwLock::new(tokens),
            version: AtomicU64::new(1),
            refresh_lock: Mutex::new(()),
            events,
        }
    }

    pub fn credential(&self) -> Option<Credential> {
        let tokens = self.tokens.read();
        tokens.as_ref().map(|pair| Credential {
            access_token: pair.access_token.clone(),
            version: self.version.load(Ordering::SeqCst),
        })
    }

    pub async fn sign_in(&self, pair: TokenPair) -> DirectoryResult<()> {
        self.install(pair).await
    }

    pub async fn sign_out(&self) -> DirectoryResult<()> {
        self.clear_credentials().await
    }

    /// Run (or wait for) the single refresh cycle after an unauthorized
    /// response that used credential version `seen_version`. Returns the
    /// access token to retry with.
    pub async fn refresh_after(&self, seen_version: u64) -> DirectoryResult<String> {
        let _guard = self.refresh_lock.lock().await;

        // Another request that failed for the same reason may have finished
        // the refresh while this one waited for the lock.
        if self.version.load(Ordering::SeqCst) != seen_version {
            if let Some(credential) = self.credential() {
                return Ok(credential.access_token);
            }
            return Err(DirectoryError::SessionExpired);
        }

        let refresh_token = {
            let tokens = self.tokens.read();
            match tokens.as_ref() {
                Some(pair) => pair.refresh_token.clone(),
                None => return Err(DirectoryError::SessionExpired),
            }
        };

        match self.provider.refresh(&refresh_token).await {
            Ok(pair) => {
                let access = pair.access_token.clone();
                self.install(pair).await?;
                logger::info(LogTag::Session, "credential refreshed");
                Ok(access)
            }
            Err(err) => {
                logger::warning(
                    LogTag::Session,
                    &format!("credential refresh failed, ending session: {}", err),
                );
                self.clear_credentials().await?;
                self.events.emit(ControllerEvent::SessionExpired);
                Err(DirectoryError::SessionExpired)
            }
        }
    }

    async fn install(&self, pair: TokenPair) -> DirectoryResult<()> {
        {
            let mut tokens = self.tokens.write();
            *tokens = Some(pair.clone());
        }
        self.version.fetch_add(1, Ordering::SeqCst);
        self.store
            .update(move |state| state.tokens = Some(pair))
            .await
    }

    async fn clear_credentials(&self) -> DirectoryResult<()> {
        {
            let mut tokens = self.tokens.write();
            *tokens = None;
        }
        self.version.fetch_add(1, Ordering::SeqCst);
        self.store.update(|state| state.tokens = None).await
    }
}
