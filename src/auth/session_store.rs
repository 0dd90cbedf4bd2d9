//! Gateway-issued sessions with expiry and a background reaper
//!
//! Tokens are 256-bit random values, hex encoded. Expiry is checked on every
//! read, so the reaper only bounds memory; it is never needed for
//! correctness. The reaper is owned by the store: it starts with
//! [`SessionStore::new`] and stops on [`SessionStore::shutdown`] or drop.

use crate::error::{ManagerError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE_NAME: &str = "tt_session";

/// Default session lifetime
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default reaper period
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(10 * 60);

const TOKEN_BYTES: usize = 32;

/// A live session
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub owner: String,
    pub expires_at: Instant,
}

impl Session {
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

type SessionMap = Arc<RwLock<HashMap<String, Session>>>;

/// In-memory session table
#[derive(Debug)]
pub struct SessionStore {
    sessions: SessionMap,
    ttl: Duration,
    cancel: CancellationToken,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl SessionStore {
    /// Create a store and start its reaper. Must be called inside a Tokio runtime.
    pub fn new(ttl: Duration, reap_interval: Duration) -> Self {
        let sessions: SessionMap = Arc::new(RwLock::new(HashMap::new()));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(reap_loop(sessions.clone(), reap_interval, cancel.clone()));

        Self {
            sessions,
            ttl,
            cancel,
            reaper: Mutex::new(Some(handle)),
        }
    }

    /// Issue a new token for `owner`
    pub async fn create(&self, owner: impl Into<String>) -> Result<String> {
        let owner = owner.into();
        let mut sessions = self.sessions.write().await;

        // A token must never map to two sessions, even one already expired
        // but not yet reaped. Collisions are astronomically unlikely; retry.
        loop {
            let token = random_token()?;
            if let Entry::Vacant(slot) = sessions.entry(token.clone()) {
                slot.insert(Session {
                    token: token.clone(),
                    owner: owner.clone(),
                    expires_at: Instant::now() + self.ttl,
                });
                debug!(owner = %owner, "Session created");
                return Ok(token);
            }
        }
    }

    /// True iff the token is present and not yet expired
    pub async fn validate(&self, token: &str) -> bool {
        self.lookup(token).await.is_some()
    }

    /// Live session for `token`, if any
    pub async fn lookup(&self, token: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(token)?;
        if session.is_expired_at(Instant::now()) {
            return None;
        }
        Some(session.clone())
    }

    /// Remove a session. Unknown tokens are ignored.
    pub async fn destroy(&self, token: &str) {
        if self.sessions.write().await.remove(token).is_some() {
            debug!("Session destroyed");
        }
    }

    /// Remove every expired entry, returning how many were dropped
    pub async fn reap_expired(&self) -> usize {
        reap(&self.sessions).await
    }

    /// Number of stored sessions, expired-but-unreaped included
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stop the reaper and wait for it to finish
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.reaper.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Session reaper ended abnormally: {e}");
            }
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn reap(sessions: &SessionMap) -> usize {
    let now = Instant::now();
    let mut sessions = sessions.write().await;
    let before = sessions.len();
    sessions.retain(|_, session| !session.is_expired_at(now));
    before - sessions.len()
}

async fn reap_loop(sessions: SessionMap, period: Duration, cancel: CancellationToken) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Session reaper stopped");
                return;
            }
            _ = ticker.tick() => {
                let removed = reap(&sessions).await;
                if removed > 0 {
                    debug!(removed, "Reaped expired sessions");
                }
            }
        }
    }
}

fn random_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| ManagerError::internal(format!("random source failure: {e}")))?;
    Ok(hex::encode(bytes))
}
