//! Process-wide login session.
//!
//! One `SessionStore` per process holds the bearer token and its expiry.
//! Every API call reads the token from here; nothing else keeps a copy.
//! Login installs a session, logout tears it down, and an expired or
//! server-rejected token is cleared the same way.
//!
//! Key properties:
//! - Token bytes are zeroed when the session is dropped or replaced
//! - The token never appears in `Debug` output or logs
//! - Optional persistence to a JSON file so the CLI survives restarts

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Backend tokens are issued for 24 hours.
pub const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Not signed in")]
    NotSignedIn,
    #[error("Session expired at {0}")]
    Expired(DateTime<Utc>),
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// The signed-in account, as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

// ═══════════════════════════════════════════════════════════
// Session: token + expiry
// ═══════════════════════════════════════════════════════════

#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    token: String,
    #[zeroize(skip)]
    expires_at: DateTime<Utc>,
    #[zeroize(skip)]
    user: Option<SessionUser>,
}

impl Session {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>, user: Option<SessionUser>) -> Self {
        Self {
            token: token.into(),
            expires_at,
            user,
        }
    }

    /// Session for a token issued at `issued_at` with the standard lifetime.
    pub fn issued(token: impl Into<String>, issued_at: DateTime<Utc>, user: Option<SessionUser>) -> Self {
        Self::new(token, issued_at + Duration::hours(SESSION_TTL_HOURS), user)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════
// SessionStore
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct SessionStore {
    current: RwLock<Option<Session>>,
    /// Where the session is persisted, if anywhere.
    file: Option<PathBuf>,
}

impl SessionStore {
    /// In-memory store, nothing written to disk.
    pub fn new() -> Self {
        Self::default()
    }

    /// File-backed store. Loads a previously saved session if one exists;
    /// an expired saved session is discarded.
    pub fn open(file: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let file = file.into();
        let saved = load_session(&file)?;
        let store = Self {
            current: RwLock::new(None),
            file: Some(file),
        };

        match saved {
            Some(session) if !session.is_expired(Utc::now()) => {
                *store.write()? = Some(session);
            }
            Some(_) => {
                tracing::info!("Discarding expired saved session");
                store.remove_file()?;
            }
            None => {}
        }
        Ok(store)
    }

    /// Install a new session, replacing (and zeroing) any previous one.
    pub fn login(&self, session: Session) -> Result<(), SessionError> {
        if let Some(path) = &self.file {
            save_session(path, &session)?;
        }
        tracing::info!(expires_at = %session.expires_at, "Session started");
        *self.write()? = Some(session);
        Ok(())
    }

    /// Tear down the session. Safe to call when already signed out.
    pub fn logout(&self) -> Result<(), SessionError> {
        let previous = self.write()?.take();
        self.remove_file()?;
        if previous.is_some() {
            tracing::info!("Session cleared");
        }
        Ok(())
    }

    /// Token for the `Authorization` header. An expired session is cleared
    /// before reporting the expiry.
    pub fn bearer(&self, now: DateTime<Utc>) -> Result<Zeroizing<String>, SessionError> {
        let expired_at = {
            let guard = self.current.read().map_err(|_| SessionError::LockPoisoned)?;
            match guard.as_ref() {
                None => return Err(SessionError::NotSignedIn),
                Some(s) if s.is_expired(now) => s.expires_at,
                Some(s) => return Ok(Zeroizing::new(s.token.clone())),
            }
        };

        self.logout()?;
        Err(SessionError::Expired(expired_at))
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.current
            .read()
            .map(|guard| guard.as_ref().is_some_and(|s| !s.is_expired(now)))
            .unwrap_or(false)
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.current
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().and_then(|s| s.user.clone()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Option<Session>>, SessionError> {
        self.current.write().map_err(|_| SessionError::LockPoisoned)
    }

    fn remove_file(&self) -> Result<(), SessionError> {
        match &self.file {
            Some(path) if path.exists() => Ok(fs::remove_file(path)?),
            _ => Ok(()),
        }
    }
}

fn load_session(path: &Path) -> Result<Option<Session>, SessionError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = Zeroizing::new(fs::read_to_string(path)?);
    Ok(Some(serde_json::from_str(&raw)?))
}

fn save_session(path: &Path, session: &Session) -> Result<(), SessionError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let raw = Zeroizing::new(serde_json::to_string(session)?);
    fs::write(path, raw.as_bytes())?;
    Ok(())
}
