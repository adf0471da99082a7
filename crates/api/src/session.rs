//! Session-Remembered Filter Parameters
//!
//! Each browser session is identified by a UUID cookie. The store keeps the
//! last submitted filter values so the upload page and the export endpoint
//! can reuse them across requests. Entries idle for longer than the
//! configured timeout are dropped whenever a new session is stored.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "spike_session";
/// Idle time after which a session is forgotten
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(24 * 60 * 60);

/// Parameters remembered between requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParams {
    /// Name of the last uploaded file
    pub uploaded_file_name: String,
    /// Export start date, `DD/MM/YYYY`
    pub start_date: String,
    /// Export end date, `DD/MM/YYYY`
    pub end_date: String,
    /// Rate-of-change threshold as submitted
    pub rate_of_change: String,
    /// Selected station id as submitted
    pub station_id: String,
}

#[derive(Debug)]
struct SessionEntry {
    params: SessionParams,
    last_seen: Instant,
}

/// In-memory session store
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_SESSION_IDLE)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    fn is_expired(&self, entry: &SessionEntry, now: Instant) -> bool {
        now.duration_since(entry.last_seen) > self.idle_timeout
    }

    /// Parameters of a session, empty if it has none yet or has expired
    pub async fn get(&self, id: &Uuid) -> SessionParams {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(entry) if !self.is_expired(entry, now) => {
                entry.last_seen = now;
                entry.params.clone()
            }
            _ => SessionParams::default(),
        }
    }

    /// Modify a session's parameters and return the updated copy
    pub async fn update<F>(&self, id: Uuid, apply: F) -> SessionParams
    where
        F: FnOnce(&mut SessionParams),
    {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let live = sessions
            .get(&id)
            .is_some_and(|entry| !self.is_expired(entry, now));
        if !live {
            let before = sessions.len();
            sessions.retain(|_, entry| !self.is_expired(entry, now));
            if sessions.len() < before {
                debug!(dropped = before - sessions.len(), "idle sessions expired");
            }
        }

        let entry = sessions.entry(id).or_insert_with(|| SessionEntry {
            params: SessionParams::default(),
            last_seen: now,
        });
        entry.last_seen = now;
        apply(&mut entry.params);
        debug!(session = %id, "session parameters updated");
        entry.params.clone()
    }

    /// Number of sessions holding parameters
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Session handle resolved from the request cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub id: Uuid,
    /// The request carried no valid session cookie
    pub is_new: bool,
}

impl Session {
    /// Resolve the session from request headers, minting a new id if absent
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let existing = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok());

        match existing {
            Some(id) => Self { id, is_new: false },
            None => Self {
                id: Uuid::new_v4(),
                is_new: true,
            },
        }
    }

    /// `Set-Cookie` value establishing this session
    pub fn cookie(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&format!(
            "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
            self.id
        ))
        .ok()
    }

    /// Attach the session cookie to a response when the session is new
    pub fn attach(&self, mut response: Response) -> Response {
        if self.is_new {
            if let Some(cookie) = self.cookie() {
                response.headers_mut().append(SET_COOKIE, cookie);
            }
        }
        response
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
