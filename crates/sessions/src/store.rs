//! Session map and per-session transport state.
//!
//! The map is the only place sessions are inserted. Removal happens through
//! [`Session::close`], which deregisters the session from the map it was
//! created in, so every close path (DELETE, idle sweep, shutdown) goes
//! through the same hook.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use bc_domain::trace::TraceEvent;
use bc_protocol::JsonRpcNotification;

use crate::error::SessionError;
use crate::lifecycle::IdlePolicy;

/// Server→client notifications buffered per session before they are
/// dropped for lack of a reader.
const NOTIFY_BUFFER: usize = 64;

type SessionMap = RwLock<HashMap<String, Arc<Session>>>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One client connection. Owns the notification channel and the lock
/// that serializes its requests.
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    last_seen: Mutex<DateTime<Utc>>,
    closed: AtomicBool,
    shutdown: CancellationToken,
    request_lock: tokio::sync::Mutex<()>,
    notify_tx: mpsc::Sender<JsonRpcNotification>,
    notify_rx: Mutex<Option<mpsc::Receiver<JsonRpcNotification>>>,
    registry: Weak<SessionMap>,
}

impl Session {
    fn new(registry: Weak<SessionMap>) -> Self {
        let (notify_tx, notify_rx) = mpsc::channel(NOTIFY_BUFFER);
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            last_seen: Mutex::new(now),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            request_lock: tokio::sync::Mutex::new(()),
            notify_tx,
            notify_rx: Mutex::new(Some(notify_rx)),
            registry,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        *self.last_seen.lock()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn touch(&self) {
        *self.last_seen.lock() = Utc::now();
    }

    /// Wait for this session's turn. Requests on one session are handled
    /// one at a time, in the order they acquire the lock.
    pub async fn lock_requests(&self) -> tokio::sync::MutexGuard<'_, ()> {
        let guard = self.request_lock.lock().await;
        self.touch();
        guard
    }

    /// Queue a notification for the client. Returns `false` if the session
    /// is closed or its buffer is full.
    pub fn notify(&self, notification: JsonRpcNotification) -> bool {
        if self.is_closed() {
            return false;
        }
        match self.notify_tx.try_send(notification) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(session_id = %self.id, "notification buffer full, dropping");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Attach the single notification reader. `None` if another reader is
    /// already attached or the session is closed.
    pub fn take_notifications(self: &Arc<Self>) -> Option<NotificationStream> {
        if self.is_closed() {
            return None;
        }
        let rx = self.notify_rx.lock().take()?;
        Some(NotificationStream {
            rx: Some(rx),
            session: Arc::downgrade(self),
            shutdown: self.shutdown.clone(),
        })
    }

    /// Close the session and remove it from its store. Idempotent.
    pub fn close(&self, reason: &str) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown.cancel();
        if let Some(map) = self.registry.upgrade() {
            map.write().remove(&self.id);
        }
        tracing::debug!(session_id = %self.id, reason, "session closed");
        TraceEvent::SessionClosed {
            session_id: self.id.clone(),
            reason: reason.to_owned(),
            lifetime_secs: (Utc::now() - self.created_at).num_seconds(),
        }
        .emit();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Exclusive reader of a session's notifications. Hands the channel back
/// to the session when dropped so a client can reconnect its stream.
pub struct NotificationStream {
    rx: Option<mpsc::Receiver<JsonRpcNotification>>,
    session: Weak<Session>,
    shutdown: CancellationToken,
}

impl NotificationStream {
    /// Next notification, or `None` once the session is closed.
    pub async fn recv(&mut self) -> Option<JsonRpcNotification> {
        let rx = self.rx.as_mut()?;
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            msg = rx.recv() => msg,
        }
    }
}

impl Drop for NotificationStream {
    fn drop(&mut self) {
        if let (Some(rx), Some(session)) = (self.rx.take(), self.session.upgrade()) {
            *session.notify_rx.lock() = Some(rx);
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Concurrency-safe map `session_id → Session`.
pub struct SessionStore {
    sessions: Arc<SessionMap>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Resolve the session a request belongs to.
    ///
    /// - a live `session_id` returns that same session;
    /// - no id plus an `initialize` request creates and registers a new one;
    /// - anything else is [`SessionError::InvalidSession`].
    pub fn obtain_session(
        &self,
        session_id: Option<&str>,
        is_init_request: bool,
    ) -> Result<Arc<Session>, SessionError> {
        match session_id {
            Some(id) => {
                let session = self.get(id).ok_or(SessionError::InvalidSession)?;
                session.touch();
                Ok(session)
            }
            None if is_init_request => Ok(self.create()),
            None => Err(SessionError::InvalidSession),
        }
    }

    fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new(Arc::downgrade(&self.sessions)));
        self.sessions
            .write()
            .insert(session.id.clone(), Arc::clone(&session));

        tracing::info!(session_id = %session.id, "session created");
        TraceEvent::SessionCreated {
            session_id: session.id.clone(),
        }
        .emit();
        session
    }

    /// Look up a live session by id.
    pub fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Close a session if it exists. Never fails.
    pub fn close_session(&self, session_id: &str, reason: &str) {
        // Clone out of the map first: close() takes the write lock.
        let session = self.get(session_id);
        if let Some(session) = session {
            session.close(reason);
        }
    }

    /// Close every session idle beyond `policy`. Returns how many closed.
    pub fn prune_idle(&self, policy: &IdlePolicy) -> usize {
        let now = Utc::now();
        let expired: Vec<Arc<Session>> = self
            .sessions
            .read()
            .values()
            .filter(|s| policy.is_expired(s.last_seen(), now))
            .cloned()
            .collect();
        for session in &expired {
            session.close("idle timeout");
        }
        expired.len()
    }

    /// Close everything (server shutdown).
    pub fn close_all(&self) {
        let all: Vec<Arc<Session>> = self.sessions.read().values().cloned().collect();
        for session in all {
            session.close("server shutdown");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
