use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc,
    },
};

use tokio::sync::{
    mpsc::{self, error::TrySendError},
    Mutex,
};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::SessionKey,
    errors::Recovery,
    wizard::{
        chat::{ChatInterface, Reply, WizardCallback},
        controller::WizardController,
    },
    Result,
};

const REPLY_BUFFER: usize = 8;

/// Where a routed reply ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Queued for (or, for a cancel, applied to) the live session.
    Routed,
    /// Nobody under this key is running a wizard.
    NoSession,
    /// The press came from a menu that is no longer waiting for an answer.
    Stale,
    /// The session exists but its reply queue is full.
    Dropped,
}

struct LiveSession {
    id: u64,
    replies: mpsc::Sender<Reply>,
    cancel: CancellationToken,
    pending_menu: Arc<AtomicU32>,
}

/// The receiving half of a freshly registered session.
pub struct SessionHandle {
    pub key: SessionKey,
    pub id: u64,
    pub replies: mpsc::Receiver<Reply>,
    pub cancel: CancellationToken,
    /// Number of the menu currently awaiting a press (0 when none is).
    pub pending_menu: Arc<AtomicU32>,
}

/// Live wizard sessions keyed by (chat, user).
///
/// Each entry only routes replies; the session state itself lives in the task
/// driving it. Entries are removed when that task reaches a terminal state.
pub struct SessionRegistry {
    next_id: AtomicU64,
    sessions: Mutex<HashMap<SessionKey, LiveSession>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

impl SessionRegistry {
    /// Register a new session for `key`, cancelling any session it replaces.
    pub async fn begin(&self, key: SessionKey) -> SessionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(REPLY_BUFFER);
        let cancel = CancellationToken::new();
        let pending_menu = Arc::new(AtomicU32::new(0));

        let previous = self.sessions.lock().await.insert(
            key,
            LiveSession {
                id,
                replies: tx,
                cancel: cancel.clone(),
                pending_menu: pending_menu.clone(),
            },
        );
        if let Some(old) = previous {
            tracing::info!(
                chat_id = key.chat_id.0,
                user_id = key.user_id.0,
                session_id = old.id,
                "replacing running wizard"
            );
            old.cancel.cancel();
        }

        SessionHandle {
            key,
            id,
            replies: rx,
            cancel,
            pending_menu,
        }
    }

    /// Route a typed reply (or a cancel) to the session owned by `key`.
    pub async fn deliver(&self, key: SessionKey, reply: Reply) -> Delivery {
        let sessions = self.sessions.lock().await;
        let Some(live) = sessions.get(&key) else {
            return Delivery::NoSession;
        };
        Self::route(live, reply)
    }

    /// Route a button press, but only to the session and menu that drew it.
    pub async fn deliver_press(&self, key: SessionKey, press: WizardCallback) -> Delivery {
        let sessions = self.sessions.lock().await;
        let Some(live) = sessions.get(&key) else {
            return Delivery::NoSession;
        };
        if live.id != press.session_id {
            return Delivery::Stale;
        }
        // Cancel works from any menu of the running session.
        if !press.is_cancel() && live.pending_menu.load(Ordering::Acquire) != press.menu {
            return Delivery::Stale;
        }
        Self::route(live, press.into_reply())
    }

    fn route(live: &LiveSession, reply: Reply) -> Delivery {
        if reply == Reply::Cancel {
            live.cancel.cancel();
            return Delivery::Routed;
        }
        match live.replies.try_send(reply) {
            Ok(()) => Delivery::Routed,
            Err(TrySendError::Full(_)) => {
                tracing::debug!(session_id = live.id, "reply queue full, dropping reply");
                Delivery::Dropped
            }
            // The task is gone but has not unregistered yet.
            Err(TrySendError::Closed(_)) => Delivery::NoSession,
        }
    }

    pub async fn cancel(&self, key: SessionKey) -> bool {
        self.deliver(key, Reply::Cancel).await == Delivery::Routed
    }

    /// Forget `key` if it still belongs to `session_id`.
    pub async fn finish(&self, key: SessionKey, session_id: u64) {
        let mut sessions = self.sessions.lock().await;
        if sessions.get(&key).is_some_and(|live| live.id == session_id) {
            sessions.remove(&key);
        }
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// The reply channel of the session under `key`, skipping every routing check.
    #[cfg(test)]
    pub(crate) async fn sender(&self, key: SessionKey) -> Option<mpsc::Sender<Reply>> {
        self.sessions
            .lock()
            .await
            .get(&key)
            .map(|live| live.replies.clone())
    }
}

/// Drive one wizard session to a terminal state.
///
/// Always unregisters the session and tells the user how it ended. Returns the
/// final message on completion.
pub async fn run_wizard<C>(
    registry: &SessionRegistry,
    key: SessionKey,
    session_id: u64,
    chat: &mut C,
) -> Result<String>
where
    C: ChatInterface + ?Sized,
{
    tracing::info!(
        chat_id = key.chat_id.0,
        user_id = key.user_id.0,
        session_id,
        "wizard started"
    );

    let mut controller = WizardController::new();
    let outcome = controller.run(chat).await;
    registry.finish(key, session_id).await;

    match &outcome {
        Ok(_) => tracing::info!(session_id, "wizard completed"),
        Err(err) => {
            match err.recovery() {
                Recovery::Terminate => {
                    tracing::info!(session_id, step = ?controller.step(), "wizard ended: {err}")
                }
                _ => tracing::error!(session_id, error = %err, "wizard failed"),
            }
            chat.disable_menus().await;
            chat.send(&err.user_message()).await;
        }
    }
    outcome
}
