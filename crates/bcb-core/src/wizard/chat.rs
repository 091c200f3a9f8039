//! The conversation surface a wizard talks through.

use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{ChatId, MessageRef},
    formatting::escape_html,
    messaging::{
        port::MessagingPort,
        types::{InlineButton, InlineKeyboard},
    },
    wizard::{registry::SessionHandle, state::MenuOption},
    Result,
};

const CALLBACK_PREFIX: &str = "wiz";
const CANCEL_VALUE: &str = "cancel";

/// What a prompt wait resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    Selected(T),
    NoSelection,
    Timeout,
}

/// A user reply routed to a live session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// A button press on the menu numbered `menu` within its session.
    Selection { menu: u32, value: String },
    Cancel,
}

/// Per-prompt deadlines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WizardTimeouts {
    /// How long a menu waits for a press.
    pub menu: Duration,
    /// How long a free-text question waits for a reply.
    pub reply: Duration,
}

impl Default for WizardTimeouts {
    fn default() -> Self {
        Self {
            menu: Duration::from_secs(60),
            reply: Duration::from_secs(60),
        }
    }
}

/// Prompting surface consumed by the wizard controller.
///
/// Waits never fail on user behaviour: a missing reply is `Timeout`, a cancel is
/// `NoSelection`. `Err` is reserved for transport failures.
#[async_trait]
pub trait ChatInterface: Send {
    async fn present_menu(
        &mut self,
        prompt: &str,
        options: &[MenuOption],
    ) -> Result<WaitOutcome<String>>;

    async fn request_free_text(&mut self, prompt: &str) -> Result<WaitOutcome<String>>;

    /// Fire-and-forget; delivery failures are logged.
    async fn send(&mut self, message: &str);

    /// Best-effort removal of any menu still showing buttons.
    async fn disable_menus(&mut self);
}

/// Callback payload of a wizard button: `wiz:<session_id>:<menu>:<value>`.
///
/// `menu` numbers the menus of one session from 1, so a press can be matched
/// to the question that drew it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WizardCallback {
    pub session_id: u64,
    pub menu: u32,
    pub value: String,
}

impl WizardCallback {
    pub fn new(session_id: u64, menu: u32, value: impl Into<String>) -> Self {
        Self {
            session_id,
            menu,
            value: value.into(),
        }
    }

    pub fn cancel(session_id: u64, menu: u32) -> Self {
        Self::new(session_id, menu, CANCEL_VALUE)
    }

    pub fn is_cancel(&self) -> bool {
        self.value == CANCEL_VALUE
    }

    pub fn encode(&self) -> String {
        format!(
            "{CALLBACK_PREFIX}:{}:{}:{}",
            self.session_id, self.menu, self.value
        )
    }

    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.splitn(4, ':');
        if parts.next()? != CALLBACK_PREFIX {
            return None;
        }
        let session_id = parts.next()?.parse::<u64>().ok()?;
        let menu = parts.next()?.parse::<u32>().ok()?;
        let value = parts.next()?;
        if value.is_empty() {
            return None;
        }
        Some(Self::new(session_id, menu, value))
    }

    /// The reply this press stands for.
    pub fn into_reply(self) -> Reply {
        if self.is_cancel() {
            Reply::Cancel
        } else {
            Reply::Selection {
                menu: self.menu,
                value: self.value,
            }
        }
    }
}

/// `ChatInterface` over a `MessagingPort` plus the session's reply channel.
pub struct PortConversation {
    messenger: Arc<dyn MessagingPort>,
    chat_id: ChatId,
    session_id: u64,
    replies: mpsc::Receiver<Reply>,
    cancel: CancellationToken,
    /// Number of the menu awaiting a press, shared with the registry; 0 = none.
    pending_menu: Arc<AtomicU32>,
    menus_sent: u32,
    timeouts: WizardTimeouts,
    open_menus: Vec<MessageRef>,
}

impl PortConversation {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        handle: SessionHandle,
        timeouts: WizardTimeouts,
    ) -> Self {
        Self {
            messenger,
            chat_id: handle.key.chat_id,
            session_id: handle.id,
            replies: handle.replies,
            cancel: handle.cancel,
            pending_menu: handle.pending_menu,
            menus_sent: 0,
            timeouts,
            open_menus: Vec::new(),
        }
    }

    /// Wait for an answer to the current question.
    ///
    /// Presses on any menu other than `menu` are dropped and the wait goes on
    /// under the same deadline. A free-text question passes `None` and so only
    /// accepts typed text.
    async fn wait(&mut self, timeout: Duration, menu: Option<u32>) -> WaitOutcome<String> {
        let deadline = Instant::now() + timeout;
        loop {
            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return WaitOutcome::NoSelection,
                res = tokio::time::timeout_at(deadline, self.replies.recv()) => res,
            };
            match received {
                Err(_) => return WaitOutcome::Timeout,
                // Sender dropped: the registry replaced or forgot this session.
                Ok(None) | Ok(Some(Reply::Cancel)) => return WaitOutcome::NoSelection,
                Ok(Some(Reply::Text(t))) => return WaitOutcome::Selected(t),
                Ok(Some(Reply::Selection { menu: pressed, value })) => {
                    if Some(pressed) == menu {
                        return WaitOutcome::Selected(value);
                    }
                    tracing::debug!(
                        session_id = self.session_id,
                        menu = pressed,
                        "ignoring press on a spent menu"
                    );
                }
            }
        }
    }

    fn keyboard(&self, menu: u32, options: &[MenuOption]) -> InlineKeyboard {
        let buttons = options
            .iter()
            .map(|o| {
                InlineButton::new(
                    o.label.clone(),
                    WizardCallback::new(self.session_id, menu, o.value.clone()).encode(),
                )
            })
            .collect();
        let cancel = InlineButton::new(
            "✖ Cancel",
            WizardCallback::cancel(self.session_id, menu).encode(),
        );
        InlineKeyboard::grid(buttons, 2, Some(cancel))
    }

    /// Turn an answered menu into a recap of the answer. Editing drops the
    /// buttons; if the edit fails they are cleared instead.
    async fn close_menu(
        &mut self,
        menu: MessageRef,
        prompt: &str,
        options: &[MenuOption],
        answer: &str,
    ) {
        let wanted = answer.trim();
        let label = options
            .iter()
            .find(|o| o.value.eq_ignore_ascii_case(wanted) || o.label.eq_ignore_ascii_case(wanted))
            .map(|o| o.label.as_str())
            .unwrap_or(wanted);
        let recap = format!("{prompt}\n\n→ <b>{}</b>", escape_html(label));

        match self.messenger.edit_html(menu, &recap).await {
            Ok(()) => self.open_menus.retain(|m| *m != menu),
            Err(e) => {
                tracing::debug!(chat_id = menu.chat_id.0, error = %e, "recap edit failed");
                self.disable_menus().await;
            }
        }
    }
}

#[async_trait]
impl ChatInterface for PortConversation {
    async fn present_menu(
        &mut self,
        prompt: &str,
        options: &[MenuOption],
    ) -> Result<WaitOutcome<String>> {
        self.menus_sent += 1;
        let seq = self.menus_sent;
        let keyboard = self.keyboard(seq, options);
        let menu = self
            .messenger
            .send_inline_keyboard(self.chat_id, prompt, keyboard)
            .await?;
        self.open_menus.push(menu);

        self.pending_menu.store(seq, Ordering::Release);
        let outcome = self.wait(self.timeouts.menu, Some(seq)).await;
        self.pending_menu.store(0, Ordering::Release);

        if let WaitOutcome::Selected(answer) = &outcome {
            // An answered menu is spent whether or not the answer validates.
            self.close_menu(menu, prompt, options, answer).await;
        }
        Ok(outcome)
    }

    async fn request_free_text(&mut self, prompt: &str) -> Result<WaitOutcome<String>> {
        self.messenger.send_html(self.chat_id, prompt).await?;
        Ok(self.wait(self.timeouts.reply, None).await)
    }

    async fn send(&mut self, message: &str) {
        if let Err(e) = self.messenger.send_html(self.chat_id, message).await {
            tracing::warn!(chat_id = self.chat_id.0, error = %e, "failed to send wizard message");
        }
    }

    async fn disable_menus(&mut self) {
        let menus = std::mem::take(&mut self.open_menus);
        for menu in menus {
            if let Err(e) = self.messenger.clear_inline_keyboard(menu).await {
                tracing::debug!(chat_id = menu.chat_id.0, error = %e, "failed to disable menu");
            }
        }
    }
}
