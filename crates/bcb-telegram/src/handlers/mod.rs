//! Telegram update handlers.
//!
//! Each handler is a small adapter that:
//! - validates auth
//! - either answers a one-shot command or routes input to a live wizard
//! - replies through the `MessagingPort`, never through `Bot` directly

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};

use bcb_core::{
    audit::AuditEvent,
    domain::{ChatId, SessionKey, UserId},
    security::is_authorized,
};

use crate::router::AppState;

mod callback;
mod commands;
mod text;
mod wizard;

const UNAUTHORIZED: &str = "Unauthorized. Contact the bot owner for access.";

/// Who sent an update, and where.
#[derive(Clone, Debug)]
pub(crate) struct UserContext {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: String,
    pub private_chat: bool,
}

impl UserContext {
    fn from_message(msg: &Message) -> Option<Self> {
        let user = msg.from()?;
        Some(Self {
            chat_id: ChatId(msg.chat.id.0),
            user_id: UserId(user.id.0 as i64),
            username: user
                .username
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            private_chat: msg.chat.is_private(),
        })
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.chat_id, self.user_id)
    }
}

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    callback::handle_callback(q, state).await
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(ctx) = UserContext::from_message(&msg) else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };
    route_text(&state, &ctx, text).await;
    Ok(())
}

async fn route_text(state: &Arc<AppState>, ctx: &UserContext, text: &str) {
    if !is_authorized(Some(ctx.user_id), &state.cfg.telegram_allowed_users) {
        tracing::warn!(user_id = ctx.user_id.0, username = %ctx.username, "unauthorized message");
        state
            .audit
            .record(AuditEvent::auth(ctx.user_id.0, &ctx.username, false));
        send(state, ctx.chat_id, UNAUTHORIZED).await;
        return;
    }

    if text.starts_with('/') {
        commands::handle_command(state, ctx, text).await;
    } else {
        text::handle_text(state, ctx, text).await;
    }
}

pub(crate) async fn send(state: &AppState, chat_id: ChatId, html: &str) {
    if let Err(e) = state.messenger.send_html(chat_id, html).await {
        tracing::warn!(chat_id = chat_id.0, error = %e, "failed to send reply");
    }
}
