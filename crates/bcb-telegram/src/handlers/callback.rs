use std::sync::Arc;

use teloxide::prelude::*;

use bcb_core::{
    domain::{ChatId, MessageId, MessageRef, SessionKey, UserId},
    formatting::truncate_label,
    security::is_authorized,
    wizard::{Delivery, WizardCallback},
};

use crate::router::AppState;

const EXPIRED: &str = "This menu has expired.";
const BUSY: &str = "Still working on your last answer, try again.";

pub(crate) async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    let menu = q.message.as_ref().map(|m| MessageRef {
        chat_id: ChatId(m.chat.id.0),
        message_id: MessageId(m.id.0),
    });
    let data = q.data.clone().unwrap_or_default();
    let user_id = UserId(q.from.id.0 as i64);

    let answer = press(&state, user_id, menu, &data).await;
    if let Err(e) = state
        .messenger
        .answer_callback_query(&q.id, answer.as_deref())
        .await
    {
        tracing::debug!(error = %e, "failed to answer callback query");
    }
    Ok(())
}

/// Route one button press; returns the toast text for the callback answer.
async fn press(
    state: &AppState,
    user_id: UserId,
    menu: Option<MessageRef>,
    data: &str,
) -> Option<String> {
    if !is_authorized(Some(user_id), &state.cfg.telegram_allowed_users) {
        return Some("Unauthorized".to_string());
    }
    let (Some(menu), Some(cb)) = (menu, WizardCallback::parse(data)) else {
        tracing::debug!(data, "ignoring foreign callback");
        return None;
    };

    let key = SessionKey::new(menu.chat_id, user_id);
    let session_id = cb.session_id;
    let label = truncate_label(&cb.value, state.cfg.button_label_max_length);
    match state.registry.deliver_press(key, cb).await {
        Delivery::Routed => Some(format!("✓ {label}")),
        Delivery::Dropped => Some(BUSY.to_string()),
        Delivery::Stale | Delivery::NoSession => {
            // Answered, replaced, or finished: remove the dead buttons.
            tracing::debug!(chat_id = menu.chat_id.0, session_id, "stale wizard button");
            if let Err(e) = state.messenger.clear_inline_keyboard(menu).await {
                tracing::debug!(error = %e, "failed to clear stale menu");
            }
            Some(EXPIRED.to_string())
        }
    }
}
