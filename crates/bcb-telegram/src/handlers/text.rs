use bcb_core::wizard::{Delivery, Reply};

use crate::router::AppState;

use super::{send, UserContext};

const HINT: &str = "Send /wizard for a guided calculation, or /help for all commands.";

/// Plain text either answers the user's running wizard or gets a hint.
pub(crate) async fn handle_text(state: &AppState, ctx: &UserContext, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    match state
        .registry
        .deliver(ctx.key(), Reply::Text(text.to_string()))
        .await
    {
        Delivery::Routed => {}
        Delivery::Dropped | Delivery::Stale => {
            tracing::debug!(chat_id = ctx.chat_id.0, "wizard busy, text dropped");
        }
        // Group chats carry conversation that is not meant for the bot.
        Delivery::NoSession if ctx.private_chat => send(state, ctx.chat_id, HINT).await,
        Delivery::NoSession => {}
    }
}
