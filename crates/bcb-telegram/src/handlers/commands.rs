use std::sync::Arc;

use bcb_core::{
    audit::AuditEvent,
    calculator::{self, CONVERT_USAGE, OPERATION_USAGE},
    formatting::escape_html,
};

use crate::router::AppState;

use super::{send, wizard, UserContext};

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

fn help_text() -> String {
    format!(
        "🔢 <b>Base Calculator Bot</b>\n\n\
Works with numbers in bases 2, 8, 10 and 16.\n\n\
<b>📋 Commands:</b>\n\
/wizard - Step-by-step calculation with buttons\n\
/cancel - Stop the running wizard\n\
<code>{}</code>\n\
<code>{}</code>\n\
/ping - Check that the bot is alive\n\
/help - Show this message\n\n\
<b>💡 Operations:</b> convert, add, sub, mul, div, and, or, xor\n\
<b>Example:</b> <code>/convert ff 16 2</code>",
        escape_html(CONVERT_USAGE),
        escape_html(OPERATION_USAGE),
    )
}

pub(crate) async fn handle_command(state: &Arc<AppState>, ctx: &UserContext, text: &str) {
    let (cmd, args) = parse_command(text);
    tracing::debug!(user_id = ctx.user_id.0, command = %cmd, "command");

    match cmd.as_str() {
        "start" | "help" => send(state, ctx.chat_id, &help_text()).await,

        "ping" => send(state, ctx.chat_id, "🏓 Pong! Bot is working!").await,

        "convert" | "operation" => {
            let result = if cmd == "convert" {
                calculator::convert_command(&args)
            } else {
                calculator::operation_command(&args)
            };
            let reply = calculator::reply_text(result);
            send(state, ctx.chat_id, &reply).await;
            state.audit.record(AuditEvent::command(
                ctx.user_id.0,
                &ctx.username,
                &cmd,
                &args,
                &reply,
            ));
        }

        "wizard" => {
            wizard::start_wizard(state, ctx).await;
        }

        "cancel" => {
            // The session task reports the cancellation itself.
            if !state.registry.cancel(ctx.key()).await {
                send(state, ctx.chat_id, "No wizard is running.").await;
            }
        }

        _ => {
            let reply = format!(
                "Unknown command <code>/{}</code>. Send /help for the list.",
                escape_html(&cmd)
            );
            send(state, ctx.chat_id, &reply).await;
        }
    }
}
