use std::sync::Arc;

use tokio::task::JoinHandle;

use bcb_core::{
    audit::AuditEvent,
    errors::Error,
    wizard::{run_wizard, PortConversation},
};

use crate::router::AppState;

use super::UserContext;

/// Start a wizard for this user, replacing any session they already had.
///
/// The session runs in its own task; this returns once it is registered.
pub(crate) async fn start_wizard(state: &Arc<AppState>, ctx: &UserContext) -> JoinHandle<()> {
    let key = ctx.key();
    let handle = state.registry.begin(key).await;
    let session_id = handle.id;
    let mut chat = PortConversation::new(
        state.messenger.clone(),
        handle,
        state.cfg.wizard_timeouts(),
    );

    let state = state.clone();
    let ctx = ctx.clone();
    tokio::spawn(async move {
        let outcome = run_wizard(&state.registry, key, session_id, &mut chat).await;
        let (user_id, username) = (ctx.user_id.0, ctx.username.as_str());
        let event = match &outcome {
            Ok(message) => AuditEvent::wizard(user_id, username, "completed", Some(message.as_str())),
            Err(Error::SessionTimeout) => AuditEvent::wizard(user_id, username, "timed_out", None),
            Err(Error::SessionCancelled) => {
                AuditEvent::wizard(user_id, username, "cancelled", None)
            }
            Err(err) => AuditEvent {
                error: Some(err.to_string()),
                ..AuditEvent::wizard(user_id, username, "failed", None)
            },
        };
        state.audit.record(event);
    })
}
