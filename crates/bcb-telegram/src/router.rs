use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use bcb_core::{
    audit::AuditLogger, config::Config, messaging::port::MessagingPort,
    wizard::SessionRegistry,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub messenger: Arc<dyn MessagingPort>,
    pub registry: Arc<SessionRegistry>,
    pub audit: Arc<AuditLogger>,
}

impl AppState {
    pub fn new(cfg: Arc<Config>, messenger: Arc<dyn MessagingPort>) -> Self {
        let audit = AuditLogger::new(cfg.audit_log_path.clone(), cfg.audit_log_json);
        Self {
            cfg,
            messenger,
            registry: Arc::new(SessionRegistry::default()),
            audit: Arc::new(audit),
        }
    }
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "bcb started"),
        Err(e) => tracing::warn!(error = %e, "get_me failed; continuing"),
    }
    if cfg.telegram_allowed_users.is_empty() {
        tracing::warn!("TELEGRAM_ALLOWED_USERS is empty; the bot answers everyone");
    } else {
        tracing::info!(
            allowed_users = cfg.telegram_allowed_users.len(),
            "access restricted"
        );
    }
    if let Some(path) = cfg.audit_log_path.as_ref() {
        tracing::info!(path = %path.display(), json = cfg.audit_log_json, "audit log enabled");
    }

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let state = Arc::new(AppState::new(cfg, messenger));

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped");
    Ok(())
}
