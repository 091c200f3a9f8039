use std::sync::Arc;

use bcb_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), bcb_core::Error> {
    bcb_core::logging::init("bcb")?;

    let cfg = Arc::new(Config::load()?);
    tracing::info!(
        menu_timeout = ?cfg.wizard_menu_timeout,
        reply_timeout = ?cfg.wizard_reply_timeout,
        "configuration loaded"
    );

    bcb_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| bcb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
