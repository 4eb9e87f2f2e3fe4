mod health;

use std::sync::Arc;

use crb_core::{config::Config, ports::TranslatorPort};
use crb_translate::GoogleTranslator;

#[tokio::main]
async fn main() -> Result<(), crb_core::Error> {
    crb_core::logging::init("crb");

    let cfg = Arc::new(Config::load()?);

    // PaaS healthcheck responder; the bot runs fine without it.
    if cfg.health_enabled {
        let host = cfg.health_host.clone();
        let port = cfg.health_port;
        tokio::spawn(async move {
            if let Err(e) = health::serve(&host, port).await {
                tracing::error!("health server failed: {e}");
            }
        });
    }

    let translator: Arc<dyn TranslatorPort> =
        Arc::new(GoogleTranslator::new(cfg.translate_timeout));

    crb_telegram::router::run_polling(cfg, translator)
        .await
        .map_err(|e| crb_core::Error::Transport(format!("telegram bot failed: {e}")))?;

    Ok(())
}
