use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tracing::info;

use crb_core::{
    config::Config,
    ports::{ChannelPort, TranslatorPort},
    relay::{RelayConfig, RelayEngine},
};

use crate::handlers;
use crate::TelegramChannel;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub engine: Arc<RelayEngine>,
}

pub async fn run_polling(cfg: Arc<Config>, translator: Arc<dyn TranslatorPort>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let channel: Arc<dyn ChannelPort> = Arc::new(TelegramChannel::new(bot.clone()));
    let engine = Arc::new(RelayEngine::new(
        RelayConfig::from(cfg.as_ref()),
        channel,
        translator,
    ));

    // Startup info + best-effort admin notification.
    if let Ok(me) = bot.get_me().await {
        info!("relay bot started: @{}", me.username());
        engine
            .notifier()
            .startup(me.username(), cfg.source_channel, cfg.target_channel)
            .await;
    }
    info!(
        source = cfg.source_channel.0,
        target = cfg.target_channel.0,
        lang = %cfg.target_language,
        "relaying channel posts"
    );

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        engine,
    });

    let handler = dptree::entry()
        .branch(Update::filter_channel_post().endpoint(handlers::handle_channel_post))
        .branch(Update::filter_edited_channel_post().endpoint(handlers::handle_edited_channel_post))
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
