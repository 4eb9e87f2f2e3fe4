use std::{env, fs, path::Path, time::Duration};

use crate::{
    domain::{ChatId, UserId},
    errors::Error,
    Result,
};

/// Typed configuration for the relay bot.
///
/// Everything is env-driven (with optional `.env` support) so the bot can
/// run unchanged on a PaaS dyno or a plain VM.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub source_channel: ChatId,
    pub target_channel: ChatId,
    pub admin_chat: ChatId,

    // Translation
    pub target_language: String,
    pub translate_timeout: Duration,

    // Healthcheck responder
    pub health_enabled: bool,
    pub health_host: String,
    pub health_port: u16,

    // Behavior flags
    pub reset_rearms_notify: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let source_channel = ChatId(required_i64("SOURCE_CHANNEL_ID")?);
        let target_channel = ChatId(required_i64("TARGET_CHANNEL_ID")?);
        let admin_chat = ChatId(required_i64("ADMIN_CHAT_ID")?);

        if source_channel == target_channel {
            return Err(Error::Config(
                "SOURCE_CHANNEL_ID and TARGET_CHANNEL_ID must differ".to_string(),
            ));
        }

        let target_language = env_str("TARGET_LANGUAGE")
            .and_then(non_empty)
            .unwrap_or_else(|| "fr".to_string());
        let translate_timeout =
            Duration::from_millis(env_u64("TRANSLATE_TIMEOUT_MS").unwrap_or(10_000));

        let health_enabled = env_bool("HEALTH_ENABLED").unwrap_or(true);
        let health_host = env_str("HEALTH_HOST")
            .and_then(non_empty)
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let health_port = env_u16("HEALTH_PORT").unwrap_or(10_000);

        let reset_rearms_notify = env_bool("RESET_REARMS_NOTIFY").unwrap_or(true);

        Ok(Self {
            telegram_bot_token,
            source_channel,
            target_channel,
            admin_chat,
            target_language,
            translate_timeout,
            health_enabled,
            health_host,
            health_port,
            reset_rearms_notify,
        })
    }

    /// The admin chat is a private chat, so its id doubles as the admin
    /// user id for command authorization.
    pub fn is_admin(&self, user: UserId) -> bool {
        user.0 == self.admin_chat.0
    }
}

fn required_i64(key: &str) -> Result<i64> {
    env_str(key)
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u16(key: &str) -> Option<u16> {
    env_str(key).and_then(|s| s.trim().parse::<u16>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
