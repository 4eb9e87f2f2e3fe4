use std::sync::Arc;

use chrono::{DateTime, Utc};
use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
};

use crb_core::{config::Config, domain::UserId, state::StatsSnapshot};

use crate::router::AppState;

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

fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        return format!("{hours}h {mins}m {secs}s");
    }
    if mins > 0 {
        return format!("{mins}m {secs}s");
    }
    format!("{secs}s")
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let (cmd, _rest) = parse_command(text);

    match cmd.as_str() {
        "start" => start_cmd(&bot, &msg, &state).await,
        "status" => {
            let snap = state.engine.snapshot().await;
            send_markdown(&bot, &msg, &status_text(&state.cfg, &snap, Utc::now())).await
        }
        "stats" => {
            let snap = state.engine.snapshot().await;
            send_markdown(&bot, &msg, &stats_text(&snap, Utc::now())).await
        }
        "test" => test_cmd(&bot, &msg, &state).await,
        "check" => check_cmd(&bot, &msg, &state).await,
        "ping" => ping_cmd(&bot, &msg).await,
        "info" => info_cmd(&bot, &msg, &state).await,
        "reset" => reset_cmd(&bot, &msg, &state).await,
        _ => Ok(()),
    }
}

async fn send_markdown(bot: &Bot, msg: &Message, text: &str) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, text.to_string())
        .parse_mode(ParseMode::Markdown)
        .await?;
    Ok(())
}

async fn start_cmd(bot: &Bot, msg: &Message, state: &AppState) -> ResponseResult<()> {
    let is_admin = msg
        .from()
        .map(|u| state.cfg.is_admin(UserId(u.id.0 as i64)))
        .unwrap_or(false);

    let name = msg
        .from()
        .map(|u| u.first_name.clone())
        .unwrap_or_else(|| "there".to_string());

    let mut text = format!(
        "🤖 *Channel Relay Bot*\n\n\
         Hi {name}!\n\n\
         📋 *Commands:*\n\
         /start - this menu\n\
         /status - bot state\n\
         /stats - statistics\n\
         /test - connection check\n\
         /check - channel access check\n\
         /ping - latency\n\
         /info - configuration\n"
    );
    if is_admin {
        text.push_str("/reset - clear stats and relay cache (admin)\n");
    }
    text.push_str(&format!(
        "\n⚙️ *Setup:*\n\
         • Source: `{}`\n\
         • Target: `{}`\n\
         • Language: {}\n\
         • Live edit sync enabled",
        state.cfg.source_channel.0, state.cfg.target_channel.0, state.cfg.target_language
    ));

    let keyboard = InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("📊 Stats", "stats"),
        InlineKeyboardButton::callback("🔍 Status", "status"),
    ]]);

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Markdown)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

pub fn status_text(cfg: &Config, snap: &StatsSnapshot, now: DateTime<Utc>) -> String {
    let uptime = format_duration((now - snap.started_at).num_seconds());
    let last = snap
        .last_activity
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());

    format!(
        "📊 *STATUS*\n\n\
         🟢 Bot: online\n\
         ⏱ Uptime: {uptime}\n\n\
         📡 Channels:\n\
         • Source: `{}`\n\
         • Target: `{}`\n\n\
         📨 Activity:\n\
         • Translated: {}\n\
         • Edited: {}\n\
         • Errors: {}\n\
         • Tracked: {}\n\
         • Last: {last}",
        cfg.source_channel.0,
        cfg.target_channel.0,
        snap.translated,
        snap.edited,
        snap.errors,
        snap.relayed,
    )
}

pub fn stats_text(snap: &StatsSnapshot, now: DateTime<Utc>) -> String {
    let uptime = format_duration((now - snap.started_at).num_seconds());
    format!(
        "📈 *STATISTICS*\n\n\
         ✅ Translated: `{}`\n\
         📝 Edited: `{}`\n\
         ❌ Errors: `{}`\n\
         📊 Success rate: `{:.1}%`\n\n\
         ⏱ Online for: `{uptime}`",
        snap.translated, snap.edited, snap.errors, snap.success_rate,
    )
}

async fn test_cmd(bot: &Bot, msg: &Message, state: &AppState) -> ResponseResult<()> {
    let status = bot.send_message(msg.chat.id, "🧪 Running checks...").await?;
    let mut results = Vec::new();

    match bot.get_chat(tg_chat(state.cfg.source_channel.0)).await {
        Ok(chat) => results.push(format!("✅ Source: {}", chat.title().unwrap_or("untitled"))),
        Err(e) => results.push(format!("❌ Source: {e}")),
    }

    match bot.get_chat(tg_chat(state.cfg.target_channel.0)).await {
        Ok(chat) => {
            results.push(format!("✅ Target: {}", chat.title().unwrap_or("untitled")));
            match target_roundtrip(bot, state.cfg.target_channel.0).await {
                Ok(()) => results.push("✅ Send/edit/delete OK".to_string()),
                Err(e) => results.push(format!("❌ Send/edit/delete: {e}")),
            }
        }
        Err(e) => results.push(format!("❌ Target: {e}")),
    }

    bot.edit_message_text(status.chat.id, status.id, results.join("\n"))
        .await?;
    Ok(())
}

/// Post, edit, and delete a probe message in the target channel.
async fn target_roundtrip(bot: &Bot, target: i64) -> std::result::Result<(), teloxide::RequestError> {
    let probe = bot
        .send_message(tg_chat(target), "🧪 Connection test...")
        .await?;
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    bot.edit_message_text(probe.chat.id, probe.id, "🧪 Test OK - edits work!")
        .await?;
    bot.delete_message(probe.chat.id, probe.id).await?;
    Ok(())
}

async fn check_cmd(bot: &Bot, msg: &Message, state: &AppState) -> ResponseResult<()> {
    let me = bot.get_me().await?;
    let mut lines = vec!["🔍 *CHANNEL CHECK*".to_string()];

    for (label, chat_id) in [
        ("📥 SOURCE", state.cfg.source_channel.0),
        ("📤 TARGET", state.cfg.target_channel.0),
    ] {
        lines.push(format!("\n*{label}*"));
        match bot.get_chat(tg_chat(chat_id)).await {
            Ok(chat) => {
                lines.push("✅ Accessible".to_string());
                lines.push(format!("• Title: {}", chat.title().unwrap_or("untitled")));
                match bot.get_chat_member(tg_chat(chat_id), me.user.id).await {
                    Ok(member) => lines.push(format!("• My status: {:?}", member.status())),
                    Err(e) => lines.push(format!("• My status: unknown ({e})")),
                }
            }
            Err(e) => lines.push(format!("❌ Error: {e}")),
        }
    }

    send_markdown(bot, msg, &lines.join("\n")).await
}

async fn ping_cmd(bot: &Bot, msg: &Message) -> ResponseResult<()> {
    let started = std::time::Instant::now();
    let pong = bot.send_message(msg.chat.id, "🏓").await?;
    let ms = started.elapsed().as_secs_f64() * 1000.0;

    bot.edit_message_text(pong.chat.id, pong.id, format!("🏓 Pong! `{ms:.1}ms`"))
        .parse_mode(ParseMode::Markdown)
        .await?;
    Ok(())
}

async fn info_cmd(bot: &Bot, msg: &Message, state: &AppState) -> ResponseResult<()> {
    let me = bot.get_me().await?;
    let user_id = msg.from().map(|u| u.id.0 as i64).unwrap_or_default();

    let text = format!(
        "⚙️ *CONFIGURATION*\n\n\
         🤖 Bot: @{}\n\
         🆔 My id: `{}`\n\
         👤 Your id: `{user_id}`\n\
         👑 Admin: `{}`\n\n\
         📡 Channels:\n\
         • Source: `{}`\n\
         • Target: `{}`\n\n\
         🌍 Language: `{}`\n\
         🔧 Health: `{}:{}`",
        me.username(),
        me.user.id,
        state.cfg.admin_chat.0,
        state.cfg.source_channel.0,
        state.cfg.target_channel.0,
        state.cfg.target_language,
        state.cfg.health_host,
        state.cfg.health_port,
    );
    send_markdown(bot, msg, &text).await
}

async fn reset_cmd(bot: &Bot, msg: &Message, state: &AppState) -> ResponseResult<()> {
    let authorized = msg
        .from()
        .map(|u| state.cfg.is_admin(UserId(u.id.0 as i64)))
        .unwrap_or(false);
    if !authorized {
        bot.send_message(msg.chat.id, "⛔ Admin only").await?;
        return Ok(());
    }

    state.engine.reset().await;
    bot.send_message(msg.chat.id, "🗑 Stats and relay cache cleared!")
        .await?;
    Ok(())
}

fn tg_chat(id: i64) -> teloxide::types::ChatId {
    teloxide::types::ChatId(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_addressed_commands() {
        assert_eq!(parse_command("/status"), ("status".to_string(), "".to_string()));
        assert_eq!(
            parse_command("/Reset@relay_bot now"),
            ("reset".to_string(), "now".to_string())
        );
        assert_eq!(
            parse_command("  /ping   extra args  "),
            ("ping".to_string(), "extra args".to_string())
        );
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(5), "5s");
        assert_eq!(format_duration(65), "1m 5s");
        assert_eq!(format_duration(3661), "1h 1m 1s");
        assert_eq!(format_duration(-3), "0s");
    }

    fn snapshot() -> StatsSnapshot {
        StatsSnapshot {
            translated: 3,
            edited: 1,
            errors: 1,
            relayed: 3,
            started_at: Utc::now(),
            last_activity: None,
            success_rate: 60.0,
            recent: Vec::new(),
        }
    }

    #[test]
    fn stats_text_shows_counters_and_rate() {
        let text = stats_text(&snapshot(), Utc::now());
        assert!(text.contains("Translated: `3`"));
        assert!(text.contains("Edited: `1`"));
        assert!(text.contains("Errors: `1`"));
        assert!(text.contains("Success rate: `60.0%`"));
    }

    #[test]
    fn status_text_reports_never_before_first_relay() {
        let cfg_snap = snapshot();
        let text = {
            // Build a config without touching the environment.
            let cfg = Config {
                telegram_bot_token: "token".to_string(),
                source_channel: crb_core::domain::ChatId(-100_111),
                target_channel: crb_core::domain::ChatId(-100_222),
                admin_chat: crb_core::domain::ChatId(42),
                target_language: "fr".to_string(),
                translate_timeout: std::time::Duration::from_secs(10),
                health_enabled: false,
                health_host: "0.0.0.0".to_string(),
                health_port: 10_000,
                reset_rearms_notify: true,
            };
            status_text(&cfg, &cfg_snap, Utc::now())
        };
        assert!(text.contains("Last: never"));
        assert!(text.contains("`-100111`"));
        assert!(text.contains("Tracked: 3"));
    }
}
