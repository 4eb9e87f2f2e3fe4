use std::sync::Arc;

use teloxide::prelude::*;

use crb_core::domain::{ChatId, MediaRef, MessageId, SourcePost};

use crate::router::AppState;

pub async fn handle_channel_post(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if ChatId(msg.chat.id.0) != state.cfg.source_channel {
        return Ok(());
    }
    let post = source_post_from(&msg);
    state.engine.handle_new_post(&post).await;
    Ok(())
}

pub async fn handle_edited_channel_post(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if ChatId(msg.chat.id.0) != state.cfg.source_channel {
        return Ok(());
    }
    let post = source_post_from(&msg);
    state.engine.handle_edited_post(&post).await;
    Ok(())
}

fn source_post_from(msg: &Message) -> SourcePost {
    SourcePost {
        id: MessageId(msg.id.0),
        chat: ChatId(msg.chat.id.0),
        text: msg.text().map(str::to_string),
        caption: msg.caption().map(str::to_string),
        media: media_of(msg),
    }
}

/// Classify the media payload: kinds the relay re-sends by file id, kinds
/// it must copy verbatim (`Other`), and service messages (`None`).
fn media_of(msg: &Message) -> Option<MediaRef> {
    if let Some(sizes) = msg.photo() {
        // Largest size carries the best resolution.
        return sizes.last().map(|p| MediaRef::Photo(p.file.id.clone()));
    }
    if let Some(v) = msg.video() {
        return Some(MediaRef::Video(v.file.id.clone()));
    }
    if let Some(d) = msg.document() {
        return Some(MediaRef::Document(d.file.id.clone()));
    }

    let copyable = msg.sticker().is_some()
        || msg.animation().is_some()
        || msg.audio().is_some()
        || msg.voice().is_some()
        || msg.video_note().is_some()
        || msg.contact().is_some()
        || msg.location().is_some()
        || msg.venue().is_some()
        || msg.poll().is_some()
        || msg.dice().is_some();
    copyable.then_some(MediaRef::Other)
}
