//! Bot initialization and the teloxide-backed client
//!
//! This module contains:
//! - Bot instance creation (custom Bot API server support)
//! - Command registration
//! - [`TelegramClient`], the [`MediaClient`] used in production
//! - Conversion of teloxide messages into [`InboundMessage`]

use async_trait::async_trait;
use reqwest::ClientBuilder;
use std::path::{Path, PathBuf};
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, FileId, FileMeta, InputFile, Message, MessageId, ReplyParameters};
use teloxide::{ApiError, RequestError};

use crate::core::config;
use crate::telegram::client::{ChatKind, ClientError, InboundMessage, MediaClient, MediaItem, MediaKind, MessageRef};
use crate::telegram::commands::COMMAND_LIST;

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to create bot (invalid URL, client setup)
pub fn create_bot(token: &str) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(token, client);

    let bot = match config::BOT_API_URL.as_deref() {
        Some(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = reqwest::Url::parse(bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            bot.set_api_url(url)
        }
        None => bot,
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), RequestError> {
    let commands = COMMAND_LIST
        .iter()
        .map(|(name, description)| BotCommand::new(*name, *description))
        .collect::<Vec<_>>();

    bot.set_my_commands(commands).await?;
    Ok(())
}

/// [`MediaClient`] on top of the Bot API
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn message_ref(message: &Message) -> MessageRef {
    MessageRef::new(message.chat.id.0, message.id.0)
}

#[async_trait]
impl MediaClient for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<MessageRef, ClientError> {
        let sent = self.bot.send_message(ChatId(chat_id), text).await?;
        Ok(message_ref(&sent))
    }

    async fn reply(&self, to: MessageRef, text: &str) -> Result<MessageRef, ClientError> {
        let sent = self
            .bot
            .send_message(ChatId(to.chat_id), text)
            .reply_parameters(ReplyParameters::new(MessageId(to.message_id)))
            .await?;
        Ok(message_ref(&sent))
    }

    async fn edit(&self, message: MessageRef, text: &str) -> Result<(), ClientError> {
        match self
            .bot
            .edit_message_text(ChatId(message.chat_id), MessageId(message.message_id), text)
            .await
        {
            Ok(_) => Ok(()),
            // Same text twice is not a failure
            Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn download_media(&self, item: &MediaItem, destination: &Path) -> Result<PathBuf, ClientError> {
        let file = self.bot.get_file(FileId(item.file_id.clone())).await?;
        log::debug!("Downloading {} ({} bytes) to {}", file.path, file.size, destination.display());

        let mut part = destination.as_os_str().to_owned();
        part.push(".part");
        let part = PathBuf::from(part);

        let mut dst = tokio::fs::File::create(&part).await?;
        self.bot.download_file(&file.path, &mut dst).await?;
        dst.sync_all().await?;
        drop(dst);

        tokio::fs::rename(&part, destination).await?;
        Ok(destination.to_path_buf())
    }

    async fn send_file(&self, chat_id: i64, path: &Path, caption: Option<&str>) -> Result<MessageRef, ClientError> {
        let request = self.bot.send_document(ChatId(chat_id), InputFile::file(path.to_path_buf()));
        let sent = match caption {
            Some(caption) => request.caption(caption).await?,
            None => request.await?,
        };
        Ok(message_ref(&sent))
    }
}

fn media_item(kind: MediaKind, meta: &FileMeta, file_name: Option<&String>, mime_type: Option<String>) -> MediaItem {
    MediaItem {
        kind,
        file_id: meta.id.0.clone(),
        file_unique_id: meta.unique_id.0.clone(),
        file_name: file_name.cloned(),
        mime_type,
        size: u64::from(meta.size),
    }
}

fn extract_media(msg: &Message) -> Option<MediaItem> {
    if let Some(doc) = msg.document() {
        let mime = doc.mime_type.as_ref().map(ToString::to_string);
        return Some(media_item(MediaKind::Document, &doc.file, doc.file_name.as_ref(), mime));
    }
    if let Some(audio) = msg.audio() {
        let mime = audio.mime_type.as_ref().map(ToString::to_string);
        return Some(media_item(MediaKind::Audio, &audio.file, audio.file_name.as_ref(), mime));
    }
    if let Some(video) = msg.video() {
        let mime = video.mime_type.as_ref().map(ToString::to_string);
        return Some(media_item(MediaKind::Video, &video.file, video.file_name.as_ref(), mime));
    }
    if let Some(animation) = msg.animation() {
        let mime = animation.mime_type.as_ref().map(ToString::to_string);
        return Some(media_item(
            MediaKind::Animation,
            &animation.file,
            animation.file_name.as_ref(),
            mime,
        ));
    }
    if let Some(voice) = msg.voice() {
        let mime = voice.mime_type.as_ref().map(ToString::to_string);
        return Some(media_item(MediaKind::Voice, &voice.file, None, mime));
    }
    // Largest size comes last
    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        return Some(media_item(MediaKind::Photo, &photo.file, None, None));
    }
    None
}

/// Converts a teloxide message into the platform-independent model
pub fn inbound_from(msg: &Message) -> InboundMessage {
    let chat_kind = if msg.chat.is_private() {
        ChatKind::Private
    } else if msg.chat.is_channel() {
        ChatKind::Channel
    } else {
        ChatKind::Group
    };

    InboundMessage {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        chat_kind,
        sender_id: msg.from.as_ref().map(|user| user.id.0 as i64),
        date: msg.date,
        text: msg.text().or_else(|| msg.caption()).map(str::to_string),
        media: extract_media(msg),
    }
}
