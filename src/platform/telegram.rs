use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    FileId, InputFile, MessageId, ReplyParameters, UpdateKind as TelegramUpdateKind,
};
use tracing::{debug, info};

use super::{IncomingMessage, IncomingUpdate, Platform, PlatformError, UpdateKind};

/// Telegram Bot API client built on teloxide's raw request methods.
pub struct TelegramPlatform {
    token: String,
    bot: Bot,
}

impl TelegramPlatform {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            bot: Bot::new(token),
        }
    }
}

fn transport(e: teloxide::RequestError) -> PlatformError {
    PlatformError::Transport(e.to_string())
}

fn convert_message(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        chat_id: msg.chat.id.0,
        user_id: msg.from.as_ref().map(|user| user.id.0 as i64),
        message_id: msg.id.0,
        text: msg.text().map(str::to_string),
    }
}

fn convert_update(update: &Update) -> IncomingUpdate {
    let kind = match &update.kind {
        TelegramUpdateKind::Message(msg) => UpdateKind::Message(convert_message(msg)),
        TelegramUpdateKind::EditedMessage(msg) => UpdateKind::Edited(convert_message(msg)),
        _ => UpdateKind::Other,
    };
    IncomingUpdate {
        update_id: i64::from(update.id.0),
        kind,
    }
}

#[async_trait]
impl Platform for TelegramPlatform {
    async fn fetch_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u32,
    ) -> Result<Vec<IncomingUpdate>, PlatformError> {
        let offset = offset
            .map(i32::try_from)
            .transpose()
            .map_err(|e| PlatformError::InvalidRequest(format!("update offset: {}", e)))?;

        let mut req = self.bot.get_updates();
        req.offset = offset;
        req.timeout = Some(timeout_secs);

        let updates = req.await.map_err(transport)?;
        debug!("Fetched {} update(s) from offset {:?}", updates.len(), offset);
        Ok(updates.iter().map(convert_update).collect())
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<(), PlatformError> {
        let mut req = self.bot.send_message(ChatId(chat_id), text);
        if let Some(id) = reply_to {
            req.reply_parameters = Some(ReplyParameters::new(MessageId(id)));
        }
        req.await.map_err(transport)?;
        Ok(())
    }

    async fn send_location(
        &self,
        chat_id: i64,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), PlatformError> {
        self.bot
            .send_location(ChatId(chat_id), latitude, longitude)
            .await
            .map_err(transport)?;
        Ok(())
    }

    async fn send_sticker(
        &self,
        chat_id: i64,
        sticker_id: &str,
        reply_to: Option<i32>,
    ) -> Result<(), PlatformError> {
        let sticker = InputFile::file_id(FileId(sticker_id.to_string()));
        let mut req = self.bot.send_sticker(ChatId(chat_id), sticker);
        if let Some(id) = reply_to {
            req.reply_parameters = Some(ReplyParameters::new(MessageId(id)));
        }
        req.await.map_err(transport)?;
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<(), PlatformError> {
        info!("Rebuilding Telegram client");
        self.bot = Bot::new(&self.token);
        Ok(())
    }
}
