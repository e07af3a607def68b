pub mod telegram;
#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use thiserror::Error;

/// A new or edited text message from the platform
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    /// Chat the message was posted in; negative for group chats
    pub chat_id: i64,
    /// Sender's user id, absent for anonymous channel posts
    pub user_id: Option<i64>,
    pub message_id: i32,
    pub text: Option<String>,
}

impl IncomingMessage {
    pub fn is_group_chat(&self) -> bool {
        self.chat_id < 0
    }

    pub fn is_private_chat(&self) -> bool {
        self.chat_id > 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateKind {
    Message(IncomingMessage),
    Edited(IncomingMessage),
    /// Anything the bot does not react to (callbacks, member changes, ...)
    Other,
}

/// One inbound event, tagged with its sequence number
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingUpdate {
    pub update_id: i64,
    pub kind: UpdateKind,
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Remote messaging API as seen by the bot.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Long-poll for updates with id >= `offset`, waiting up to `timeout_secs`.
    async fn fetch_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u32,
    ) -> Result<Vec<IncomingUpdate>, PlatformError>;

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<(), PlatformError>;

    async fn send_location(
        &self,
        chat_id: i64,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), PlatformError>;

    async fn send_sticker(
        &self,
        chat_id: i64,
        sticker_id: &str,
        reply_to: Option<i32>,
    ) -> Result<(), PlatformError>;

    /// Rebuild the underlying client after a transport failure.
    async fn reconnect(&mut self) -> Result<(), PlatformError>;
}
