//! Scripted in-memory [`Platform`] for dispatch and runtime tests.
//!
//! Fetches pop pre-queued batches (an empty batch once the script runs out)
//! and every outbound call is recorded for assertions.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{IncomingMessage, IncomingUpdate, Platform, PlatformError, UpdateKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        chat_id: i64,
        text: String,
        reply_to: Option<i32>,
    },
    Location {
        chat_id: i64,
        latitude: f64,
        longitude: f64,
    },
    Sticker {
        chat_id: i64,
        sticker_id: String,
        reply_to: Option<i32>,
    },
}

#[derive(Default)]
pub struct ScriptedPlatform {
    batches: Mutex<VecDeque<Result<Vec<IncomingUpdate>, PlatformError>>>,
    offsets: Mutex<Vec<Option<i64>>>,
    sent: Mutex<Vec<Sent>>,
    failing_sends: Mutex<usize>,
    pub reconnects: usize,
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, updates: Vec<IncomingUpdate>) {
        self.batches.lock().unwrap().push_back(Ok(updates));
    }

    pub fn push_fetch_error(&self) {
        self.batches
            .lock()
            .unwrap()
            .push_back(Err(PlatformError::Transport("connection reset".to_string())));
    }

    /// Make the next `count` outbound calls fail with a transport error.
    pub fn fail_next_sends(&self, count: usize) {
        *self.failing_sends.lock().unwrap() = count;
    }

    pub fn offsets(&self) -> Vec<Option<i64>> {
        self.offsets.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn clear_sent(&self) {
        self.sent.lock().unwrap().clear();
    }

    fn record(&self, sent: Sent) -> Result<(), PlatformError> {
        let mut failing = self.failing_sends.lock().unwrap();
        if *failing > 0 {
            *failing -= 1;
            return Err(PlatformError::Transport("send timed out".to_string()));
        }
        self.sent.lock().unwrap().push(sent);
        Ok(())
    }
}

pub fn message(chat_id: i64, user_id: i64, message_id: i32, text: &str) -> IncomingMessage {
    IncomingMessage {
        chat_id,
        user_id: Some(user_id),
        message_id,
        text: Some(text.to_string()),
    }
}

pub fn text_update(update_id: i64, chat_id: i64, user_id: i64, text: &str) -> IncomingUpdate {
    IncomingUpdate {
        update_id,
        kind: UpdateKind::Message(message(chat_id, user_id, update_id as i32, text)),
    }
}

pub fn edited_update(update_id: i64, chat_id: i64, user_id: i64, text: &str) -> IncomingUpdate {
    IncomingUpdate {
        update_id,
        kind: UpdateKind::Edited(message(chat_id, user_id, update_id as i32, text)),
    }
}

#[async_trait]
impl Platform for ScriptedPlatform {
    async fn fetch_updates(
        &self,
        offset: Option<i64>,
        _timeout_secs: u32,
    ) -> Result<Vec<IncomingUpdate>, PlatformError> {
        self.offsets.lock().unwrap().push(offset);
        self.batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<(), PlatformError> {
        self.record(Sent::Text {
            chat_id,
            text: text.to_string(),
            reply_to,
        })
    }

    async fn send_location(
        &self,
        chat_id: i64,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), PlatformError> {
        self.record(Sent::Location {
            chat_id,
            latitude,
            longitude,
        })
    }

    async fn send_sticker(
        &self,
        chat_id: i64,
        sticker_id: &str,
        reply_to: Option<i32>,
    ) -> Result<(), PlatformError> {
        self.record(Sent::Sticker {
            chat_id,
            sticker_id: sticker_id.to_string(),
            reply_to,
        })
    }

    async fn reconnect(&mut self) -> Result<(), PlatformError> {
        self.reconnects += 1;
        Ok(())
    }
}
