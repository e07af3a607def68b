use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::access::AccessControl;
use crate::config::Config;
use crate::dispatch::{self, handlers, Registry};
use crate::platform::{IncomingMessage, Platform, PlatformError, UpdateKind};
use crate::store::RestaurantStore;
use crate::strings::Strings;

/// Next update id to request from the platform.
///
/// Only moves forward, apart from the backlog skip at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollCursor {
    next: Option<i64>,
}

impl PollCursor {
    pub fn offset(&self) -> Option<i64> {
        self.next
    }

    /// Move one past `update_id`, never backwards.
    pub fn advance_past(&mut self, update_id: i64) {
        let target = update_id + 1;
        self.next = Some(self.next.map_or(target, |next| next.max(target)));
    }

    /// Blind skip of one id, used when recovery has no handled update to go by.
    pub fn bump(&mut self) {
        if let Some(next) = self.next.as_mut() {
            *next += 1;
        }
    }

    pub fn reset_to(&mut self, update_id: i64) {
        self.next = Some(update_id);
    }
}

/// Mutable runtime flags owned by the polling loop
#[derive(Debug, Clone)]
pub struct BotState {
    pub cursor: PollCursor,
    pub running: bool,
    pub accepting_photos: bool,
    /// Unauthorized chats that already got the onboarding notice this run
    pub recognition: Vec<i64>,
}

impl Default for BotState {
    fn default() -> Self {
        Self {
            cursor: PollCursor::default(),
            running: true,
            accepting_photos: false,
            recognition: Vec::new(),
        }
    }
}

/// Everything dispatch needs, passed explicitly to every handler.
pub struct Context {
    pub config: Config,
    pub access: AccessControl,
    pub strings: Strings,
    pub registry: Registry,
    pub store: RestaurantStore,
    pub state: BotState,
}

impl Context {
    pub fn new(config: Config) -> Result<Self> {
        let strings = Strings::load(&config.strings.path)?;
        let registry = Registry::build(&strings)?;
        let store = RestaurantStore::open(&config.storage.database_path)?;
        let access = AccessControl::new(&config.access);

        Ok(Self {
            config,
            access,
            strings,
            registry,
            store,
            state: BotState::default(),
        })
    }

    pub fn sender_is_admin(&self, msg: &IncomingMessage) -> bool {
        msg.user_id.is_some_and(|id| self.access.is_admin(id))
    }

    /// Reopen the datastore handle.
    pub fn reload_store(&mut self) -> Result<()> {
        self.store = RestaurantStore::open(&self.config.storage.database_path)?;
        Ok(())
    }

    /// Re-read the strings document, rebuild the bindings and reopen the store.
    /// Nothing is replaced unless all three load successfully.
    pub fn reload(&mut self) -> Result<()> {
        let strings = Strings::load(&self.config.strings.path)?;
        let registry = Registry::build(&strings)?;
        let store = RestaurantStore::open(&self.config.storage.database_path)?;
        self.strings = strings;
        self.registry = registry;
        self.store = store;
        info!("Reloaded keywords and restaurant store");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Recovering,
}

/// The polling loop: fetch, dispatch one update at a time, recover on transport failure.
pub struct Runtime<P: Platform> {
    platform: P,
    ctx: Context,
    phase: Phase,
    /// Update currently (or most recently) being handled
    now_handling: Option<i64>,
}

impl<P: Platform> Runtime<P> {
    pub fn new(platform: P, ctx: Context) -> Self {
        Self {
            platform,
            ctx,
            phase: Phase::Running,
            now_handling: None,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[cfg(test)]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    #[cfg(test)]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Run until the process is interrupted.
    pub async fn run(&mut self) {
        if self.ctx.config.polling.skip_backlog {
            if let Err(e) = self.skip_backlog().await {
                error!("Failed to skip update backlog: {}", e);
            }
        }

        info!("Polling for updates from offset {:?}", self.ctx.state.cursor.offset());
        loop {
            self.step().await;
        }
    }

    /// Acknowledge pending updates so only the newest one is processed.
    pub async fn skip_backlog(&mut self) -> Result<(), PlatformError> {
        let mut batch = self.platform.fetch_updates(None, 0).await?;
        debug!("Pending updates: {}", batch.len());

        while let Some(last) = batch.last().map(|u| u.update_id) {
            self.ctx.state.cursor.reset_to(last);
            if batch.len() <= 1 {
                break;
            }
            batch = self.platform.fetch_updates(Some(last + 1), 0).await?;
            debug!("Pending updates: {}", batch.len());
        }
        Ok(())
    }

    /// One loop iteration: rebuild the client if recovering, then poll once.
    pub async fn step(&mut self) {
        if self.phase == Phase::Recovering {
            if let Err(e) = self.platform.reconnect().await {
                error!("Reconnect failed: {}", e);
                return;
            }
            self.phase = Phase::Running;
            info!("Recovered, resuming at offset {:?}", self.ctx.state.cursor.offset());
        }

        if let Err(e) = self.poll_once().await {
            error!("!!! Polling failed: {}", e);
            self.recover();
        }
    }

    fn recover(&mut self) {
        self.phase = Phase::Recovering;
        match self.now_handling {
            Some(id) => self.ctx.state.cursor.advance_past(id),
            None => self.ctx.state.cursor.bump(),
        }
        warn!(
            "Recovering, next offset {:?}",
            self.ctx.state.cursor.offset()
        );
    }

    async fn poll_once(&mut self) -> Result<(), PlatformError> {
        let timeout = self.ctx.config.polling.timeout_secs;
        let updates = self
            .platform
            .fetch_updates(self.ctx.state.cursor.offset(), timeout)
            .await?;

        for update in updates {
            info!("Update: {:?}", update);
            self.now_handling = Some(update.update_id);

            match update.kind {
                UpdateKind::Message(msg) => self.handle(&msg).await?,
                UpdateKind::Edited(_) => debug!("Ignoring edited message in update {}", update.update_id),
                UpdateKind::Other => debug!("Ignoring update {}", update.update_id),
            }

            self.ctx.state.cursor.advance_past(update.update_id);
        }
        Ok(())
    }

    /// Dispatch one message. Handler failures are answered here;
    /// transport failures go back to the loop.
    async fn handle(&mut self, msg: &IncomingMessage) -> Result<(), PlatformError> {
        debug!("Now handling update: {:?}", self.now_handling);
        let Err(e) = dispatch::handle_message(&mut self.ctx, &self.platform, msg).await else {
            return Ok(());
        };

        match e.downcast::<PlatformError>() {
            Ok(transport) => Err(transport),
            Err(e) => {
                error!("Failed to handle message from chat {}: {:#}", msg.chat_id, e);
                let reply = handlers::generic_error_reply(&self.ctx);
                self.platform
                    .send_text(msg.chat_id, &reply, Some(msg.message_id))
                    .await
            }
        }
    }
}
