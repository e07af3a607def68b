//! Keyword dispatch: chat-level gating and the ordered binding lists.
//!
//! Bindings are tried in list order and the first whose trigger matches wins,
//! so generic prefixes such as `/` sit after the specific ones.

pub mod handlers;

use anyhow::Result;
use tracing::{debug, info};

use crate::access::AccessTier;
use crate::platform::{IncomingMessage, Platform};
use crate::runtime::Context;
use crate::strings::Strings;

/// Keys looked up in the strings document
pub mod keys {
    pub const STATUS_QUERY_KW: &str = "status_query_kw";
    pub const STATUS_RUNNING: &str = "status_running";
    pub const STATUS_STOPPED: &str = "status_stopped";

    pub const ENABLE_KW: &str = "enable_kw";
    pub const ENABLE_OK: &str = "enable_ok";
    pub const DISABLE_KW: &str = "disable_kw";
    pub const DISABLE_OK: &str = "disable_ok";
    pub const DISABLE_DENIED: &str = "disable_denied";

    pub const RELOAD_KW: &str = "reload_kw";
    pub const RELOAD_OK: &str = "reload_ok";
    pub const RELOAD_DENIED: &str = "reload_denied";

    pub const PHOTOS_ON_KW: &str = "photos_on_kw";
    pub const PHOTOS_ON_OK: &str = "photos_on_ok";
    pub const PHOTOS_ON_DENIED: &str = "photos_on_denied";
    pub const PHOTOS_OFF_KW: &str = "photos_off_kw";
    pub const PHOTOS_OFF_OK: &str = "photos_off_ok";
    pub const PHOTOS_OFF_DENIED: &str = "photos_off_denied";

    pub const SUGGEST_KWS: &str = "suggest_kws";
    pub const SUGGEST_HEADER: &str = "suggest_header";
    pub const SUGGEST_EMPTY: &str = "suggest_empty";

    pub const ADM_ADD_OK: &str = "adm_add_ok";
    pub const ADM_ADD_FAILED: &str = "adm_add_failed";
    pub const ADM_RM_OK: &str = "adm_rm_ok";
    pub const ADM_RM_FAILED: &str = "adm_rm_failed";
    pub const ADM_COUNT: &str = "adm_count";
    pub const ADM_USAGE_HELP: &str = "adm_usage_help";
    pub const ADM_USAGE_PREFIX: &str = "adm_usage_";
    pub const ADM_COMMAND_LIST: &str = "adm_command_list";
    pub const ADM_UNKNOWN: &str = "adm_unknown";
    pub const ADM_ERROR: &str = "adm_error";

    pub const GROUP_COMMANDS_UNSUPPORTED: &str = "group_commands_unsupported";
    pub const RECOGNITION_NOTICE: &str = "recognition_notice";
    pub const GENERIC_ERROR: &str = "generic_error";
}

pub const ADMIN_COMMAND_PREFIX: &str = "/adm";
pub const COMMAND_PREFIX: &str = "/";

pub type Predicate = fn(&IncomingMessage, &Strings) -> bool;

/// When a binding applies to a message
#[derive(Clone)]
pub enum Trigger {
    /// Message text starts with the keyword
    Prefix(String),
    Predicate(Predicate),
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Prefix(kw) => write!(f, "Prefix({:?})", kw),
            Trigger::Predicate(_) => write!(f, "Predicate"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReloadKeywords,
    SetRunning(bool),
    SetAcceptingPhotos(bool),
    AdminCommand,
    Command,
    Suggest,
}

/// Replies sent after a binding matched; `None` sends nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplyTemplates {
    pub on_success: Option<String>,
    pub on_denied: Option<String>,
}

impl ReplyTemplates {
    fn from_strings(strings: &Strings, ok_key: &str, denied_key: &str) -> Self {
        Self {
            on_success: strings.optional(ok_key),
            on_denied: strings.optional(denied_key),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: &'static str,
    pub trigger: Trigger,
    pub requires_admin: bool,
    pub replies: ReplyTemplates,
    pub action: Action,
}

impl Binding {
    pub fn matches(&self, msg: &IncomingMessage, strings: &Strings) -> bool {
        let text = msg.text.as_deref().unwrap_or_default();
        match &self.trigger {
            Trigger::Prefix(kw) => !kw.is_empty() && text.starts_with(kw.as_str()),
            Trigger::Predicate(pred) => pred(msg, strings),
        }
    }
}

/// Any configured suggestion keyword appears in the message, ignoring case.
pub fn mentions_suggestion(msg: &IncomingMessage, strings: &Strings) -> bool {
    let text = msg.text.as_deref().unwrap_or_default().to_lowercase();
    strings
        .list(keys::SUGGEST_KWS)
        .iter()
        .filter(|kw| !kw.is_empty())
        .any(|kw| text.contains(&kw.to_lowercase()))
}

/// Both binding lists plus the gate keywords checked before them.
#[derive(Debug, Clone)]
pub struct Registry {
    pub status_kw: String,
    pub enable_kw: String,
    /// Bindings for restricted chats
    pub restricted: Vec<Binding>,
    /// Bindings for operational and admin chats
    pub operational: Vec<Binding>,
}

/// A trigger keyword; empty keywords would match every message.
fn keyword(strings: &Strings, key: &str) -> Result<String> {
    let kw = strings.text(key)?;
    if kw.is_empty() {
        anyhow::bail!("keyword '{}' is empty", key);
    }
    Ok(kw.to_string())
}

impl Registry {
    /// Build the binding lists from the keyword strings. Missing keywords fail.
    pub fn build(strings: &Strings) -> Result<Self> {
        let command = Binding {
            name: "command",
            trigger: Trigger::Prefix(COMMAND_PREFIX.to_string()),
            requires_admin: false,
            replies: ReplyTemplates::default(),
            action: Action::Command,
        };

        let keyword_binding = |name: &'static str,
                               kw_key: &str,
                               ok_key: &str,
                               denied_key: &str,
                               action: Action|
         -> Result<Binding> {
            Ok(Binding {
                name,
                trigger: Trigger::Prefix(keyword(strings, kw_key)?),
                requires_admin: true,
                replies: ReplyTemplates::from_strings(strings, ok_key, denied_key),
                action,
            })
        };

        let operational = vec![
            keyword_binding(
                "reload_keywords",
                keys::RELOAD_KW,
                keys::RELOAD_OK,
                keys::RELOAD_DENIED,
                Action::ReloadKeywords,
            )?,
            keyword_binding(
                "disable_bot",
                keys::DISABLE_KW,
                keys::DISABLE_OK,
                keys::DISABLE_DENIED,
                Action::SetRunning(false),
            )?,
            keyword_binding(
                "enable_photos",
                keys::PHOTOS_ON_KW,
                keys::PHOTOS_ON_OK,
                keys::PHOTOS_ON_DENIED,
                Action::SetAcceptingPhotos(true),
            )?,
            keyword_binding(
                "disable_photos",
                keys::PHOTOS_OFF_KW,
                keys::PHOTOS_OFF_OK,
                keys::PHOTOS_OFF_DENIED,
                Action::SetAcceptingPhotos(false),
            )?,
            Binding {
                name: "admin_command",
                trigger: Trigger::Prefix(ADMIN_COMMAND_PREFIX.to_string()),
                requires_admin: true,
                replies: ReplyTemplates::default(),
                action: Action::AdminCommand,
            },
            command.clone(),
            Binding {
                name: "suggest",
                trigger: Trigger::Predicate(mentions_suggestion),
                requires_admin: false,
                replies: ReplyTemplates::default(),
                action: Action::Suggest,
            },
        ];

        if !strings.list(keys::SUGGEST_KWS).iter().any(|kw| !kw.is_empty()) {
            anyhow::bail!("keyword list '{}' is missing or empty", keys::SUGGEST_KWS);
        }

        Ok(Self {
            status_kw: keyword(strings, keys::STATUS_QUERY_KW)?,
            enable_kw: keyword(strings, keys::ENABLE_KW)?,
            restricted: vec![command],
            operational,
        })
    }

    pub fn bindings_for(&self, tier: AccessTier) -> &[Binding] {
        match tier {
            AccessTier::Admin | AccessTier::Operational => &self.operational,
            AccessTier::Restricted => &self.restricted,
            AccessTier::Denied => Default::default(),
        }
    }
}

/// Index of the first binding that matches the message.
pub fn first_match(bindings: &[Binding], msg: &IncomingMessage, strings: &Strings) -> Option<usize> {
    bindings.iter().position(|b| b.matches(msg, strings))
}

pub(crate) async fn reply(platform: &dyn Platform, msg: &IncomingMessage, text: &str) -> Result<()> {
    platform
        .send_text(msg.chat_id, text, Some(msg.message_id))
        .await?;
    Ok(())
}

/// Route one new message: chat gate, bot on/off gate, then the binding list.
pub async fn handle_message(
    ctx: &mut Context,
    platform: &dyn Platform,
    msg: &IncomingMessage,
) -> Result<()> {
    let Some(text) = msg.text.as_deref() else {
        debug!("Ignoring message {} without text", msg.message_id);
        return Ok(());
    };

    let tier = ctx.access.tier(msg.chat_id);
    if tier == AccessTier::Denied {
        return handle_unauthorized(ctx, platform, msg, text).await;
    }

    if text.contains(ctx.registry.status_kw.as_str()) {
        let key = if ctx.state.running {
            keys::STATUS_RUNNING
        } else {
            keys::STATUS_STOPPED
        };
        let status = ctx.strings.text(key)?.to_string();
        return reply(platform, msg, &status).await;
    }

    if !ctx.state.running {
        if text.starts_with(ctx.registry.enable_kw.as_str()) && ctx.sender_is_admin(msg) {
            let ok = ctx.strings.text(keys::ENABLE_OK)?.to_string();
            reply(platform, msg, &ok).await?;
            ctx.reload_store()?;
            ctx.state.running = true;
            info!("Bot enabled by user {:?}", msg.user_id);
        } else {
            debug!("Not running, ignoring message from chat {}", msg.chat_id);
        }
        return Ok(());
    }

    let bindings = ctx.registry.bindings_for(tier);
    match first_match(bindings, msg, &ctx.strings) {
        Some(index) => {
            let binding = bindings[index].clone();
            execute_binding(ctx, platform, msg, text, &binding).await
        }
        None => handlers::respond(ctx, platform, msg, text).await,
    }
}

/// Chats outside every tier only get the onboarding notice, once per run.
async fn handle_unauthorized(
    ctx: &mut Context,
    platform: &dyn Platform,
    msg: &IncomingMessage,
    text: &str,
) -> Result<()> {
    let phrase = ctx.config.access.recognition_phrase.as_str();
    let chat_id = msg.chat_id;

    if !phrase.is_empty() && text.contains(phrase) && !ctx.state.recognition.contains(&chat_id) {
        let notice = ctx.strings.text_or(
            keys::RECOGNITION_NOTICE,
            "Please contact moderator to add following id into ACL.",
        );
        platform.send_text(chat_id, &notice, None).await?;
        platform.send_text(chat_id, &chat_id.to_string(), None).await?;
        ctx.state.recognition.push(chat_id);
        info!("Chat {} requested recognition", chat_id);
    } else {
        info!("Access denied from: {}", chat_id);
    }
    Ok(())
}

async fn execute_binding(
    ctx: &mut Context,
    platform: &dyn Platform,
    msg: &IncomingMessage,
    text: &str,
    binding: &Binding,
) -> Result<()> {
    // Admin rights follow the sender, not the chat
    if binding.requires_admin && !ctx.sender_is_admin(msg) {
        info!(
            "Binding '{}' denied for user {:?} in chat {}",
            binding.name, msg.user_id, msg.chat_id
        );
        if let Some(denied) = &binding.replies.on_denied {
            reply(platform, msg, denied).await?;
        }
        return Ok(());
    }

    debug!("Running binding '{}'", binding.name);
    match binding.action {
        Action::ReloadKeywords => ctx.reload()?,
        Action::SetRunning(flag) => {
            ctx.state.running = flag;
            info!("Bot running: {}", flag);
        }
        Action::SetAcceptingPhotos(flag) => {
            ctx.state.accepting_photos = flag;
            info!("Accepting photos: {}", flag);
        }
        Action::AdminCommand => handlers::admin_command(ctx, platform, msg, text).await?,
        Action::Command => handlers::command(ctx, platform, msg, text).await?,
        Action::Suggest => handlers::suggest(ctx, platform, msg).await?,
    }

    if let Some(ok) = &binding.replies.on_success {
        reply(platform, msg, ok).await?;
    }
    Ok(())
}
