use anyhow::{Context as _, Result};
use rand::Rng;
use tracing::{debug, info, warn};

use super::{keys, reply};
use crate::platform::{IncomingMessage, Platform};
use crate::runtime::Context;
use crate::store::Restaurant;

const DEFAULT_GENERIC_ERROR: &str = "Something went wrong ";
const DEFAULT_ADM_ERROR: &str = "Admin command failed.";
const DEFAULT_SUGGEST_HEADER: &str = "吃這間如何？ \u{1F40D}";
const SMILE: char = '\u{1F603}';

/// Generic failure reply with one to three smileys on the end.
pub fn generic_error_reply(ctx: &Context) -> String {
    let base = ctx.strings.text_or(keys::GENERIC_ERROR, DEFAULT_GENERIC_ERROR);
    with_smiles(&base, rand::thread_rng().gen_range(1..=3))
}

fn with_smiles(text: &str, count: usize) -> String {
    let mut out = String::with_capacity(text.len() + count * SMILE.len_utf8());
    out.push_str(text);
    out.extend(std::iter::repeat(SMILE).take(count));
    out
}

/// `/adm <command> ...`. Replies are always sent; failures become the admin-error template.
pub async fn admin_command(
    ctx: &mut Context,
    platform: &dyn Platform,
    msg: &IncomingMessage,
    text: &str,
) -> Result<()> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let command = tokens.get(1).map(|t| t.to_lowercase()).unwrap_or_default();
    debug!("Admin command: {:?}", command);

    let out = match run_admin_command(ctx, &command, &tokens) {
        Ok(out) => out,
        Err(e) => {
            warn!("Admin command '{}' failed: {:#}", command, e);
            ctx.strings.text_or(keys::ADM_ERROR, DEFAULT_ADM_ERROR)
        }
    };
    reply(platform, msg, &out).await
}

fn with_command_list(ctx: &Context, head: &str) -> Result<String> {
    Ok(format!(
        "{}\nSupported commands: {}",
        head,
        ctx.strings.text(keys::ADM_COMMAND_LIST)?
    ))
}

fn run_admin_command(ctx: &Context, command: &str, tokens: &[&str]) -> Result<String> {
    let strings = &ctx.strings;
    match command {
        "ping" => Ok("pong".to_string()),
        "add" => {
            let entry = parse_new_restaurant(&tokens[2..])?;
            let key = if ctx.store.add_entry(&entry) {
                info!("Added restaurant '{}'", entry.name);
                keys::ADM_ADD_OK
            } else {
                keys::ADM_ADD_FAILED
            };
            Ok(strings.text(key)?.to_string())
        }
        "rm" => {
            let key = match tokens.get(2) {
                Some(name) => match ctx.store.remove_entry(name) {
                    Ok(_) => keys::ADM_RM_OK,
                    Err(e) => {
                        warn!("{:#}", e);
                        keys::ADM_RM_FAILED
                    }
                },
                None => keys::ADM_RM_FAILED,
            };
            Ok(strings.text(key)?.to_string())
        }
        "count" => {
            let count = ctx.store.count()?;
            Ok(strings
                .text(keys::ADM_COUNT)?
                .replace("{count}", &count.to_string()))
        }
        "help" => {
            let usage = tokens
                .get(2)
                .and_then(|topic| strings.optional(&format!("{}{}", keys::ADM_USAGE_PREFIX, topic)));
            match usage {
                Some(usage) => Ok(format!("Usage: {}", usage)),
                None => with_command_list(ctx, strings.text(keys::ADM_USAGE_HELP)?),
            }
        }
        _ => with_command_list(ctx, strings.text(keys::ADM_UNKNOWN)?),
    }
}

/// `<name> <price> <min_charge> <address> <lat> <lng> [hours] [tags...]`
fn parse_new_restaurant(args: &[&str]) -> Result<Restaurant> {
    if args.len() < 6 {
        anyhow::bail!("add needs at least 6 arguments, got {}", args.len());
    }
    let latitude: f64 = args[4]
        .parse()
        .with_context(|| format!("invalid latitude '{}'", args[4]))?;
    let longitude: f64 = args[5]
        .parse()
        .with_context(|| format!("invalid longitude '{}'", args[5]))?;
    let tags = args.get(7..).filter(|t| !t.is_empty()).map(|t| t.join(" "));

    Ok(Restaurant {
        name: args[0].to_string(),
        price_range: Some(args[1].to_string()),
        min_charge: Some(args[2].to_string()),
        address: Some(args[3].to_string()),
        open_hours: args.get(6).map(|s| s.to_string()),
        tags,
        latitude: Some(latitude),
        longitude: Some(longitude),
        notes: None,
    })
}

/// Any `/command` outside `/adm`.
pub async fn command(
    ctx: &mut Context,
    platform: &dyn Platform,
    msg: &IncomingMessage,
    text: &str,
) -> Result<()> {
    if msg.is_private_chat() {
        let name = text.split_whitespace().next().unwrap_or_default();
        if name == "/crash" {
            anyhow::bail!("crash requested in chat {}", msg.chat_id);
        }
        debug!("Ignoring command {:?} in private chat {}", name, msg.chat_id);
        return Ok(());
    }

    let out = ctx.strings.text_or(
        keys::GROUP_COMMANDS_UNSUPPORTED,
        "No commands yet are supported for group chats.",
    );
    reply(platform, msg, &out).await
}

/// Pick a random restaurant and send it with a location pin.
pub async fn suggest(ctx: &mut Context, platform: &dyn Platform, msg: &IncomingMessage) -> Result<()> {
    let Some(choice) = ctx.store.pick_random() else {
        let empty = ctx.strings.text(keys::SUGGEST_EMPTY)?.to_string();
        return reply(platform, msg, &empty).await;
    };

    info!("Suggesting '{}' to chat {}", choice.name, msg.chat_id);
    let header = ctx.strings.text_or(keys::SUGGEST_HEADER, DEFAULT_SUGGEST_HEADER);
    reply(platform, msg, &format_suggestion(&header, &choice)).await?;

    let latitude = choice.latitude.unwrap_or(ctx.config.suggest.fallback_latitude);
    let longitude = choice.longitude.unwrap_or(ctx.config.suggest.fallback_longitude);
    platform
        .send_location(msg.chat_id, latitude, longitude)
        .await?;
    Ok(())
}

fn format_suggestion(header: &str, choice: &Restaurant) -> String {
    let fields = [
        ("店家名稱", Some(choice.name.as_str())),
        ("價位", choice.price_range.as_deref()),
        ("低消", choice.min_charge.as_deref()),
        ("地址", choice.address.as_deref()),
        ("營業時間", choice.open_hours.as_deref()),
        ("關鍵字", choice.tags.as_deref()),
        ("其他", choice.notes.as_deref()),
    ];

    let mut out = header.to_string();
    for (label, value) in fields {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            out.push_str(&format!("\n{}：{}", label, value));
        }
    }
    out
}

/// Fallback for messages no binding claimed: sticker reply in groups.
pub async fn respond(
    ctx: &mut Context,
    platform: &dyn Platform,
    msg: &IncomingMessage,
    text: &str,
) -> Result<()> {
    let reactions = &ctx.config.reactions;
    if msg.is_group_chat()
        && !reactions.sticker_trigger.is_empty()
        && text.contains(reactions.sticker_trigger.as_str())
    {
        platform
            .send_sticker(msg.chat_id, &reactions.sticker_id, Some(msg.message_id))
            .await?;
    }
    Ok(())
}
