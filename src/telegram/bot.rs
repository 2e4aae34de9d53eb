//! Bot initialization and message routing.

use crate::core::config;
use crate::dispatch::queue::TaskKind;
use crate::telegram::commands::{help_text, Command};
use crate::telegram::{admin, downloads, AppDeps, Bot};
use reqwest::ClientBuilder;
use std::sync::Arc;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use url::Url;

/// Creates a Bot instance with custom or default API URL
///
/// A local Bot API server (raised upload limits) is used when BOT_API_URL
/// is set.
pub fn create_bot() -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = if let Ok(bot_api_url) = std::env::var("BOT_API_URL") {
        log::info!("Using custom Bot API URL: {}", bot_api_url);
        let url = Url::parse(&bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
        Bot::from_env_with_client(client).set_api_url(url)
    } else {
        Bot::from_env_with_client(client)
    };
    Ok(bot)
}

/// Runs the long-polling dispatcher until shutdown.
pub async fn run_dispatcher(deps: Arc<AppDeps>) {
    let bot = deps.bot.clone();
    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![deps])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

/// Extracts the first http(s) URL from a message text.
fn extract_url(text: &str) -> Option<Url> {
    text.split_whitespace()
        .find(|token| token.starts_with("http://") || token.starts_with("https://"))
        .and_then(|token| Url::parse(token).ok())
}

async fn handle_message(bot: Bot, msg: Message, deps: Arc<AppDeps>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    let me = deps.bot_name.as_str();
    if let Ok(command) = Command::parse(text, me) {
        return handle_command(&bot, &deps, &msg, command).await;
    }

    match extract_url(text) {
        Some(url) => downloads::handle_download_request(&deps, chat_id, url, TaskKind::Download).await,
        None => {
            bot.send_message(chat_id, "Send me a link to download, or /help.").await?;
            Ok(())
        }
    }
}

async fn handle_command(bot: &Bot, deps: &AppDeps, msg: &Message, command: Command) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(0);

    match command {
        Command::Start | Command::Help => {
            bot.send_message(chat_id, help_text()).await?;
            Ok(())
        }
        Command::Audio(arg) => match extract_url(&arg) {
            Some(url) => downloads::handle_download_request(deps, chat_id, url, TaskKind::AudioExtract).await,
            None => {
                bot.send_message(chat_id, "Usage: /audio <url>").await?;
                Ok(())
            }
        },
        Command::Stats => admin::handle_stats(deps, chat_id).await,
        Command::Purge => {
            if !admin::is_admin(user_id) {
                bot.send_message(chat_id, "Admins only.").await?;
                return Ok(());
            }
            admin::handle_purge(deps, chat_id).await
        }
        Command::Update => {
            if !admin::is_admin(user_id) {
                bot.send_message(chat_id, "Admins only.").await?;
                return Ok(());
            }
            admin::handle_update(deps, chat_id).await
        }
    }
}
