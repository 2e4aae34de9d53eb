//! Admin control surface: queue purge, self-update/restart, stats.
//!
//! These commands operate on process and queue state only, never on the
//! cache map or dispatcher structures directly.

use crate::core::{config, process};
use crate::dispatch::queue::TaskQueue;
use crate::telegram::AppDeps;
use teloxide::prelude::*;

/// Whether this user may run admin commands.
pub fn is_admin(user_id: i64) -> bool {
    let admin = *config::ADMIN_USER_ID;
    admin != 0 && user_id == admin
}

/// Drops every pending (not yet claimed) task and reports the count.
pub async fn handle_purge(deps: &AppDeps, chat_id: ChatId) -> ResponseResult<()> {
    let purged = deps.broker.purge_all().await;
    deps.bot
        .send_message(chat_id, format!("Purged {} pending tasks.", purged))
        .await?;
    Ok(())
}

/// Pulls the latest code and schedules a restart.
pub async fn handle_update(deps: &AppDeps, chat_id: ChatId) -> ResponseResult<()> {
    match process::pull_latest().await {
        Ok(summary) => {
            deps.bot
                .send_message(chat_id, format!("Updated:\n{}\nRestarting...", summary))
                .await?;
            process::schedule_restart();
        }
        Err(e) => {
            deps.bot.send_message(chat_id, format!("Update failed: {}", e)).await?;
        }
    }
    Ok(())
}

/// Cache and queue statistics.
pub async fn handle_stats(deps: &AppDeps, chat_id: ChatId) -> ResponseResult<()> {
    let cache = deps.cache.stats().await;
    let pending = deps.broker.pending().await;
    let text = format!(
        "Cache: {} entries, {} hits, {} misses\nQueue: {} pending tasks",
        cache.size, cache.hits, cache.misses, pending
    );
    deps.bot.send_message(chat_id, text).await?;
    Ok(())
}
