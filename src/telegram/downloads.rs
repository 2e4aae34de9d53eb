//! Admission path and task execution.
//!
//! Request flow: settings → dedup cache (re-send the cached artifact when
//! possible) → dispatch onto a worker route, or direct execution when routed
//! dispatch is disabled for the process or the user.

use crate::core::config;
use crate::core::error::AppError;
use crate::core::metrics;
use crate::core::utils::truncate_diagnostic;
use crate::dispatch::queue::{Task, TaskKind, TaskQueue};
use crate::download::progress::{DownloadStatus, ProgressMessage};
use crate::download::{self, downloader, metadata};
use crate::storage::db::{self as db, DispatchMode, UserSettings};
use crate::telegram::transport::{Artifact, SendMeta};
use crate::telegram::uploads;
use crate::telegram::AppDeps;
use std::path::PathBuf;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use url::Url;

fn settings_for(deps: &AppDeps, chat_id: ChatId) -> UserSettings {
    match db::get_connection(&deps.db_pool).and_then(|conn| db::get_user_settings(&conn, chat_id.0)) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Failed to load settings for {}: {}; using defaults", chat_id, e);
            UserSettings::default()
        }
    }
}

/// Admits a download request: cache first, then dispatch or direct run.
pub async fn handle_download_request(deps: &AppDeps, chat_id: ChatId, url: Url, kind: TaskKind) -> ResponseResult<()> {
    let settings = settings_for(deps, chat_id);

    let status = deps.bot.send_message(chat_id, "⏳ Processing your link...").await?;
    let task = Task::new(chat_id, status.id.0, url.to_string(), kind);

    // Cache path: a second request for already delivered content is served
    // by re-sending the uploaded artifact, no download.
    match uploads::resend_cached(&deps.transport, &task, &settings, &deps.cache).await {
        Ok(Some(_)) => {
            let _ = deps
                .bot
                .edit_message_text(chat_id, status.id, "Download success!✅ (served from cache)")
                .await;
            return Ok(());
        }
        Ok(None) => {}
        Err(AppError::CacheStale) => {
            // Entry already invalidated; fall through to a fresh download.
            log::info!("Stale cache entry for {}; downloading fresh", task.url);
        }
        Err(e) => {
            log::warn!("Cache re-send failed unexpectedly for {}: {}", task.url, e);
        }
    }

    let routed = *config::ENABLE_DISPATCH && settings.dispatch == DispatchMode::Queued;
    if !routed {
        // Bypass mode: no worker selection, run on the admitting process.
        run_task(deps, task).await;
        return Ok(());
    }

    match crate::dispatch::dispatch(&*deps.broker).await {
        Ok(route) => {
            if let Err(e) = deps.broker.enqueue(task, &route).await {
                log::error!("Enqueue failed: {}", e);
                let _ = deps
                    .bot
                    .edit_message_text(chat_id, status.id, "❌ The queue is full right now. Try again later.")
                    .await;
            }
        }
        Err(e @ (AppError::NoCapacity | AppError::RegistryTimeout)) => {
            // Admission failure surfaces to the caller; the task is not
            // silently dropped.
            log::error!("Dispatch failed for {}: {}", task.url, e);
            let _ = deps
                .bot
                .edit_message_text(chat_id, status.id, format!("❌ Cannot take the task right now: {}", e))
                .await;
        }
        Err(e) => {
            log::error!("Dispatch failed for {}: {}", task.url, e);
            let _ = deps
                .bot
                .edit_message_text(chat_id, status.id, "❌ Something went wrong admitting your task.")
                .await;
        }
    }
    Ok(())
}

/// Executes one task end to end: download fully, then deliver each produced
/// file. Stages are strictly sequential per task.
pub async fn run_task(deps: &AppDeps, task: Task) {
    let chat_id = task.chat_id;
    let mut progress_msg = ProgressMessage::new(chat_id, MessageId(task.status_message_id));
    let settings = settings_for(deps, chat_id);

    let url = match Url::parse(&task.url) {
        Ok(url) => url,
        Err(e) => {
            log::error!("Task {} carries an unparsable URL: {}", task.id, e);
            progress_msg
                .update(&deps.bot, DownloadStatus::Error("Invalid URL".to_string()))
                .await;
            return;
        }
    };

    let dest_dir = PathBuf::from(&*config::DOWNLOAD_FOLDER).join(&task.id);
    if let Err(e) = std::fs::create_dir_all(&dest_dir) {
        log::error!("Failed to create download dir {}: {}", dest_dir.display(), e);
        progress_msg
            .update(&deps.bot, DownloadStatus::Error("Server storage unavailable".to_string()))
            .await;
        return;
    }

    progress_msg.update(&deps.bot, DownloadStatus::Starting).await;

    let format_hint = match task.kind {
        TaskKind::AudioExtract => Some("bestaudio[ext=m4a]".to_string()),
        TaskKind::Download => downloader::format_for_resolution(settings.resolution),
    };

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel();
    let url_for_download = url.clone();
    let dest_for_download = dest_dir.clone();
    let hint_for_download = format_hint.clone();
    let mut download_handle = tokio::spawn(async move {
        download::run(
            &url_for_download,
            &dest_for_download,
            hint_for_download.as_deref(),
            progress_tx,
        )
        .await
    });

    let download_result = loop {
        tokio::select! {
            Some(info) = progress_rx.recv() => {
                progress_msg.update(&deps.bot, DownloadStatus::Downloading(info)).await;
            }
            result = &mut download_handle => {
                break result.unwrap_or_else(|e| Err(AppError::Download(format!("Task join error: {}", e))));
            }
        }
    };

    let files = match download_result {
        Ok(files) => files,
        Err(e) => {
            metrics::record_download_failure(task.kind.label(), "downloader");
            let diagnostic = truncate_diagnostic(&e.to_string());
            progress_msg.update(&deps.bot, DownloadStatus::Error(diagnostic)).await;
            schedule_cleanup(dest_dir);
            return;
        }
    };
    metrics::record_download_success(task.kind.label());

    progress_msg.update(&deps.bot, DownloadStatus::Uploading).await;

    let mut delivered_any = false;
    for file in files {
        let probed = metadata::probe_media(&file).await;
        let meta = SendMeta {
            width: probed.width,
            height: probed.height,
            duration_secs: probed.duration_secs,
            ..Default::default()
        };
        let artifact = Artifact::Local(file.clone());
        match uploads::deliver(&deps.transport, &task, &artifact, &settings, &deps.cache, meta).await {
            Ok(_) => delivered_any = true,
            Err(AppError::PayloadTooLarge { size, limit }) => {
                // No fallback transport exists for oversized payloads;
                // report and move on to the next produced file, if any.
                let _ = deps
                    .bot
                    .send_message(
                        chat_id,
                        format!(
                            "Your file ({}) is too large for Telegram (limit {}).",
                            crate::core::utils::format_file_size(size),
                            crate::core::utils::format_file_size(limit)
                        ),
                    )
                    .await;
            }
            Err(e) => {
                log::error!("Delivery failed for {}: {}", task.url, e);
                progress_msg
                    .update(&deps.bot, DownloadStatus::Error(truncate_diagnostic(&e.to_string())))
                    .await;
                schedule_cleanup(dest_dir);
                return;
            }
        }
    }

    if delivered_any {
        progress_msg.update(&deps.bot, DownloadStatus::Success).await;
    }
    schedule_cleanup(dest_dir);
}

/// Deletes the task's download directory after a grace period, so a slow
/// transport read is never cut off.
fn schedule_cleanup(dest_dir: PathBuf) {
    tokio::spawn(async move {
        tokio::time::sleep(config::download::cleanup_delay()).await;
        if let Err(e) = std::fs::remove_dir_all(&dest_dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to clean up {}: {}", dest_dir.display(), e);
            }
        }
    });
}
