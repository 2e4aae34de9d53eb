use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;

use dorarelay::cli::{Cli, Commands};
use dorarelay::core::{config, init_logger, metrics};
use dorarelay::dispatch::queue::{InMemoryBroker, TaskQueue};
use dorarelay::dispatch::registry::WorkerDescriptor;
use dorarelay::dispatch::worker::spawn_worker;
use dorarelay::storage::{cache::DedupCache, db};
use dorarelay::telegram::{create_bot, run_dispatcher, AppDeps, TelegramTransport};
use teloxide::prelude::*;

/// Main entry point.
///
/// Loads the environment, initializes logging and storage, registers this
/// process's worker, and runs the Telegram dispatcher until shutdown.
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before the first config access
    let _ = dotenv();

    let cli = Cli::parse_args();

    if let Some(Commands::Stats) = cli.command {
        println!("{}", metrics::gather_text());
        return Ok(());
    }

    init_logger(&config::LOG_FILE_PATH)?;

    // Log panics from handler tasks instead of dying silently
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("BOT_TOKEN (or TELOXIDE_TOKEN) is not set");
    }
    // teloxide reads TELOXIDE_TOKEN; mirror BOT_TOKEN onto it when only the
    // former is set.
    if std::env::var("TELOXIDE_TOKEN").is_err() {
        std::env::set_var("TELOXIDE_TOKEN", &*config::BOT_TOKEN);
    }

    std::fs::create_dir_all(&*config::DOWNLOAD_FOLDER)?;

    let db_pool = Arc::new(db::create_pool(&config::DATABASE_PATH)?);
    let cache = Arc::new(DedupCache::new());
    let broker = Arc::new(InMemoryBroker::new());

    let bot = create_bot()?;
    let me = bot.get_me().await?;
    let bot_name = me.username().to_string();
    log::info!("Starting dorarelay as @{}", bot_name);

    let transport = TelegramTransport::new(bot.clone());
    let deps = Arc::new(AppDeps {
        bot,
        bot_name,
        db_pool,
        cache,
        broker: Arc::clone(&broker),
        transport,
    });

    // Register this process's worker and start consuming its route.
    let descriptor = WorkerDescriptor::new(
        config::WORKER_NAME.clone(),
        config::WORKER_NAME.clone(),
        config::dispatch::WORKER_CONCURRENCY,
    );
    broker.register_worker(descriptor.clone()).await;
    let _worker = spawn_worker(Arc::clone(&deps), descriptor);

    // Periodic maintenance: keep the queue-depth gauge honest even when idle.
    {
        let broker = Arc::clone(&broker);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(config::maintenance::tick_interval());
            loop {
                tick.tick().await;
                let pending = broker.pending().await;
                metrics::update_queue_depth(pending);
                log::info!("Maintenance tick: {} pending tasks", pending);
            }
        });
    }

    run_dispatcher(deps).await;

    log::info!("Shutting down");
    Ok(())
}
