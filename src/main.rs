use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use tokio::time::sleep;

use tgdrop::cli::{Cli, Commands, PathArgs};
use tgdrop::core::{config, init_logger, log_startup_configuration, metrics, metrics_server, utils, Settings};
use tgdrop::download::{Layout, PathRouter, TaskQueue, TaskRunner, WorkerPool};
use tgdrop::telegram::{create_bot, schema, setup_bot_commands, AutoScanner, HandlerDeps, MediaClient, TaskDispatcher, TelegramClient};

/// Main entry point
///
/// Parses CLI arguments and dispatches to the selected subcommand.
///
/// # Errors
/// Returns an error if startup fails (logging, configuration, Bot API connection).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Some(Commands::Route {
            filename,
            folder,
            paths,
        }) => run_route(&filename, folder.as_deref(), &paths),
        Some(Commands::Init { paths }) => run_init(&paths),
        Some(Commands::Run) | None => {
            init_logger(&config::LOG_FILE_PATH)?;
            run_bot().await
        }
    }
}

fn layout_from(paths: &PathArgs) -> Layout {
    let expand = |p: &std::path::Path| std::path::PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref());
    Layout::new(expand(&paths.download_path), expand(&paths.torrent_path))
}

fn run_route(filename: &str, folder: Option<&std::path::Path>, paths: &PathArgs) -> Result<()> {
    let router = PathRouter::new(layout_from(paths));
    println!("{}", router.destination_for(filename, folder).display());
    Ok(())
}

fn run_init(paths: &PathArgs) -> Result<()> {
    let layout = layout_from(paths);
    layout.init()?;
    println!("Initialized {}", layout.root().display());
    Ok(())
}

async fn run_bot() -> Result<()> {
    log::info!("Starting bot...");

    let settings = match Settings::from_env() {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };
    log_startup_configuration(&settings);

    settings
        .layout()
        .init()
        .map_err(|e| anyhow::anyhow!("Failed to create download directories: {}", e))?;

    metrics::init_metrics();

    let bot = create_bot(&settings.bot_token)?;

    // Retry while the Bot API is unreachable; a rejected token is fatal
    let bot_info = {
        let mut attempt = 0;
        let mut delay = config::startup::backoff();
        loop {
            match bot.get_me().await {
                Ok(info) => break info,
                Err(e) => {
                    attempt += 1;
                    let retryable = matches!(e, teloxide::RequestError::Network(_) | teloxide::RequestError::Io(_));
                    if !retryable || attempt >= config::startup::GET_ME_ATTEMPTS {
                        log::error!("Cannot connect to the Bot API: {}", e);
                        return Err(anyhow::anyhow!("Failed to connect to Bot API after {} attempts: {}", attempt, e));
                    }
                    log::warn!(
                        "Bot API not ready (attempt {}/{}): {}. Retrying in {:?}...",
                        attempt,
                        config::startup::GET_ME_ATTEMPTS,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    };
    log::info!("Bot username: {:?}, Bot ID: {}", bot_info.username, bot_info.id);

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    if settings.metrics.enabled {
        let port = settings.metrics.port;
        tokio::spawn(async move {
            if let Err(e) = metrics_server::start_metrics_server(port).await {
                log::error!("Metrics server error: {}", e);
            }
        });
    }

    let client: Arc<dyn MediaClient> = Arc::new(TelegramClient::new(bot.clone()));
    let queue = Arc::new(TaskQueue::new());
    let runner = Arc::new(TaskRunner::new(Arc::clone(&client), Arc::clone(&settings)));
    let pool = WorkerPool::spawn(settings.max_parallel, Arc::clone(&queue), runner);

    let auto_scan = Arc::new(AutoScanner::new(&settings.auto_scan));
    let dispatcher = Arc::new(TaskDispatcher::new(
        Arc::clone(&client),
        Arc::clone(&queue),
        Arc::clone(&settings),
        auto_scan,
    ));

    if let Some(owner) = settings.owner() {
        let text = format!("Bot started {}", utils::long_time());
        if let Err(e) = client.send_message(owner, &text).await {
            log::warn!("Failed to notify owner {} about startup: {}", owner, e);
        }
    }

    let listener = Polling::builder(bot.clone()).build();
    Dispatcher::builder(bot, schema(HandlerDeps::new(dispatcher)))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher stopped, {} tasks abandoned", queue.outstanding());
    pool.shutdown().await;
    log::info!("Bot stopped");

    Ok(())
}
