//! e - a script-extensible terminal text editor
//! 
//! Entry point: loads configuration, sets up logging, puts the terminal
//! in raw mode and runs the reactor over standard input.

use std::fs::OpenOptions;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use e::core::config::LogConfig;
use e::core::{AppConfig, APP_NAME, VERSION};
use e::editor::Buffer;
use e::reactor::{RawTerminal, Reactor, StopReason};
use e::Session;

fn main() -> Result<()> {
    // stdin is read on a blocking thread that never returns on its own,
    // so shutdown must not wait for it
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;

    let result = runtime.block_on(run());
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn run() -> Result<()> {
    let (config, config_error) = match AppConfig::load().await {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    init_logging(&config.log)?;
    info!("{} v{} starting...", APP_NAME, VERSION);
    if let Some(e) = config_error {
        warn!("Failed to load config, using defaults: {}", e);
    }

    let buffer = match std::env::args().nth(1) {
        Some(path) => Buffer::open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path))?,
        None => Buffer::new(config.editor.scratch_name.clone()),
    };
    info!(buffer = buffer.name(), lines = buffer.len(), "buffer ready");

    let mut session = Session::new(buffer, &config.editor);
    let mut reactor = Reactor::new(&config.input);

    let reason = {
        let _terminal = RawTerminal::enter()?;
        let mut stdin = tokio::io::stdin();
        let reason = reactor.run(&mut stdin, &mut session).await;
        let cancelled = reactor.shutdown(&mut session);
        info!(cancelled, "timers cancelled");
        reason
    };

    match reason {
        Ok(StopReason::Quit) => info!("quit"),
        Ok(reason) => info!(?reason, "input loop ended"),
        Err(e) => {
            error!("Input loop failed: {}", e);
            return Err(e.into());
        }
    }

    if session.buffer().is_dirty() {
        warn!(buffer = session.buffer().name(), "exiting with unsaved changes");
    }

    Ok(())
}

/// Logs go to the configured file, or stderr when none is set
fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}
