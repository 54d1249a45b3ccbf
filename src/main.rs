mod config;
mod error;
mod exchange;
mod execution;
mod market_data;
mod strategy;
mod types;
mod utils;

use std::any::Any;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::{BotConfig, CredentialSource, EnvCredentials, TerminalPrompt};
use crate::error::{BotError, ConfigError};
use crate::exchange::BinanceFutures;
use crate::strategy::engine::LadderEngine;
use crate::utils::connection_util::{build_http_client, RestConnection};

#[tokio::main]
async fn main() -> ExitCode {
    let env_file = config::load_env_files();
    init_logger();
    install_crash_logger();

    info!("Binance Ladder Bot Starting...");

    match run(env_file).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Startup failed: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(env_file: Result<Option<PathBuf>, ConfigError>) -> Result<(), BotError> {
    match env_file? {
        Some(path) => info!("Loaded environment from {}", path.display()),
        None => warn!("No .env file found. Falling back to environment or manual input."),
    }
    let config = BotConfig::from_env()?;

    let env_source = EnvCredentials;
    let prompt = TerminalPrompt;
    let mut sources: Vec<&dyn CredentialSource> = vec![&env_source];
    if TerminalPrompt::available() {
        sources.push(&prompt);
    }
    let credentials = config::load_credentials(&sources)?;
    info!("Using {} request signing against {}", credentials.signer.kind(), config.base_url);

    let http = build_http_client(config.request_timeout).map_err(ConfigError::HttpClient)?;
    let connection = RestConnection::new(http, config.base_url.clone(), credentials, config.recv_window_ms);
    let exchange = BinanceFutures::new(connection);

    let shutdown = CancellationToken::new();
    spawn_stop_listener(shutdown.clone());

    let mut engine = LadderEngine::start(exchange, &config.strategy, config.timing, &shutdown).await?;
    engine.run(shutdown).await;

    Ok(())
}

/// Routes panics, including those in spawned tasks, through the logger and
/// exits with code 2.
fn install_crash_logger() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        error!("Bot crashed: {}", crash_message(info.payload(), location));
        log::logger().flush();
        std::process::exit(2);
    }));
}

fn crash_message(payload: &(dyn Any + Send), location: Option<String>) -> String {
    let reason = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    match location {
        Some(at) => format!("{} at {}", reason, at),
        None => reason,
    }
}

fn spawn_stop_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match wait_for_stop_signal().await {
            Ok(()) => {
                warn!("Stop requested, finishing current iteration...");
                shutdown.cancel();
            }
            Err(e) => error!("Failed to listen for stop signal: {}", e),
        }
    });
}

#[cfg(unix)]
async fn wait_for_stop_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_stop_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|f, record| {
            writeln!(
                f,
                "[{} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();
}
