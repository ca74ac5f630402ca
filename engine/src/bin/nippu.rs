//! NIPPU engine binary
//!
//! Reads file events as JSON lines from stdin and feeds them to the
//! batching engine. One event per line:
//!
//! ```text
//! {"key": 42, "category": "image", "file": {"file_id": "abc123"}}
//! ```
//!
//! Configuration comes from `NIPPU_*` environment variables; at least one
//! per-category webhook must be set. The process drains its buffers and
//! exits on stdin EOF, Ctrl+C or SIGTERM.

use anyhow::Context;
use nippu_engine::{
    Category, Config, Engine, EngineError, Event, FileDescriptor, HttpNotifier, LogFormat,
    LogNotifier, ProducerKey, WebhookDeliverer,
};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// One stdin line: an event as the producer sends it
#[derive(Debug, Deserialize)]
struct InboundEvent {
    key: ProducerKey,
    category: Category,
    file: FileDescriptor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load config from env ──────────────────────────────
    let config = Config::from_env().context("loading configuration")?;

    // ── 2. Init tracing ──────────────────────────────────────
    init_tracing(&config);

    info!(
        idle_timeout_ms = config.idle_timeout.as_millis() as u64,
        max_batch_size = config.max_batch_size,
        delivery_timeout_ms = config.delivery_timeout.as_millis() as u64,
        dispatch_concurrency = config.dispatch_concurrency,
        "Starting NIPPU"
    );
    for target in &config.targets {
        info!(category = %target.category, url = %target.url, "delivery target");
    }

    // ── 3. Wire the engine ───────────────────────────────────
    let deliverer = WebhookDeliverer::new(config.connect_timeout)?;
    let engine = Engine::from_config(&config).deliverer(deliverer);
    let engine = match &config.notify_webhook {
        Some(url) => {
            info!(url = %url, "outcome notifications via webhook");
            engine.notifier(HttpNotifier::new(url, config.connect_timeout)?)
        }
        None => engine.notifier(LogNotifier::new()),
    };
    let (handle, runner) = engine.build()?;
    let runner_handle = tokio::spawn(runner.run());

    // ── 4. Read events from stdin ────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let inbound: InboundEvent = match serde_json::from_str(line) {
                        Ok(inbound) => inbound,
                        Err(e) => {
                            warn!(error = %e, "skipping malformed event line");
                            continue;
                        }
                    };
                    let event = Event::new(inbound.key, inbound.category, inbound.file);
                    match handle.submit(event).await {
                        Ok(()) => {}
                        Err(e @ EngineError::Rejected(_)) => {
                            warn!(error = %e, "event rejected");
                        }
                        Err(e) => {
                            error!(error = %e, "submit failed, stopping intake");
                            break;
                        }
                    }
                }
                Ok(None) => {
                    info!("stdin closed, draining");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "stdin read failed, draining");
                    break;
                }
            },
        }
    }

    // ── 5. Drain and shut down ───────────────────────────────
    drop(handle);
    runner_handle.await??;
    info!("NIPPU shutdown complete");

    Ok(())
}

fn init_tracing(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_level.clone().into());

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.log_format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
