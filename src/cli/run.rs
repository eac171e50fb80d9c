use crate::config::parse::{load_config_from_env, load_config_with, ConfigError, EndpointRequirement};
use crate::config::Config;
use crate::pipeline::{BackpressureHandler, Pipeline, Router};
use crate::sender::{ConsoleSender, HttpSender, Sender, SenderError};
use crate::source::{
    host_metadata, run_file_source, run_journald_source, FileTail, SourceContext, SourceError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("sender error: {0}")]
    Sender(#[from] SenderError),
}

pub async fn run(config_path: Option<PathBuf>, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    run_agent(config_path.as_deref(), dry_run)
        .await
        .map_err(|e| e.into())
}

/// Load from the file when one was found, otherwise from `LOGSHIP_*`
/// variables alone
pub fn load(config_path: Option<&Path>, dry_run: bool) -> Result<Config, ConfigError> {
    let requirement = if dry_run {
        EndpointRequirement::Optional
    } else {
        EndpointRequirement::Required
    };

    match config_path {
        Some(path) => {
            info!(config_path = %path.display(), "Loading configuration");
            load_config_with(path, requirement)
        }
        None => {
            info!("No config file found, reading configuration from the environment");
            load_config_from_env(requirement)
        }
    }
}

async fn run_agent(config_path: Option<&Path>, dry_run: bool) -> Result<(), RunError> {
    let config = load(config_path, dry_run)?;

    let sender: Arc<dyn Sender> = if dry_run {
        info!("Dry run, entries are written to stdout");
        Arc::new(ConsoleSender::new())
    } else {
        let sender = HttpSender::new(&config.sender)?;
        info!(endpoint = %sender.endpoint(), "Sending entries to collector");
        Arc::new(sender)
    };

    let pipeline = Arc::new(Pipeline::new(&config.pipeline, sender).with_labels(config.labels.clone()));
    let router = Arc::new(Router::new(
        pipeline,
        BackpressureHandler::new(config.pipeline.backpressure, config.pipeline.queue_capacity),
    ));

    let shutdown = CancellationToken::new();
    let ctx = Arc::new(SourceContext::new(
        Arc::clone(&router),
        host_metadata(),
        config.sources.ignored.clone(),
        shutdown.clone(),
    ));

    let mut sources = JoinSet::new();

    let mut file_ids: Vec<&String> = config.sources.files.keys().collect();
    file_ids.sort();
    for source_id in file_ids {
        let tail = FileTail::new(source_id.as_str(), &config.sources.files[source_id]);
        sources.spawn(run_file_source(tail, Arc::clone(&ctx)));
    }

    if config.sources.journald.enabled {
        let journald = config.sources.journald.clone();
        let ctx = Arc::clone(&ctx);
        sources.spawn(async move { run_journald_source(&journald, ctx).await });
    }

    if sources.is_empty() {
        warn!("No sources configured, nothing to forward");
    }

    info!(sources = sources.len(), "Agent started, press Ctrl+C to shutdown");

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = drain(&mut sources) => {
            info!("All sources finished");
        }
    }

    shutdown.cancel();
    drain(&mut sources).await;

    // Everything still queued or buffered per source goes out before exit
    router.shutdown().await;
    info!("Shutdown complete");

    Ok(())
}

async fn drain(sources: &mut JoinSet<Result<(), SourceError>>) {
    while let Some(result) = sources.join_next().await {
        log_source_result(result);
    }
}

fn log_source_result(result: Result<Result<(), SourceError>, JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Source stopped with error"),
        Err(e) => error!(error = %e, "Source task join error"),
    }
}
