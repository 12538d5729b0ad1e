//! Run command - run a stream until interrupted or the input completes

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use ferry_api::AdminApi;
use ferry_config::Config;
use ferry_core::{MetricsRegistry, MetricsReporter};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::stream::Stream;
use crate::watcher::ConfigWatcher;

/// Time allowed for the API server and background tasks to stop
const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Poll the config file and hot-swap the input when it changes
    #[arg(short, long)]
    pub watch: bool,
}

/// Run the stream described by `config`
pub async fn run(args: RunArgs, config: Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        watch = args.watch,
        "ferry starting"
    );

    let config = Arc::new(config);
    let metrics = Arc::new(MetricsRegistry::new());
    let cancel = CancellationToken::new();

    let stream = Stream::start(&config, &metrics, args.watch)?;

    let api = Arc::new(AdminApi::new(&config.http));
    api.register_defaults(env!("CARGO_PKG_VERSION"));
    api.register_metrics(Arc::clone(&metrics));
    api.register_readiness(stream.input(), stream.output());
    api.register_debug_config(Arc::clone(&config));

    let api_task = {
        let api = Arc::clone(&api);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = api.serve(cancel.clone()).await {
                error!(error = %e, "admin API failed");
            }
        })
    };

    let reporter_task = if config.metrics.enabled() {
        let reporter = MetricsReporter::new(Arc::clone(&metrics), config.metrics.interval);
        Some(tokio::spawn(reporter.run(cancel.clone())))
    } else {
        info!("metrics reporting disabled");
        None
    };

    let watcher_task = args.watch.then(|| {
        let watcher = ConfigWatcher::new(
            &args.config,
            config.input.clone(),
            stream.input(),
            Arc::clone(&metrics),
            cancel.clone(),
        );
        tokio::spawn(watcher.run())
    });

    tokio::select! {
        _ = wait_for_shutdown() => info!("shutdown signal received, stopping"),
        _ = stream.finished() => info!("input completed, stopping"),
    }

    let stopped = stream.stop(config.shutdown_timeout).await;
    cancel.cancel();

    let tasks = [
        ("admin API", Some(api_task)),
        ("metrics reporter", reporter_task),
        ("config watcher", watcher_task),
    ];
    for (name, task) in tasks {
        let Some(task) = task else { continue };
        match tokio::time::timeout(TASK_STOP_TIMEOUT, task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(task = name, error = %e, "task panicked"),
            Err(_) => warn!(task = name, "task did not stop within timeout"),
        }
    }

    match stopped {
        Ok(()) => {
            info!("ferry shutdown complete");
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "stream failed to stop within {:?}: {e}",
            config.shutdown_timeout
        )),
    }
}

/// Resolve on ctrl-c, or SIGTERM on unix
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
