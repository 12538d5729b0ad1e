//! Config watcher
//!
//! Polls the config file while running and hot-swaps the input when the
//! `[input]` section changes. Other sections only apply on restart.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ferry_config::{Config, InputConfig};
use ferry_core::{ComponentError, MetricsRegistry, StreamedInput};
use ferry_inputs::{InputWrapper, new_input};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default delay between config file checks
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(1);

/// Background task reloading the input from the config file
pub struct ConfigWatcher {
    path: PathBuf,
    interval: Duration,
    current: InputConfig,
    input: Arc<InputWrapper>,
    metrics: Arc<MetricsRegistry>,
    cancel: CancellationToken,
}

impl ConfigWatcher {
    /// Watch `path`; `current` is the input config the stream started with
    pub fn new(
        path: impl Into<PathBuf>,
        current: InputConfig,
        input: Arc<InputWrapper>,
        metrics: Arc<MetricsRegistry>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            path: path.into(),
            interval: DEFAULT_WATCH_INTERVAL,
            current,
            input,
            metrics,
            cancel,
        }
    }

    /// Set the poll interval
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until cancelled
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        info!(
            path = %self.path.display(),
            interval = ?self.interval,
            "watching config for input changes"
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.check().await;
                }
            }
        }
        debug!("config watcher stopped");
    }

    /// Reload the file once; returns whether the input was swapped
    async fn check(&mut self) -> bool {
        let config = match Config::from_file(&self.path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to reload config");
                return false;
            }
        };
        if config.input == self.current {
            return false;
        }

        let replacement = match new_input(&config.input, &self.metrics) {
            Ok(input) => input,
            Err(e) => {
                warn!(error = %e, "failed to build reloaded input, keeping current one");
                return false;
            }
        };

        match self.input.close_existing_input(&self.cancel).await {
            Ok(()) => {}
            Err(ComponentError::Cancelled) => {
                replacement.close_async();
                return false;
            }
            Err(e) => warn!(error = %e, "previous input did not close cleanly"),
        }

        self.input.swap_input(replacement);
        info!(input = config.input.type_name(), "input reloaded");
        self.current = config.input;
        true
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::stream::Stream;

    fn config_text(prefix: &str) -> String {
        format!(
            r#"
[input]
type = "generate"
payload = "{prefix}${{! count(\"watch_{prefix}\") }}"
interval = "5ms"

[output]
type = "cache"
target = "store"
key = "${{! content() }}"

[resources.caches.store]
type = "memory"
"#
        )
    }

    fn write_config(path: &std::path::Path, text: &str) {
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn test_input_change_is_swapped_in() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ferry.toml");
        write_config(&path, &config_text("a"));

        let config = Config::from_file(&path).unwrap();
        let metrics = Arc::new(MetricsRegistry::new());
        let stream = Stream::start(&config, &metrics, true).unwrap();
        let cancel = CancellationToken::new();

        let watcher = ConfigWatcher::new(
            &path,
            config.input.clone(),
            stream.input(),
            Arc::clone(&metrics),
            cancel.clone(),
        )
        .with_interval(Duration::from_millis(10));
        let handle = tokio::spawn(watcher.run());

        let cache = stream.resources().cache("store").unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while cache.get("a1").await.is_err() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        write_config(&path, &config_text("b"));
        tokio::time::timeout(Duration::from_secs(5), async {
            while cache.get("b1").await.is_err() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        handle.await.unwrap();
        stream.stop(Duration::from_secs(2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_unchanged_or_broken_config_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ferry.toml");
        let text = "[input]\ntype = \"generate\"\npayload = \"x\"\ncount = 1\n\n[output]\ntype = \"drop\"\n";
        write_config(&path, text);

        let config = Config::from_file(&path).unwrap();
        let metrics = Arc::new(MetricsRegistry::new());
        let stream = Stream::start(&config, &metrics, true).unwrap();

        let mut watcher = ConfigWatcher::new(
            &path,
            config.input.clone(),
            stream.input(),
            metrics,
            CancellationToken::new(),
        );
        assert!(!watcher.check().await);

        write_config(&path, "not [valid toml");
        assert!(!watcher.check().await);

        stream.stop(Duration::from_secs(2)).await.unwrap();
    }
}
