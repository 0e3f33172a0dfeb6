//! Runtime orchestration.
//!
//! [`HowlRuntime`] ties the pieces together: it loads and validates the
//! configuration, sets up logging and metrics, builds the [`Dispatcher`] and
//! the [`ImageAlbum`], and owns the background tasks until shutdown.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use howl_runtime::HowlRuntime;
//!
//! let runtime = HowlRuntime::builder()
//!     .config_file("howl.toml")
//!     .commands(registry)
//!     .messenger(messenger)
//!     .build()?;
//!
//! // From the connection layer, once per received message:
//! runtime.on_inbound_event(event);
//!
//! runtime.run().await?;
//! ```

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::album::ImageAlbum;
use crate::config::{ConfigLoader, HowlConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::metrics::{MetricsHandle, init_metrics};
use howl_core::{GameRegistry, InboundEvent, InviteResolver, Messenger, Scheduler};
use howl_framework::{CommandRegistry, DispatchOutcome, Dispatcher};

/// The Howl runtime.
///
/// Every inbound event is handled on its own task, so one slow command never
/// holds up the next message. Once stopped, the runtime stays stopped.
pub struct HowlRuntime {
    config: HowlConfig,
    dispatcher: Dispatcher,
    album: ImageAlbum,
    metrics: MetricsHandle,
    shutdown: CancellationToken,
    background: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
}

impl HowlRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn config(&self) -> &HowlConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The image album. Clones share the snapshot the refresher updates.
    pub fn album(&self) -> &ImageAlbum {
        &self.album
    }

    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    /// Cancelled when the runtime stops.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawns a task handling `event`. Retention time is measured from now.
    pub fn spawn_event(&self, event: InboundEvent) -> JoinHandle<DispatchOutcome> {
        let received_at = Instant::now();
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move { dispatcher.process_received(event, received_at).await })
    }

    /// Hands an event to its own task and returns immediately.
    ///
    /// Events arriving after shutdown are dropped.
    pub fn on_inbound_event(&self, event: InboundEvent) {
        if self.shutdown.is_cancelled() {
            debug!(message = %event.message_id, "Runtime stopped, dropping event");
            return;
        }
        drop(self.spawn_event(event));
    }

    /// Starts the background tasks.
    pub fn start(&self) {
        if self.shutdown.is_cancelled() {
            warn!("Runtime was stopped and cannot be started again");
            return;
        }
        if self.running.swap(true, Ordering::AcqRel) {
            warn!("Runtime is already running");
            return;
        }

        info!(
            prefix = self.config.bot.active_prefix(),
            commands = self.dispatcher.registry().len(),
            "Starting Howl runtime"
        );

        let interval = self.config.album.refresh_interval();
        if let Some(handle) = self
            .album
            .spawn_refresh(interval, self.shutdown.child_token())
        {
            debug!(interval_secs = interval.as_secs(), "Album refresher started");
            self.background.lock().push(handle);
        }

        info!("Runtime started");
    }

    /// Cancels the background tasks and waits for them to finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            warn!("Runtime is not running");
        }

        info!("Stopping Howl runtime");
        self.shutdown.cancel();

        let handles = std::mem::take(&mut *self.background.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Background task failed during shutdown");
            }
        }

        info!("Runtime stopped");
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.start();
        info!("Howl runtime is now running. Press Ctrl+C to stop.");

        let signalled = wait_for_shutdown_signal().await;
        self.stop().await;
        signalled
    }

    /// Runs until `shutdown` completes or the runtime is stopped elsewhere.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: std::future::Future<Output = ()>,
    {
        self.start();

        let token = self.shutdown.clone();
        tokio::select! {
            () = shutdown => {}
            () = token.cancelled() => {}
        }

        self.stop().await;
    }
}

impl std::fmt::Debug for HowlRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HowlRuntime")
            .field("prefix", &self.config.bot.active_prefix())
            .field("album", &self.album)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

async fn wait_for_shutdown_signal() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`HowlRuntime`].
///
/// Without an explicit [`config`](Self::config) the configuration is loaded
/// from `howl.toml` in the current directory, the active profile file and
/// `HOWL_*` environment variables.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<HowlConfig>,
    commands: CommandRegistry,
    messenger: Option<Arc<dyn Messenger>>,
    games: Option<Arc<dyn GameRegistry>>,
    invites: Option<Arc<dyn InviteResolver>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    album: Option<ImageAlbum>,
    init_logging: bool,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            config: None,
            commands: CommandRegistry::new(),
            messenger: None,
            games: None,
            invites: None,
            scheduler: None,
            album: None,
            init_logging: true,
        }
    }

    /// Uses a ready configuration instead of loading one.
    pub fn config(mut self, config: HowlConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn commands(mut self, commands: CommandRegistry) -> Self {
        self.commands = commands;
        self
    }

    /// Sets the outbound messenger. Required.
    pub fn messenger(mut self, messenger: Arc<dyn Messenger>) -> Self {
        self.messenger = Some(messenger);
        self
    }

    pub fn games(mut self, games: Arc<dyn GameRegistry>) -> Self {
        self.games = Some(games);
        self
    }

    pub fn invites(mut self, invites: Arc<dyn InviteResolver>) -> Self {
        self.invites = Some(invites);
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Uses an album built ahead of time, e.g. one already shared with
    /// commands. Otherwise one is built from `album` configuration.
    pub fn album(mut self, album: ImageAlbum) -> Self {
        self.album = Some(album);
        self
    }

    /// Leaves the global tracing subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    pub fn build(self) -> RuntimeResult<HowlRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => self.config_loader.load()?,
        };
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let messenger = self.messenger.ok_or(RuntimeError::MissingMessenger)?;
        let metrics = init_metrics(&config.metrics)?;

        let mut builder = Dispatcher::builder(self.commands, config.routing(), messenger)
            .metrics(metrics.dispatch_metrics());
        if let Some(games) = self.games {
            builder = builder.games(games);
        }
        if let Some(invites) = self.invites {
            builder = builder.invites(invites);
        }
        if let Some(scheduler) = self.scheduler {
            builder = builder.scheduler(scheduler);
        }
        let dispatcher = builder.build();

        let album = match self.album {
            Some(album) => album,
            None => ImageAlbum::from_config(&config.album)?,
        };

        info!(
            prefix = config.bot.active_prefix(),
            restricted = config.lounge.is_enabled(),
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        Ok(HowlRuntime {
            config,
            dispatcher,
            album,
            metrics,
            shutdown: CancellationToken::new(),
            background: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
