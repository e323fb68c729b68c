//! Process runtime.
//!
//! [`DingbotRuntime`] turns a [`DingbotConfig`] into a ready robot client and,
//! when `outgoing.enabled` is set, an outgoing-robot server that runs until
//! Ctrl+C or SIGTERM.
//!
//! ```rust,ignore
//! use dingbot_runtime::DingbotRuntime;
//!
//! let runtime = DingbotRuntime::builder()
//!     .config_file("dingbot.toml")
//!     .build()?;
//!
//! runtime.client()?.send_text_message("bot online", []).await?;
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use dingbot_client::DingTalk;
use dingbot_framework::{CommandRegistry, OutgoingDispatcher, listen};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{ConfigLoader, ConfigResult, DingbotConfig, RobotConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Owns the robot client, the command registry and the outgoing server.
pub struct DingbotRuntime {
    config: DingbotConfig,
    client: Option<Arc<DingTalk>>,
    registry: Arc<CommandRegistry>,
    shutdown: CancellationToken,
}

impl DingbotRuntime {
    /// Loads configuration from the default locations, falling back to
    /// defaults on error.
    pub fn new() -> RuntimeResult<Self> {
        let config = ConfigLoader::new()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                DingbotConfig::default()
            });

        Self::from_config(&config)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Initializes logging, validates `config` and builds the client.
    ///
    /// Commands are served from the process-wide registry unless
    /// [`with_registry`](Self::with_registry) replaces it.
    pub fn from_config(config: &DingbotConfig) -> RuntimeResult<Self> {
        logging::init_from_config(&config.logging);
        validate_config(config)?;

        let client = if config.robot.is_configured() {
            Some(Arc::new(build_client(&config.robot)?))
        } else {
            warn!("No robot tokens configured, outbound sending is disabled");
            None
        };

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            robot = client.is_some(),
            outgoing = config.outgoing.enabled,
            "Runtime initialized from configuration"
        );

        Ok(Self {
            config: config.clone(),
            client,
            registry: CommandRegistry::global(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Serves commands from `registry` instead of the global one.
    pub fn with_registry(mut self, registry: Arc<CommandRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &DingbotConfig {
        &self.config
    }

    /// The configured robot client.
    pub fn client(&self) -> RuntimeResult<Arc<DingTalk>> {
        self.client.clone().ok_or(RuntimeError::RobotNotConfigured)
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Token that stops [`run`](Self::run) when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Builds the outgoing dispatcher from configuration.
    pub fn dispatcher(&self) -> OutgoingDispatcher {
        let outgoing = &self.config.outgoing;
        let mut dispatcher = OutgoingDispatcher::new(Arc::clone(&self.registry))
            .with_tolerance(outgoing.timestamp_tolerance());
        if let Some(secret) = &outgoing.app_secret {
            dispatcher = dispatcher.with_secret(secret.clone());
        }
        if let Some(token) = &outgoing.token {
            dispatcher = dispatcher.with_token(token.clone());
        }
        dispatcher
    }

    /// Runs until Ctrl+C, SIGTERM or [`shutdown_token`](Self::shutdown_token).
    pub async fn run(&self) -> RuntimeResult<()> {
        let token = self.shutdown.clone();
        self.run_until(async move {
            tokio::select! {
                _ = wait_for_shutdown() => {}
                _ = token.cancelled() => {}
            }
        })
        .await
    }

    /// Runs until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        if !self.config.outgoing.enabled {
            info!("Outgoing server disabled. Press Ctrl+C to stop.");
            shutdown.await;
            return Ok(());
        }

        let outgoing = &self.config.outgoing;
        let server_token = self.shutdown.child_token();
        let server = tokio::spawn({
            let addr = outgoing.addr();
            let path = outgoing.path.clone();
            let dispatcher = self.dispatcher();
            let token = server_token.clone();
            async move { listen(&addr, &path, dispatcher, token).await }
        });

        info!(
            commands = ?self.registry.names(),
            "dingbot runtime is now running. Press Ctrl+C to stop."
        );

        tokio::pin!(server);
        tokio::select! {
            result = &mut server => {
                // The server only returns early on a bind or accept error.
                return flatten(result);
            }
            _ = shutdown => {}
        }

        server_token.cancel();
        flatten(server.await)?;
        info!("dingbot runtime stopped");
        Ok(())
    }
}

fn build_client(robot: &RobotConfig) -> RuntimeResult<DingTalk> {
    let mut builder = DingTalk::builder()
        .tokens(robot.tokens.clone())
        .work_dir(robot.work_dir.clone())
        .base_url(robot.base_url.clone())
        .timeout(robot.timeout())
        .strategy(robot.token_strategy);
    if let Some(secret) = &robot.secret {
        builder = builder.secret(secret.clone());
    }
    Ok(builder.build()?)
}

fn flatten(result: Result<std::io::Result<()>, tokio::task::JoinError>) -> RuntimeResult<()> {
    match result {
        Ok(inner) => Ok(inner?),
        Err(e) => Err(RuntimeError::Join(e.to_string())),
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`DingbotRuntime`] with custom configuration sources.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    registry: Option<Arc<CommandRegistry>>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            registry: None,
        }
    }

    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn merge(mut self, config: DingbotConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn registry(mut self, registry: Arc<CommandRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Loads the configuration without building the runtime.
    pub fn load_config(self) -> ConfigResult<DingbotConfig> {
        self.config_loader.load()
    }

    pub fn build(self) -> RuntimeResult<DingbotRuntime> {
        let config = self.config_loader.load()?;
        let runtime = DingbotRuntime::from_config(&config)?;
        Ok(match self.registry {
            Some(registry) => runtime.with_registry(registry),
            None => runtime,
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
