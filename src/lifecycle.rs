//! Process lifecycle: bootstrap, serve, shut down.
//!
//! ```text
//! starting -> ready -> shutting-down -> closed
//! ```
//!
//! Shutdown is triggered by SIGINT/SIGTERM or by the transport going away,
//! and runs once whatever happens first.

use crate::config::Config;
use crate::dotenv::{load_env_file, EnvFileReport};
use crate::env::{EnvTable, ProcessEnv};
use crate::identity::{ensure_identity, IdentityDefaults};
use crate::logging::{self, LogConfig};
use crate::EchoServer;
use anyhow::Context;
use rmcp::{transport::stdio, ServiceExt};
use std::fmt;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// How the hosting program wants the server to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Serve MCP over the process's stdin/stdout.
    Stdio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Ready,
    ShuttingDown,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    TransportClosed,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Interrupt => "SIGINT received",
            Self::Terminate => "SIGTERM received",
            Self::TransportClosed => "transport closed",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("illegal lifecycle transition from {from:?} to {to:?}")]
    IllegalTransition { from: Phase, to: Phase },
}

/// Tracks the server phase and guarantees a single shutdown sequence.
#[derive(Debug)]
pub struct Lifecycle {
    phase: Phase,
    shutdown_reason: Option<ShutdownReason>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: Phase::Starting,
            shutdown_reason: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn shutdown_reason(&self) -> Option<ShutdownReason> {
        self.shutdown_reason
    }

    pub fn mark_ready(&mut self) -> Result<(), LifecycleError> {
        self.advance(Phase::Starting, Phase::Ready)
    }

    /// Enter `ShuttingDown`. Returns `false` if a shutdown already started.
    pub fn begin_shutdown(&mut self, reason: ShutdownReason) -> bool {
        match self.phase {
            Phase::Starting | Phase::Ready => {
                self.phase = Phase::ShuttingDown;
                self.shutdown_reason = Some(reason);
                true
            }
            Phase::ShuttingDown | Phase::Closed => false,
        }
    }

    pub fn mark_closed(&mut self) -> Result<(), LifecycleError> {
        self.advance(Phase::ShuttingDown, Phase::Closed)
    }

    fn advance(&mut self, from: Phase, to: Phase) -> Result<(), LifecycleError> {
        if self.phase != from {
            return Err(LifecycleError::IllegalTransition { from: self.phase, to });
        }
        self.phase = to;
        Ok(())
    }
}

/// What the one-time environment bootstrap did.
#[derive(Debug)]
pub struct Bootstrap {
    pub env_file: io::Result<EnvFileReport>,
    pub identity: IdentityDefaults,
}

/// Apply the workspace `.env` file, then fill in `WORKSPACE_SLUG` and `PWD`.
pub fn bootstrap(config: &Config, table: &dyn EnvTable) -> Bootstrap {
    let env_file = load_env_file(&config.env_file, table);
    let identity = ensure_identity(table, config.workdir());
    Bootstrap { env_file, identity }
}

impl Bootstrap {
    /// Runs after logging is up, since the log level may come from `.env`.
    fn log(&self, config: &Config) {
        match &self.env_file {
            Ok(EnvFileReport::Missing) => {}
            Ok(EnvFileReport::Loaded { applied, preserved }) => tracing::debug!(
                path = %config.env_file.display(),
                applied = applied.len(),
                preserved = preserved.len(),
                "Loaded workspace env file"
            ),
            Err(e) => tracing::error!("Failed to read {}: {}", config.env_file.display(), e),
        }
        if let Some(slug) = &self.identity.workspace_slug {
            tracing::debug!(%slug, "WORKSPACE_SLUG derived from working directory");
        }
        if let Some(pwd) = &self.identity.pwd {
            tracing::debug!(%pwd, "PWD derived from working directory");
        }
    }
}

/// Bootstrap the process environment and serve until shutdown.
pub async fn run(mode: RunMode) -> anyhow::Result<()> {
    let config = Config::from_process()?;
    let table: Arc<dyn EnvTable> = Arc::new(ProcessEnv);

    let outcome = bootstrap(&config, table.as_ref());
    let log_config = LogConfig::from_env(table.as_ref());
    logging::init(&log_config);
    outcome.log(&config);
    tracing::debug!(level = %log_config.level, "Logging configured");

    let server = EchoServer::new(table);
    match mode {
        RunMode::Stdio => serve_stdio(server).await,
    }
}

async fn serve_stdio(server: EchoServer) -> anyhow::Result<()> {
    let mut lifecycle = Lifecycle::new();
    let cancel = CancellationToken::new();
    let mut signals = ShutdownSignals::install();
    tracing::debug!("Awaiting MCP client initialization on stdio");

    let service = tokio::select! {
        service = server.serve_with_ct(stdio(), cancel.clone()) => {
            service.context("failed to start MCP server on stdio")?
        }
        reason = signals.recv() => {
            lifecycle.begin_shutdown(reason);
            tracing::info!("Shutting down before client initialization: {}", reason);
            cancel.cancel();
            lifecycle.mark_closed()?;
            return Ok(());
        }
    };
    lifecycle.mark_ready()?;
    tracing::info!("MCP server ready - awaiting client requests on stdio.");

    let waiting = service.waiting();
    tokio::pin!(waiting);

    let quit = loop {
        tokio::select! {
            quit = &mut waiting => {
                if lifecycle.begin_shutdown(ShutdownReason::TransportClosed) {
                    tracing::info!("Shutting down: {}", ShutdownReason::TransportClosed);
                }
                break quit;
            }
            reason = signals.recv() => {
                if lifecycle.begin_shutdown(reason) {
                    tracing::info!("Shutting down: {}", reason);
                    cancel.cancel();
                } else {
                    tracing::debug!("Ignoring {}: shutdown already in progress", reason);
                }
            }
        }
    };
    lifecycle.mark_closed()?;

    let reason = lifecycle
        .shutdown_reason()
        .unwrap_or(ShutdownReason::TransportClosed);
    match quit {
        Ok(quit_reason) => {
            tracing::info!(%reason, ?quit_reason, "MCP server stopped");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Error during shutdown: {}", e);
            Err(anyhow::Error::new(e).context("MCP service task failed"))
        }
    }
}

/// SIGINT/SIGTERM listeners, registered before the transport opens so a signal
/// during the handshake still takes the shutdown path.
struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: Option<tokio::signal::unix::Signal>,
    #[cfg(unix)]
    terminate: Option<tokio::signal::unix::Signal>,
}

impl ShutdownSignals {
    fn install() -> Self {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let interrupt = signal(SignalKind::interrupt())
                .inspect_err(|e| tracing::error!("Failed to install SIGINT handler: {}", e))
                .ok();
            let terminate = signal(SignalKind::terminate())
                .inspect_err(|e| tracing::error!("Failed to install SIGTERM handler: {}", e))
                .ok();
            Self { interrupt, terminate }
        }

        #[cfg(not(unix))]
        {
            Self {}
        }
    }

    /// Resolves on the next SIGINT or SIGTERM.
    async fn recv(&mut self) -> ShutdownReason {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = next_signal(&mut self.interrupt) => ShutdownReason::Interrupt,
                _ = next_signal(&mut self.terminate) => ShutdownReason::Terminate,
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to install SIGINT handler: {}", e);
                std::future::pending::<()>().await;
            }
            ShutdownReason::Interrupt
        }
    }
}

/// Never resolves when the listener is missing or its stream has ended.
#[cfg(unix)]
async fn next_signal(signal: &mut Option<tokio::signal::unix::Signal>) {
    if let Some(signal) = signal {
        if signal.recv().await.is_some() {
            return;
        }
    }
    std::future::pending::<()>().await
}
