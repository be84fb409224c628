// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Process lifecycle controller
//!
//! The controller owns the lifecycle phase and drives it through
//! `Starting -> Running -> ShuttingDown -> Exited`:
//!
//! - **Start**: connect the database, then bind and serve HTTP. No listener is
//!   ever started without a live connection.
//! - **Shutdown**: on the first [`ShutdownTrigger`], stop accepting connections
//!   and wait for the listener to close, disconnect the database, flush output,
//!   and wait a short grace period. Later triggers are recorded and ignored.
//!
//! Each step is recorded in a journal of [`LifecycleEvent`]s.

use std::{
    io::{self, Write},
    net::SocketAddr,
    process::ExitCode,
    sync::Arc,
    time::Duration,
};

use axum::Router;
use database::{ConnectionManager, DatabaseDriver};
use tokio::{net::TcpListener, sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    error::{ServerError, ServerResult},
    shutdown::{ShutdownHandle, ShutdownTrigger},
};

const DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_FORCE_SHUTDOWN_TIMEOUT_SECONDS: u64 = 5;
const DEFAULT_EXIT_GRACE_MILLIS: u64 = 50;

/// Configuration for server shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Maximum time to wait for the HTTP listener to close
    pub graceful_timeout: Duration,
    /// Maximum time to wait for the database to disconnect
    pub force_timeout: Duration,
    /// Pause after flushing output, before the process exits
    pub exit_grace: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            graceful_timeout: Duration::from_secs(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS),
            force_timeout: Duration::from_secs(DEFAULT_FORCE_SHUTDOWN_TIMEOUT_SECONDS),
            exit_grace: Duration::from_millis(DEFAULT_EXIT_GRACE_MILLIS),
        }
    }
}

/// Lifecycle phase of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Connecting to the database and binding the listener
    Starting,
    /// Serving requests
    Running,
    /// Releasing resources
    ShuttingDown,
    /// Done; the process may exit
    Exited,
}

/// Process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Graceful shutdown succeeded (exit code 0)
    Success,
    /// Startup or shutdown failed (exit code 1)
    Failure,
}

impl ExitStatus {
    /// Numeric process exit code
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Journal entry describing one lifecycle step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The database connection is live
    DatabaseConnected,
    /// The HTTP listener is accepting connections
    ListenerStarted {
        /// Bound address
        address: SocketAddr,
    },
    /// Startup failed; the process will exit without serving
    StartupFailed {
        /// Error message
        message: String,
    },
    /// The shutdown sequence began
    ShutdownStarted {
        /// Trigger that won
        trigger: ShutdownTrigger,
    },
    /// A trigger arrived after shutdown had already begun
    TriggerIgnored {
        /// Trigger that lost
        trigger: ShutdownTrigger,
    },
    /// The HTTP listener stopped and all connections finished
    ListenerClosed,
    /// The database connection was released
    DatabaseDisconnected,
    /// A shutdown step failed
    ShutdownFailed {
        /// Error message
        message: String,
    },
    /// The lifecycle finished
    Exited {
        /// Final exit status
        status: ExitStatus,
    },
}

#[derive(Debug)]
struct Listener {
    address: SocketAddr,
    token: CancellationToken,
    task: JoinHandle<io::Result<()>>,
}

impl Listener {
    fn spawn(
        listener: TcpListener,
        address: SocketAddr,
        router: Router,
        handle: ShutdownHandle,
    ) -> Self {
        let token = CancellationToken::new();
        let shutdown = token.clone();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = &result {
                handle.report_failure(format!("HTTP server failed: {e}"));
            }
            result
        });

        Self {
            address,
            token,
            task,
        }
    }

    /// Stop accepting connections and wait for in-flight requests
    async fn close(mut self, timeout: Duration) -> ServerResult<()> {
        self.token.cancel();
        match tokio::time::timeout(timeout, &mut self.task).await {
            Err(_) => {
                self.task.abort();
                Err(ServerError::Timeout {
                    operation: "HTTP server close",
                    timeout_seconds: timeout.as_secs(),
                })
            }
            Ok(Err(source)) => Err(ServerError::TaskJoin { source }),
            Ok(Ok(Err(source))) => Err(ServerError::Shutdown { source }),
            Ok(Ok(Ok(()))) => Ok(()),
        }
    }
}

/// Owner of the process lifecycle
#[derive(Debug)]
pub struct LifecycleController<D> {
    phase: LifecyclePhase,
    database: Arc<ConnectionManager<D>>,
    shutdown_config: ShutdownConfig,
    handle: ShutdownHandle,
    triggers: mpsc::UnboundedReceiver<ShutdownTrigger>,
    listener: Option<Listener>,
    exit_status: Option<ExitStatus>,
    journal: Vec<LifecycleEvent>,
}

impl<D: DatabaseDriver> LifecycleController<D> {
    /// Create a controller in the `Starting` phase
    pub fn new(database: Arc<ConnectionManager<D>>, shutdown_config: ShutdownConfig) -> Self {
        let (handle, triggers) = ShutdownHandle::channel();
        Self {
            phase: LifecyclePhase::Starting,
            database,
            shutdown_config,
            handle,
            triggers,
            listener: None,
            exit_status: None,
            journal: Vec::new(),
        }
    }

    /// Current phase
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Steps taken so far, in order
    pub fn journal(&self) -> &[LifecycleEvent] {
        &self.journal
    }

    /// Handle for sending shutdown triggers to this controller
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }

    /// Address the HTTP listener is bound to while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().map(|listener| listener.address)
    }

    /// The managed database connection
    pub fn database(&self) -> &Arc<ConnectionManager<D>> {
        &self.database
    }

    fn transition(&mut self, phase: LifecyclePhase) {
        info!(from = ?self.phase, to = ?phase, "lifecycle state transition");
        self.phase = phase;
    }

    fn record(&mut self, event: LifecycleEvent) {
        self.journal.push(event);
    }

    /// Connect the database, then bind and serve `router` on `addr`
    ///
    /// On failure the controller moves straight to `Exited` without ever
    /// serving; an already opened connection is released first.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Database` if the connection cannot be opened,
    /// `ServerError::Bind` if the address is unavailable.
    pub async fn start(&mut self, router: Router, addr: SocketAddr) -> ServerResult<SocketAddr> {
        match self.try_start(router, addr).await {
            Ok(address) => Ok(address),
            Err(e) => {
                self.abort_startup(&e).await;
                Err(e)
            }
        }
    }

    async fn try_start(&mut self, router: Router, addr: SocketAddr) -> ServerResult<SocketAddr> {
        self.database.connect().await?;
        self.record(LifecycleEvent::DatabaseConnected);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                address: addr,
                source,
            })?;
        let address = listener
            .local_addr()
            .map_err(|source| ServerError::Startup { source })?;

        self.listener = Some(Listener::spawn(
            listener,
            address,
            router,
            self.handle.clone(),
        ));
        self.record(LifecycleEvent::ListenerStarted { address });
        self.transition(LifecyclePhase::Running);
        info!(%address, "server is running");
        Ok(address)
    }

    async fn abort_startup(&mut self, error: &ServerError) {
        error!(error = %error, "failed to start server");
        self.record(LifecycleEvent::StartupFailed {
            message: error.to_string(),
        });

        if self.database.is_connected()
            && let Err(e) = self.database.disconnect().await
        {
            warn!(error = %e, "failed to release database after startup failure");
        }

        self.exit_status = Some(ExitStatus::Failure);
        self.transition(LifecyclePhase::Exited);
        self.record(LifecycleEvent::Exited {
            status: ExitStatus::Failure,
        });
    }

    /// Wait for the first shutdown trigger and run the shutdown sequence
    pub async fn run(&mut self) -> ExitStatus {
        if let Some(status) = self.exit_status {
            return status;
        }

        let trigger = self
            .triggers
            .recv()
            .await
            .unwrap_or(ShutdownTrigger::Requested);
        self.shutdown(trigger).await
    }

    /// Run the shutdown sequence for `trigger`, at most once
    ///
    /// A trigger that arrives once shutdown has begun is recorded and ignored;
    /// the status of the first shutdown is returned.
    pub async fn shutdown(&mut self, trigger: ShutdownTrigger) -> ExitStatus {
        if let Some(status) = self.exit_status {
            self.ignore(trigger);
            return status;
        }

        warn!(%trigger, "received {trigger}, shutting down");
        self.transition(LifecyclePhase::ShuttingDown);
        self.record(LifecycleEvent::ShutdownStarted { trigger });

        let status = match self.release_resources().await {
            Ok(()) => {
                info!("graceful shutdown complete");
                ExitStatus::Success
            }
            Err(e) => {
                error!(error = %e, "error during shutdown");
                self.record(LifecycleEvent::ShutdownFailed {
                    message: e.to_string(),
                });
                ExitStatus::Failure
            }
        };
        self.exit_status = Some(status);

        flush_output(self.shutdown_config.exit_grace).await;

        while let Ok(late) = self.triggers.try_recv() {
            self.ignore(late);
        }
        self.transition(LifecyclePhase::Exited);
        self.record(LifecycleEvent::Exited { status });
        status
    }

    fn ignore(&mut self, trigger: ShutdownTrigger) {
        info!(%trigger, "shutdown already in progress, ignoring {trigger}");
        self.record(LifecycleEvent::TriggerIgnored { trigger });
    }

    /// Close the listener, then disconnect the database
    ///
    /// The disconnect is attempted even if closing the listener failed; the
    /// first error is returned.
    async fn release_resources(&mut self) -> ServerResult<()> {
        let mut outcome = Ok(());

        if let Some(listener) = self.listener.take() {
            match listener.close(self.shutdown_config.graceful_timeout).await {
                Ok(()) => {
                    info!("HTTP server closed");
                    self.record(LifecycleEvent::ListenerClosed);
                }
                Err(e) => {
                    error!(error = %e, "failed to close HTTP server");
                    outcome = Err(e);
                }
            }
        }

        let force_timeout = self.shutdown_config.force_timeout;
        let disconnected = match tokio::time::timeout(force_timeout, self.database.disconnect())
            .await
        {
            Ok(result) => result.map_err(ServerError::from),
            Err(_) => Err(ServerError::Timeout {
                operation: "database disconnect",
                timeout_seconds: force_timeout.as_secs(),
            }),
        };

        match disconnected {
            Ok(()) => self.record(LifecycleEvent::DatabaseDisconnected),
            Err(e) => {
                error!(error = %e, "error during database disconnect");
                if outcome.is_ok() {
                    outcome = Err(e);
                }
            }
        }

        outcome
    }
}

async fn flush_output(grace: Duration) {
    if let Err(e) = io::stdout().flush() {
        warn!(error = %e, "failed to flush stdout");
    }
    if let Err(e) = io::stderr().flush() {
        warn!(error = %e, "failed to flush stderr");
    }
    tokio::time::sleep(grace).await;
}

/// Log the final exit status; called on every exit path
pub fn log_exit(status: ExitStatus) {
    info!(code = status.code(), "process exiting with code {}", status.code());
}
