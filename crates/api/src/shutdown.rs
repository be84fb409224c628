// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shutdown triggers
//!
//! OS signals, uncaught panics and failed background tasks never act on their
//! own: they send a [`ShutdownTrigger`] through a [`ShutdownHandle`] to the
//! lifecycle controller, which runs the shutdown sequence for the first one and
//! ignores the rest.

use std::{
    fmt,
    panic::{self, PanicHookInfo},
};

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{error, warn};

use crate::error::{ServerError, ServerResult};

/// Reason the process is shutting down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// `SIGTERM` was received
    Sigterm,
    /// `SIGINT` (Ctrl+C) was received
    Sigint,
    /// A thread or task panicked
    Panic {
        /// Panic payload and location
        message: String,
    },
    /// A background task failed with an error nobody handled
    TaskFailure {
        /// Error message of the failed task
        message: String,
    },
    /// Shutdown was requested programmatically
    Requested,
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sigterm => write!(f, "SIGTERM"),
            Self::Sigint => write!(f, "SIGINT"),
            Self::Panic { .. } => write!(f, "uncaught panic"),
            Self::TaskFailure { .. } => write!(f, "unhandled task failure"),
            Self::Requested => write!(f, "shutdown request"),
        }
    }
}

/// Sending side of the shutdown trigger channel
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: mpsc::UnboundedSender<ShutdownTrigger>,
}

impl ShutdownHandle {
    /// Create a handle and the receiver the lifecycle controller listens on
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ShutdownTrigger>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Send a trigger; returns false once the controller is gone
    pub fn trigger(&self, trigger: ShutdownTrigger) -> bool {
        self.sender.send(trigger).is_ok()
    }

    /// Report a background task failure as a shutdown trigger
    pub fn report_failure(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        error!(error = %message, "unhandled task failure");
        self.trigger(ShutdownTrigger::TaskFailure { message })
    }

    /// Request a graceful shutdown
    pub fn request(&self) -> bool {
        self.trigger(ShutdownTrigger::Requested)
    }
}

/// Forward `SIGTERM` and `SIGINT` to the controller
///
/// Every signal is forwarded, including repeated ones; deduplication is the
/// controller's job. The listener task ends when the controller is dropped.
///
/// # Errors
///
/// Returns `ServerError::Signal` if a handler cannot be registered.
pub fn install_signal_handlers(handle: ShutdownHandle) -> ServerResult<JoinHandle<()>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| ServerError::Signal {
            message: format!("failed to register SIGTERM handler: {e}"),
        })?;
        let mut sigint = signal(SignalKind::interrupt()).map_err(|e| ServerError::Signal {
            message: format!("failed to register SIGINT handler: {e}"),
        })?;

        Ok(tokio::spawn(async move {
            loop {
                let trigger = tokio::select! {
                    Some(()) = sigterm.recv() => ShutdownTrigger::Sigterm,
                    Some(()) = sigint.recv() => ShutdownTrigger::Sigint,
                    else => break,
                };
                warn!(signal = %trigger, "received shutdown signal");
                if !handle.trigger(trigger) {
                    break;
                }
            }
        }))
    }

    #[cfg(not(unix))]
    {
        Ok(tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    handle.report_failure(format!("failed to listen for CTRL+C: {e}"));
                    break;
                }
                warn!(signal = "CTRL+C", "received shutdown signal");
                if !handle.trigger(ShutdownTrigger::Sigint) {
                    break;
                }
            }
        }))
    }
}

/// Turn uncaught panics into shutdown triggers
///
/// The previously installed hook still runs afterwards.
pub fn install_panic_hook(handle: ShutdownHandle) {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let message = panic_message(info);
        error!(error = %message, "uncaught panic");
        handle.trigger(ShutdownTrigger::Panic { message });
        previous(info);
    }));
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    let text = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());

    match info.location() {
        Some(location) => format!("{text} at {}:{}", location.file(), location.line()),
        None => text,
    }
}
