//! Signal handling for graceful shutdown.
//!
//! Waits for SIGINT (Ctrl+C) or SIGTERM (kill/Kubernetes/Docker) and reports
//! which one fired. Both platforms send SIGTERM first and SIGKILL after a
//! grace period, so the pipeline must finish its forced flush within that
//! window.

use log::info;
use std::fmt;

/// The type of shutdown signal received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT - user interrupt (Ctrl+C)
    Interrupt,
    /// SIGTERM - termination request (kill, Kubernetes, Docker)
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "SIGINT (Ctrl+C)"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Wait for SIGINT or SIGTERM.
#[cfg(unix)]
pub async fn shutdown_signal() -> ShutdownSignal {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("received SIGTERM - initiating graceful shutdown");
            ShutdownSignal::Terminate
        }
        _ = sigint.recv() => {
            info!("received SIGINT - initiating graceful shutdown");
            ShutdownSignal::Interrupt
        }
    }
}

/// Windows-compatible handler (Ctrl+C only).
#[cfg(not(unix))]
pub async fn shutdown_signal() -> ShutdownSignal {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    info!("received Ctrl+C - initiating graceful shutdown");
    ShutdownSignal::Interrupt
}
