//! # Termination signals.
//!
//! [`wait_for_shutdown_signal`] resolves with the [`Signal`] that asked the
//! process to stop. [`Orchestrator::run`](crate::Orchestrator::run) races it
//! against streaming and records it as the shutdown reason.
//!
//! | Platform | Listens for                                  |
//! |----------|----------------------------------------------|
//! | Unix     | `SIGINT`, `SIGTERM`, `SIGQUIT`, Ctrl-C        |
//! | other    | Ctrl-C                                       |

use std::fmt;

/// Which termination request arrived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// Ctrl-C or `SIGINT`.
    Interrupt,
    /// `SIGTERM` (kill, container runtime stop).
    Terminate,
    /// `SIGQUIT`.
    Quit,
}

impl Signal {
    /// Short lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Interrupt => "interrupt",
            Signal::Terminate => "terminate",
            Signal::Quit => "quit",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Waits for a termination signal.
///
/// # Errors
/// Signal handler registration failures.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<Signal> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let got = tokio::select! {
        res = tokio::signal::ctrl_c() => { res?; Signal::Interrupt }
        _ = sigint.recv()  => Signal::Interrupt,
        _ = sigterm.recv() => Signal::Terminate,
        _ = sigquit.recv() => Signal::Quit,
    };
    Ok(got)
}

/// Waits for a termination signal.
///
/// # Errors
/// Signal handler registration failures.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<Signal> {
    tokio::signal::ctrl_c().await?;
    Ok(Signal::Interrupt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_names() {
        assert_eq!(Signal::Interrupt.to_string(), "interrupt");
        assert_eq!(Signal::Terminate.as_str(), "terminate");
        assert_eq!(Signal::Quit.as_str(), "quit");
    }
}
