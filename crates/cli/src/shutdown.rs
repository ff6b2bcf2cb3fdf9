use engine_processing::coordinator::TransferOutcome;
use std::{
    io,
    sync::{Arc, OnceLock},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Signal that interrupted a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
        }
    }
}

/// Turns the first SIGINT or SIGTERM into a cancellation that the transfer
/// observes at its next batch boundary. A second signal exits at once and
/// leaves the batch in flight to the server's rollback.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    cancel_token: CancellationToken,
    received: Arc<OnceLock<Signal>>,
}

impl ShutdownCoordinator {
    pub fn new(cancel_token: CancellationToken) -> Self {
        Self {
            cancel_token,
            received: Arc::new(OnceLock::new()),
        }
    }

    pub fn register_handlers(&self) {
        let coordinator = self.clone();

        tokio::spawn(async move {
            let mut signals = match SignalListener::install() {
                Ok(signals) => signals,
                Err(err) => {
                    error!(%err, "Failed to install signal handlers");
                    return;
                }
            };

            let Some(first) = signals.recv().await else {
                return;
            };
            coordinator.interrupt(first);

            if let Some(second) = signals.recv().await {
                warn!(
                    signal = second.as_str(),
                    "Exiting without waiting for the batch in flight"
                );
                std::process::exit(ExitCode::ShutdownRequested.as_i32());
            }
        });
    }

    /// Records the signal and cancels the transfer. Later calls are ignored.
    pub fn interrupt(&self, signal: Signal) {
        if self.received.set(signal).is_err() {
            return;
        }
        info!(
            signal = signal.as_str(),
            "Stopping at the next batch boundary, signal again to exit at once"
        );
        self.cancel_token.cancel();
    }

    pub fn interrupted_by(&self) -> Option<Signal> {
        self.received.get().copied()
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.interrupted_by().is_some()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}

#[cfg(unix)]
struct SignalListener {
    interrupt: signal::unix::Signal,
    terminate: signal::unix::Signal,
}

#[cfg(unix)]
impl SignalListener {
    fn install() -> io::Result<Self> {
        use signal::unix::SignalKind;

        Ok(Self {
            interrupt: signal::unix::signal(SignalKind::interrupt())?,
            terminate: signal::unix::signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> Option<Signal> {
        tokio::select! {
            Some(()) = self.interrupt.recv() => Some(Signal::Interrupt),
            Some(()) = self.terminate.recv() => Some(Signal::Terminate),
            else => None,
        }
    }
}

#[cfg(not(unix))]
struct SignalListener;

#[cfg(not(unix))]
impl SignalListener {
    fn install() -> io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> Option<Signal> {
        signal::ctrl_c().await.ok().map(|()| Signal::Interrupt)
    }
}

/// Exit codes for the CLI application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    ShutdownRequested = 130, // Standard exit code for SIGINT
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn for_outcome(outcome: &TransferOutcome, shutdown_requested: bool) -> Self {
        if outcome.is_success() {
            ExitCode::Success
        } else if outcome.was_cancelled() || shutdown_requested {
            ExitCode::ShutdownRequested
        } else {
            ExitCode::GeneralError
        }
    }
}
