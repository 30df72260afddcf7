//! OS signal handling.

use std::io;
use std::sync::Arc;

use crate::lifecycle::shutdown::Shutdown;

/// Trigger `shutdown` on the first Ctrl-C.
///
/// If the handler cannot be installed the shutdown fires straight away, so
/// nothing waits on a signal that never comes.
pub async fn shutdown_on_ctrl_c(shutdown: Arc<Shutdown>) {
    on_interrupt(tokio::signal::ctrl_c().await, &shutdown);
}

fn on_interrupt(result: io::Result<()>, shutdown: &Shutdown) {
    match result {
        Ok(()) => tracing::info!("Interrupt received, shutting down"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for interrupt, shutting down"),
    }
    shutdown.trigger();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_triggers_shutdown() {
        let shutdown = Shutdown::new();
        on_interrupt(Ok(()), &shutdown);
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn test_listener_failure_triggers_shutdown() {
        let shutdown = Shutdown::new();
        let signal = shutdown.subscribe();

        on_interrupt(Err(io::Error::other("no signal driver")), &shutdown);

        assert!(shutdown.is_triggered());
        assert!(signal.is_triggered());
    }
}
