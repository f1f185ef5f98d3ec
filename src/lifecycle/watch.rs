//! Long-running reconcile loop.
//!
//! Reconciles once at start, then again for every configuration update or
//! explicit rerun request, until shutdown. Runs never overlap: the loop waits
//! for each one to finish before looking at the next event.

use tokio::sync::{broadcast, mpsc};

use crate::config::{ConfigError, ReconcilerConfig};
use crate::reconcile::Reconciler;

/// Event sources driving the loop.
pub struct WatchInputs {
    pub updates: mpsc::UnboundedReceiver<ReconcilerConfig>,
    pub reruns: mpsc::UnboundedReceiver<()>,
    pub shutdown: broadcast::Receiver<()>,
}

/// Run the loop. `build` turns each accepted configuration into a reconciler.
///
/// Only a failure to build the initial reconciler ends the loop with an
/// error; later failures are logged and the previous configuration stays in
/// effect.
pub async fn watch<B>(
    config: ReconcilerConfig,
    build: B,
    mut inputs: WatchInputs,
) -> Result<(), ConfigError>
where
    B: Fn(&ReconcilerConfig) -> Result<Reconciler, ConfigError>,
{
    let mut config = config;
    let mut reconciler = build(&config)?;
    reconcile(&reconciler, &config);

    loop {
        tokio::select! {
            Some(new_config) = inputs.updates.recv() => {
                match build(&new_config) {
                    Ok(rebuilt) => {
                        reconciler = rebuilt;
                        config = new_config;
                        reconcile(&reconciler, &config);
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            "Rejected new configuration; keeping the current one"
                        );
                    }
                }
            }
            Some(()) = inputs.reruns.recv() => {
                tracing::info!("Rerun requested");
                reconcile(&reconciler, &config);
            }
            _ = inputs.shutdown.recv() => {
                tracing::info!("Watch loop received shutdown signal, exiting loop");
                break;
            }
            else => break,
        }
    }
    Ok(())
}

// Failures are already logged by the reconciler; the loop keeps going so the
// next configuration change gets a chance to fix things.
fn reconcile(reconciler: &Reconciler, config: &ReconcilerConfig) {
    let declared = config.declared();
    let _ = tokio::task::block_in_place(|| reconciler.run(&declared));
}
