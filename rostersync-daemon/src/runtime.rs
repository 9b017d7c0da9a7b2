use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use rostersync_core::Settings;
use rostersync_sync::{DockerChannel, ExecutionChannel, Fingerprint, PassReport, Reconciler};

use crate::error::{io_err, DaemonError};

/// Totals across every pass of one daemon run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub passes: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}

impl LoopSummary {
    fn record(&mut self, report: &PassReport) {
        self.passes += 1;
        self.created += report.created();
        self.updated += report.updated();
        self.failed += report.failures.len();
    }
}

/// Start the daemon against the configured container and block the current
/// thread until ctrl-c or SIGTERM.
pub fn start_blocking(settings: Settings) -> Result<LoopSummary, DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    let channel: Arc<dyn ExecutionChannel> = Arc::new(DockerChannel::from_settings(&settings));

    runtime.block_on(async move {
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(4);
        let signal_handle = {
            let shutdown = shutdown_tx.clone();
            tokio::spawn(async move {
                match wait_for_signal().await {
                    Ok(()) => tracing::info!("received shutdown signal, stopping"),
                    Err(err) => tracing::error!("signal handler failed: {err}"),
                }
                let _ = shutdown.send(());
            })
        };
        let result = run(settings, channel, shutdown_rx).await;
        signal_handle.abort();
        result
    })
}

/// Run the reconciliation loop until `shutdown` fires.
///
/// Fails only when the roster file is missing at startup. The first poll
/// always runs a full pass; later polls run one only when the roster content
/// changed.
pub async fn run(
    settings: Settings,
    channel: Arc<dyn ExecutionChannel>,
    shutdown: broadcast::Receiver<()>,
) -> Result<LoopSummary, DaemonError> {
    let roster_path = settings.roster_path.clone();
    tracing::info!("rostersync starting");
    tracing::info!("watching: {}", roster_path.display());
    tracing::info!("container: {}", settings.container);
    tracing::info!("poll interval: {}s", settings.poll_interval_secs);

    if !roster_path.exists() {
        tracing::error!("roster not found at {}; aborting", roster_path.display());
        return Err(DaemonError::RosterMissing { path: roster_path });
    }

    let reconciler = Arc::new(Reconciler::from_settings(&settings, channel)?);
    watch(reconciler, roster_path, settings.poll_interval(), shutdown).await
}

async fn watch(
    reconciler: Arc<Reconciler>,
    roster_path: PathBuf,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<LoopSummary, DaemonError> {
    let stop = Arc::new(AtomicBool::new(false));
    let mut last: Option<Fingerprint> = None;
    let mut summary = LoopSummary::default();

    loop {
        let mut task = {
            let reconciler = reconciler.clone();
            let path = roster_path.clone();
            let stop = stop.clone();
            let last = last.clone();
            tokio::task::spawn_blocking(move || reconciler.poll(&path, last, &stop))
        };

        let mut stopping = false;
        let joined = tokio::select! {
            joined = &mut task => joined,
            _ = shutdown.recv() => {
                tracing::info!("shutdown requested; finishing current agent");
                stop.store(true, Ordering::SeqCst);
                stopping = true;
                task.await
            }
        };
        let poll = joined.map_err(|err| DaemonError::Task {
            task: "sync",
            detail: err.to_string(),
        })?;

        last = poll.fingerprint;
        if let Some(report) = &poll.report {
            summary.record(report);
        }
        if stopping {
            break;
        }

        tokio::select! {
            _ = shutdown.recv() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::info!(
        "stopped after {} passes ({} created, {} updated, {} failed)",
        summary.passes,
        summary.created,
        summary.updated,
        summary.failed
    );
    Ok(summary)
}

async fn wait_for_signal() -> Result<(), DaemonError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = signal(SignalKind::terminate()).map_err(|e| io_err("SIGTERM handler", e))?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map_err(|e| io_err("ctrl-c handler", e)),
            _ = term.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| io_err("ctrl-c handler", e))
    }
}

/// Install the global subscriber, writing to stderr. `RUST_LOG` overrides the
/// default `info` filter; `log` records from the library crates are bridged
/// automatically.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
