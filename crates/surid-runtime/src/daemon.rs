//! Daemon wiring: configuration → engine → UDS event server, with
//! signal-driven teardown.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};

use surid_engine::IdAgent;
use surid_host::SurfaceTable;
use surid_registry::{RegistryClient, TcpTransport};

use crate::cli::DaemonOpts;
use crate::config::Config;
use crate::server;

/// Shared daemon state protected by a mutex.
///
/// The mutex is what serializes event processing: rule bindings, the
/// allocator cursor, and the surface table are only ever touched with it
/// held, so each event runs to completion before the next one starts.
pub struct DaemonState {
    pub table: SurfaceTable,
    pub agent: IdAgent<RegistryClient<TcpTransport>>,
    pub started_at: DateTime<Utc>,
    stopped: bool,
}

impl DaemonState {
    pub fn new(agent: IdAgent<RegistryClient<TcpTransport>>, started_at: DateTime<Utc>) -> Self {
        Self {
            table: SurfaceTable::new(),
            agent,
            started_at,
            stopped: false,
        }
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }

    /// Tear down engine state. Callable from the shutdown event and from the
    /// signal path; acts exactly once.
    pub fn shutdown_once(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.agent.shutdown();
        }
    }
}

/// Run the daemon: load config, connect the registry, serve events until a
/// shutdown event or signal arrives.
///
/// A configuration error here fails activation — the process exits non-zero
/// without ever serving a surface event.
pub async fn run_daemon(opts: DaemonOpts, socket_path: &str) -> anyhow::Result<()> {
    let config = Config::load(&opts.config)?;
    let (rules, range, endpoint) = config.into_parts()?;
    tracing::info!(
        rules = rules.len(),
        default_range = range.is_some(),
        registry = endpoint.is_some(),
        "configuration loaded"
    );

    // Bounded synchronous connect (worst case ~10 s). This blocks startup,
    // which is fine: no surface events are being served yet.
    let registry = tokio::task::spawn_blocking(move || RegistryClient::connect(endpoint)).await?;

    let state = Arc::new(Mutex::new(DaemonState::new(
        IdAgent::new(rules, range, registry),
        Utc::now(),
    )));
    let shutdown = Arc::new(Notify::new());

    let server_state = Arc::clone(&state);
    let server_shutdown = Arc::clone(&shutdown);
    let server_socket = socket_path.to_string();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::run_server(&server_socket, server_state, server_shutdown).await {
            tracing::error!("UDS server error: {e}");
        }
    });

    // Wait for a host shutdown event, ctrl-c, or SIGTERM.
    let signals = async {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            tracing::info!("received ctrl-c, shutting down");
        }
    };

    tokio::select! {
        () = signals => {}
        () = shutdown.notified() => tracing::info!("host shutdown event received"),
        _ = server_handle => tracing::warn!("server exited unexpectedly"),
    }

    state.lock().await.shutdown_once();
    let _ = std::fs::remove_file(socket_path);
    tracing::info!("daemon stopped");
    Ok(())
}
