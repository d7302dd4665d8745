//! UDS JSON-RPC server: minimal hand-rolled implementation.
//! Connection-per-request, newline-delimited JSON.
//!
//! Surface events arrive as the `surface_event` method with a
//! [`SurfaceEvent`] payload; the remaining methods are the operator
//! introspection surface.

use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::{Mutex, Notify};

use surid_host::SurfaceEvent;

use crate::daemon::DaemonState;

/// Run the UDS JSON-RPC server.
pub async fn run_server(
    socket_path: &str,
    state: Arc<Mutex<DaemonState>>,
    shutdown: Arc<Notify>,
) -> anyhow::Result<()> {
    // Create socket directory with mode 0700
    let socket_dir = std::path::Path::new(socket_path)
        .parent()
        .ok_or_else(|| anyhow::anyhow!("invalid socket path"))?;

    std::fs::create_dir_all(socket_dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(0o700))?;
    }

    // Check for stale socket
    if std::path::Path::new(socket_path).exists() {
        if tokio::net::UnixStream::connect(socket_path).await.is_err() {
            std::fs::remove_file(socket_path)?;
            tracing::info!("removed stale socket at {socket_path}");
        } else {
            anyhow::bail!("another daemon is already running at {socket_path}");
        }
    }

    let listener = UnixListener::bind(socket_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!("UDS server listening on {socket_path}");

    loop {
        let (stream, _) = listener.accept().await?;
        let state = Arc::clone(&state);
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state, shutdown).await {
                tracing::debug!("connection error: {e}");
            }
        });
    }
}

async fn handle_connection(
    stream: tokio::net::UnixStream,
    state: Arc<Mutex<DaemonState>>,
    shutdown: Arc<Notify>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let request: serde_json::Value = serde_json::from_str(line.trim())?;
    let method = request["method"].as_str().unwrap_or("");
    let id = request["id"].clone();

    let mut stop_after_reply = false;
    let result = match method {
        "surface_event" => {
            let event: SurfaceEvent = match serde_json::from_value(request["params"].clone()) {
                Ok(event) => event,
                Err(e) => {
                    return write_error(&mut writer, id, -32602, &format!("invalid params: {e}"))
                        .await;
                }
            };
            let mut st = state.lock().await;
            if st.stopped() {
                return write_error(&mut writer, id, -32000, "daemon is shutting down").await;
            }
            let (result, stop) = apply_event(&mut st, event);
            stop_after_reply = stop;
            result
        }
        "list_surfaces" => {
            let st = state.lock().await;
            build_surface_list(&st)
        }
        "status" => {
            let st = state.lock().await;
            build_status(&st)
        }
        "reconnect_registry" => {
            let mut st = state.lock().await;
            // Bounded blocking reconnect; holding the lock keeps the event
            // stream serialized while the connection is being restored.
            let connected = tokio::task::block_in_place(|| st.agent.registry_mut().reconnect());
            serde_json::json!({ "connected": connected })
        }
        _ => {
            return write_error(&mut writer, id, -32601, "method not found").await;
        }
    };

    let response = serde_json::json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": id,
    });
    let mut resp = serde_json::to_string(&response)?;
    resp.push('\n');
    writer.write_all(resp.as_bytes()).await?;

    // The shutdown event is acknowledged before the daemon goes down.
    if stop_after_reply {
        shutdown.notify_one();
    }

    Ok(())
}

async fn write_error(
    writer: &mut tokio::net::unix::OwnedWriteHalf,
    id: serde_json::Value,
    code: i32,
    message: &str,
) -> anyhow::Result<()> {
    let response = serde_json::json!({
        "jsonrpc": "2.0",
        "error": {"code": code, "message": message},
        "id": id,
    });
    let mut resp = serde_json::to_string(&response)?;
    resp.push('\n');
    writer.write_all(resp.as_bytes()).await?;
    Ok(())
}

/// Apply one host event to the daemon state. Returns the reply payload and
/// whether the daemon should stop after acknowledging.
pub(crate) fn apply_event(state: &mut DaemonState, event: SurfaceEvent) -> (serde_json::Value, bool) {
    match event {
        SurfaceEvent::Configured {
            surface,
            app_id,
            title,
        } => {
            state.table.upsert(surface.clone(), app_id, title, Utc::now());
            let result = match state.agent.surface_configured(&mut state.table, &surface) {
                Ok(outcome) => serde_json::json!({
                    "assigned": true,
                    "surface_id": outcome.surface_id(),
                    "source": source_label(outcome),
                }),
                Err(err) => {
                    tracing::warn!(%surface, %err, "could not assign a surface id");
                    serde_json::json!({ "assigned": false, "reason": err.to_string() })
                }
            };
            (result, false)
        }
        SurfaceEvent::Removed { surface } => {
            state.agent.surface_removed(&state.table, &surface);
            let known = state.table.remove(&surface).is_some();
            (serde_json::json!({ "removed": known }), false)
        }
        SurfaceEvent::Shutdown => {
            state.shutdown_once();
            (serde_json::json!({ "ok": true }), true)
        }
    }
}

fn source_label(outcome: surid_engine::AssignOutcome) -> &'static str {
    match outcome {
        surid_engine::AssignOutcome::AlreadyAssigned { .. } => "existing",
        surid_engine::AssignOutcome::Rule { .. } => "rule",
        surid_engine::AssignOutcome::DefaultRange { .. } => "default",
    }
}

/// Live surfaces as JSON, ordered by handle for stable output.
pub(crate) fn build_surface_list(state: &DaemonState) -> serde_json::Value {
    let mut rows: Vec<_> = state.table.iter().collect();
    rows.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

    let list: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|(handle, record)| {
            serde_json::json!({
                "surface": handle,
                "app_id": record.app_id,
                "title": record.title,
                "surface_id": record.surface_id,
                "configured_at": record.configured_at,
            })
        })
        .collect();
    serde_json::Value::Array(list)
}

/// Agent status summary as JSON.
pub(crate) fn build_status(state: &DaemonState) -> serde_json::Value {
    let assigned = state
        .table
        .iter()
        .filter(|(_, record)| record.surface_id.is_some())
        .count();

    let range = state.agent.range().map(|range| {
        serde_json::json!({
            "start": range.start(),
            "max": range.max(),
            "next": range.peek(),
            "remaining": range.remaining(),
            "exhausted": range.is_exhausted(),
        })
    });

    let registry = state.agent.registry();
    serde_json::json!({
        "rules": state.agent.rules().len(),
        "default_range": range,
        "registry": {
            "endpoint": registry.endpoint().map(|e| e.to_string()),
            "connected": registry.is_connected(),
        },
        "surfaces": { "total": state.table.len(), "assigned": assigned },
        "started_at": state.started_at,
    })
}
