//! UDS JSON-RPC client for CLI subcommands.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::cli::SurfacesOpts;

pub(crate) async fn rpc_call(
    socket_path: &str,
    method: &str,
    params: serde_json::Value,
) -> anyhow::Result<serde_json::Value> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot connect to daemon at {socket_path}: {e}"))?;

    let (reader, mut writer) = stream.into_split();

    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });
    let mut req = serde_json::to_string(&request)?;
    req.push('\n');
    writer.write_all(req.as_bytes()).await?;
    writer.shutdown().await?;

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let response: serde_json::Value = serde_json::from_str(line.trim())?;

    if let Some(error) = response.get("error") {
        anyhow::bail!("RPC error: {error}");
    }

    Ok(response["result"].clone())
}

/// `surid surfaces` — live surfaces and their ids.
pub async fn cmd_surfaces(socket_path: &str, opts: &SurfacesOpts) -> anyhow::Result<()> {
    let surfaces = rpc_call(socket_path, "list_surfaces", serde_json::json!({})).await?;
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&surfaces)?);
    } else {
        print!("{}", format_surfaces(&surfaces));
    }
    Ok(())
}

/// `surid status` — agent status summary.
pub async fn cmd_status(socket_path: &str) -> anyhow::Result<()> {
    let status = rpc_call(socket_path, "status", serde_json::json!({})).await?;
    print!("{}", format_status(&status));
    Ok(())
}

/// `surid reconnect-registry` — restore registry mirroring.
pub async fn cmd_reconnect(socket_path: &str) -> anyhow::Result<()> {
    let result = rpc_call(socket_path, "reconnect_registry", serde_json::json!({})).await?;
    if result["connected"].as_bool().unwrap_or(false) {
        println!("registry connected");
    } else {
        println!("registry unreachable (or mirroring disabled)");
    }
    Ok(())
}

/// Pure formatting logic for the surface list, separated for testability.
pub(crate) fn format_surfaces(surfaces: &serde_json::Value) -> String {
    let rows = match surfaces.as_array() {
        Some(rows) => rows,
        None => return String::new(),
    };
    if rows.is_empty() {
        return "no live surfaces\n".to_string();
    }

    let mut out = format!("{:<12} {:>8}  {:<20} {}\n", "SURFACE", "ID", "APP-ID", "TITLE");
    for row in rows {
        let id = row["surface_id"]
            .as_u64()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<12} {:>8}  {:<20} {}\n",
            row["surface"].as_str().unwrap_or("?"),
            id,
            row["app_id"].as_str().unwrap_or("-"),
            row["title"].as_str().unwrap_or("-"),
        ));
    }
    out
}

/// Pure formatting logic for the status summary.
pub(crate) fn format_status(status: &serde_json::Value) -> String {
    let mut out = format!("rules:          {}\n", status["rules"]);

    match &status["default_range"] {
        serde_json::Value::Null => out.push_str("default range:  disabled\n"),
        range => {
            let next = range["next"]
                .as_u64()
                .map(|n| n.to_string())
                .unwrap_or_else(|| "exhausted".to_string());
            out.push_str(&format!(
                "default range:  [{}, {}) next {} ({} remaining)\n",
                range["start"], range["max"], next, range["remaining"]
            ));
        }
    }

    let endpoint = status["registry"]["endpoint"]
        .as_str()
        .unwrap_or("disabled")
        .to_string();
    let connected = if status["registry"]["connected"].as_bool().unwrap_or(false) {
        "connected"
    } else {
        "not connected"
    };
    out.push_str(&format!("registry:       {endpoint} ({connected})\n"));

    out.push_str(&format!(
        "surfaces:       {} live, {} assigned\n",
        status["surfaces"]["total"], status["surfaces"]["assigned"]
    ));
    out.push_str(&format!("started:        {}\n", status["started_at"]));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_surfaces_empty() {
        let out = format_surfaces(&serde_json::json!([]));
        assert_eq!(out, "no live surfaces\n");
    }

    #[test]
    fn format_surfaces_rows() {
        let surfaces = serde_json::json!([
            {"surface": "s-1", "surface_id": 7, "app_id": "nav", "title": "Map"},
            {"surface": "s-2", "surface_id": null, "app_id": null, "title": null},
        ]);
        let out = format_surfaces(&surfaces);
        assert!(out.contains("SURFACE"), "header present");
        assert!(out.contains("s-1"));
        assert!(out.contains("nav"));
        // Unassigned surface renders dashes.
        let unassigned = out.lines().last().expect("row");
        assert!(unassigned.contains("s-2"));
        assert!(unassigned.contains('-'));
    }

    #[test]
    fn format_status_with_range_and_registry() {
        let status = serde_json::json!({
            "rules": 3,
            "default_range": {"start": 100, "max": 200, "next": 104, "remaining": 96, "exhausted": false},
            "registry": {"endpoint": "127.0.0.1:6379", "connected": true},
            "surfaces": {"total": 5, "assigned": 4},
            "started_at": "2026-08-01T09:00:00Z",
        });
        let out = format_status(&status);
        assert!(out.contains("rules:          3"));
        assert!(out.contains("[100, 200) next 104 (96 remaining)"));
        assert!(out.contains("127.0.0.1:6379 (connected)"));
        assert!(out.contains("5 live, 4 assigned"));
    }

    #[test]
    fn format_status_disabled_range_and_exhaustion() {
        let status = serde_json::json!({
            "rules": 0,
            "default_range": null,
            "registry": {"endpoint": null, "connected": false},
            "surfaces": {"total": 0, "assigned": 0},
            "started_at": "2026-08-01T09:00:00Z",
        });
        let out = format_status(&status);
        assert!(out.contains("default range:  disabled"));
        assert!(out.contains("disabled (not connected)"));

        let exhausted = serde_json::json!({
            "rules": 0,
            "default_range": {"start": 10, "max": 12, "next": null, "remaining": 0, "exhausted": true},
            "registry": {"endpoint": null, "connected": false},
            "surfaces": {"total": 2, "assigned": 2},
            "started_at": "2026-08-01T09:00:00Z",
        });
        let out = format_status(&exhausted);
        assert!(out.contains("next exhausted"));
    }
}
