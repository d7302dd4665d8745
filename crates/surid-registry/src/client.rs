//! Registry client: connect with a bounded retry budget, mirror assignments
//! as a forward and a reverse mapping, and degrade to no-ops instead of
//! surfacing failures.

use std::fmt;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::resp::Reply;
use crate::transport::{RegistryTransport, TcpTransport};

/// Connection attempts before giving up and leaving mirroring disabled.
pub const CONNECT_ATTEMPTS: u32 = 10;
/// Fixed backoff between connection attempts.
pub const CONNECT_BACKOFF: Duration = Duration::from_secs(1);
/// Key prefix of the reverse (`id → app`) mapping.
pub const REVERSE_KEY_PREFIX: &str = "SURID-";

fn reverse_key(surface_id: u32) -> String {
    format!("{REVERSE_KEY_PREFIX}{surface_id}")
}

// ─── Endpoint ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ─── Registry Seam ────────────────────────────────────────────────

/// Engine-facing registry operations.
///
/// Infallible by signature: every failure mode below this seam is logged and
/// swallowed, never escalated into an assignment decision.
pub trait SurfaceRegistry {
    fn register(&mut self, app_id: Option<&str>, surface_id: u32);
    fn unregister(&mut self, surface_id: u32);
}

// ─── Client ───────────────────────────────────────────────────────

/// Connection state: `endpoint` absent means the integration is disabled by
/// configuration; `conn` absent means unreachable or given up.
pub struct RegistryClient<T> {
    endpoint: Option<Endpoint>,
    conn: Option<T>,
}

impl RegistryClient<TcpTransport> {
    /// Connect per configuration. An absent endpoint is a deliberate no-op,
    /// logged as integration disabled, not an error. Otherwise attempts are
    /// retried with the fixed budget and backoff; exhausting the budget
    /// leaves the client disabled rather than failing the caller.
    ///
    /// Blocks for up to `CONNECT_ATTEMPTS x CONNECT_BACKOFF` during startup.
    pub fn connect(endpoint: Option<Endpoint>) -> Self {
        let Some(endpoint) = endpoint else {
            tracing::info!("registry integration disabled");
            return Self {
                endpoint: None,
                conn: None,
            };
        };
        let conn = connect_with_retry(
            || TcpTransport::connect(&endpoint.host, endpoint.port),
            CONNECT_ATTEMPTS,
            CONNECT_BACKOFF,
            &endpoint,
        );
        Self {
            endpoint: Some(endpoint),
            conn,
        }
    }

    /// Re-run the bounded connect against the configured endpoint.
    /// Returns whether the client is connected afterwards.
    pub fn reconnect(&mut self) -> bool {
        if let Some(endpoint) = self.endpoint.clone() {
            self.conn = connect_with_retry(
                || TcpTransport::connect(&endpoint.host, endpoint.port),
                CONNECT_ATTEMPTS,
                CONNECT_BACKOFF,
                &endpoint,
            );
        }
        self.is_connected()
    }
}

impl<T: RegistryTransport> RegistryClient<T> {
    /// A client with no endpoint; every operation is a no-op.
    pub fn disabled() -> Self {
        Self {
            endpoint: None,
            conn: None,
        }
    }

    /// A client over an already-established transport.
    pub fn with_transport(endpoint: Endpoint, transport: T) -> Self {
        Self {
            endpoint: Some(endpoint),
            conn: Some(transport),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    /// Issue one command. A transport failure invalidates the connection;
    /// later operations become no-ops until an explicit reconnect.
    fn command(&mut self, args: &[&str]) -> Option<Reply> {
        let conn = self.conn.as_mut()?;
        match conn.command(args) {
            Ok(Reply::Error(message)) => {
                tracing::warn!(command = args[0], %message, "registry refused command");
                Some(Reply::Error(message))
            }
            Ok(reply) => Some(reply),
            Err(err) => {
                tracing::warn!(command = args[0], %err, "registry command failed, dropping connection");
                self.conn = None;
                None
            }
        }
    }
}

impl<T: RegistryTransport> SurfaceRegistry for RegistryClient<T> {
    fn register(&mut self, app_id: Option<&str>, surface_id: u32) {
        if !self.is_connected() {
            return;
        }
        let Some(app_id) = app_id.filter(|id| !id.is_empty()) else {
            tracing::warn!(surface_id, "refusing to register surface without app id");
            return;
        };
        if surface_id == 0 {
            tracing::warn!(app_id, "refusing to register invalid surface id 0");
            return;
        }

        // Forward and reverse mappings, both best effort.
        let id_value = surface_id.to_string();
        self.command(&["SET", app_id, &id_value]);
        self.command(&["SET", &reverse_key(surface_id), app_id]);
        tracing::info!(app_id, surface_id, "registered surface");
    }

    fn unregister(&mut self, surface_id: u32) {
        if !self.is_connected() || surface_id == 0 {
            return;
        }

        let key = reverse_key(surface_id);
        let app_id = self
            .command(&["GET", &key])
            .and_then(|reply| reply.as_bulk().map(str::to_string));

        self.command(&["DEL", &key]);

        // The forward mapping can only be cleaned up when the reverse lookup
        // produced an app id; without it the reverse-key deletion above is
        // all that can be done, which keeps the operation idempotent.
        if let Some(app_id) = app_id {
            self.command(&["DEL", &app_id]);
            tracing::info!(app_id, surface_id, "unregistered surface");
        }
    }
}

/// Dial until a connection succeeds or the attempt budget is exhausted,
/// sleeping `backoff` between attempts.
pub fn connect_with_retry<T>(
    mut dial: impl FnMut() -> Result<T, RegistryError>,
    attempts: u32,
    backoff: Duration,
    endpoint: &Endpoint,
) -> Option<T> {
    tracing::info!(%endpoint, "connecting to registry");
    for attempt in 1..=attempts {
        match dial() {
            Ok(conn) => {
                tracing::info!(%endpoint, "connected to registry");
                return Some(conn);
            }
            Err(err) => {
                tracing::warn!(%endpoint, attempt, %err, "registry connection attempt failed");
                if attempt < attempts {
                    thread::sleep(backoff);
                }
            }
        }
    }
    tracing::warn!(%endpoint, "giving up on registry, mirroring disabled");
    None
}
