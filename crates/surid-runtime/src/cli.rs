//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "surid", about = "surface id assignment agent")]
pub struct Cli {
    /// UDS socket path (default: $XDG_RUNTIME_DIR/surid/surid.sock)
    #[arg(long, short = 's', global = true)]
    pub socket_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the id agent daemon (UDS event server + registry mirroring)
    Daemon(DaemonOpts),
    /// Validate a configuration file and exit
    Check(CheckOpts),
    /// List live surfaces and their assigned ids
    Surfaces(SurfacesOpts),
    /// Show agent status summary
    Status,
    /// Re-run the bounded registry connect on a running daemon
    ReconnectRegistry,
}

#[derive(clap::Args)]
pub struct DaemonOpts {
    /// Path to the agent configuration file
    #[arg(long, short = 'c')]
    pub config: PathBuf,
}

#[derive(clap::Args)]
pub struct CheckOpts {
    /// Path to the agent configuration file
    #[arg(long, short = 'c')]
    pub config: PathBuf,
}

#[derive(clap::Args)]
pub struct SurfacesOpts {
    /// Emit raw JSON instead of the column view
    #[arg(long)]
    pub json: bool,
}

/// Default socket path using $USER for per-user isolation.
pub fn default_socket_path() -> String {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        return format!("{dir}/surid/surid.sock");
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    format!("/tmp/surid-{user}/surid.sock")
}
