//! surid: surface id assignment agent binary.
//! Single-process daemon embedding the rule engine, the surface table, and
//! the registry client.

use clap::Parser;

mod cli;
mod client;
mod config;
mod daemon;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    match args.command {
        cli::Command::Daemon(opts) => {
            let filter = std::env::var("SURID_LOG")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string());
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                .init();

            tracing::info!("surid daemon starting");

            let socket_path = args.socket_path.unwrap_or_else(cli::default_socket_path);
            daemon::run_daemon(opts, &socket_path).await?;
        }
        cli::Command::Check(opts) => {
            match config::Config::load(&opts.config).and_then(config::Config::into_parts) {
                Ok((rules, range, endpoint)) => {
                    let range = range
                        .map(|r| format!("[{}, {})", r.start(), r.max()))
                        .unwrap_or_else(|| "disabled".to_string());
                    let registry = endpoint
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "disabled".to_string());
                    println!(
                        "configuration ok: {} rules, default range {range}, registry {registry}",
                        rules.len()
                    );
                }
                Err(err) => {
                    eprintln!("configuration error: {err}");
                    std::process::exit(1);
                }
            }
        }
        cli::Command::Surfaces(opts) => {
            let socket_path = args.socket_path.unwrap_or_else(cli::default_socket_path);
            client::cmd_surfaces(&socket_path, &opts).await?;
        }
        cli::Command::Status => {
            let socket_path = args.socket_path.unwrap_or_else(cli::default_socket_path);
            client::cmd_status(&socket_path).await?;
        }
        cli::Command::ReconnectRegistry => {
            let socket_path = args.socket_path.unwrap_or_else(cli::default_socket_path);
            client::cmd_reconnect(&socket_path).await?;
        }
    }

    Ok(())
}
