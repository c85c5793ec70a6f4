use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use server::admin::{self, AdminCommand};
use server::auth::PasswordFile;
use server::server_core::ServerCore;
use server::transport::{self, Inbound};

/// Competition server for two-player reinforcement-learning hockey matches.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory for avatars, leaderboard, stats, and replay snapshots.
    #[arg(long, default_value = "/tmp/laser-hockey-rl/server/logs")]
    working_dir: PathBuf,

    /// Disable the interactive admin console (useful under a supervisor / in CI).
    #[arg(long)]
    non_interactive: bool,

    /// TCP port to listen on.
    #[arg(long, default_value_t = server::DEFAULT_PORT)]
    port: u16,

    /// Path to the flat `username:password` credentials file.
    #[arg(long, default_value = "passwords.txt")]
    password_file: PathBuf,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();
    if std::env::var("RUST_LOG").is_err() {
        eprintln!("RUST_LOG is not set; defaulting to the env_logger default filter (errors only)");
    }

    let args = Args::parse();
    std::fs::create_dir_all(&args.working_dir)?;

    let passwords = Arc::new(PasswordFile::load(&args.password_file)?);
    let mut core = ServerCore::new(args.working_dir.clone())?;

    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<Inbound>();
    let (admin_tx, mut admin_rx) = mpsc::unbounded_channel::<AdminCommand>();

    let listener = TcpListener::bind(("0.0.0.0", args.port)).await?;
    info!("listening on port {}", args.port);

    {
        let inbound_tx = inbound_tx.clone();
        let passwords = Arc::clone(&passwords);
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        info!("accepted connection from {addr}");
                        let inbound_tx = inbound_tx.clone();
                        let passwords = Arc::clone(&passwords);
                        tokio::spawn(transport::handle_connection(stream, passwords, inbound_tx));
                    }
                    Err(e) => error!("accept failed: {e}"),
                }
            }
        });
    }

    let console_handle = if args.non_interactive {
        None
    } else {
        Some(admin::spawn(admin_tx))
    };

    let mut maintenance = tokio::time::interval(server::MAINTENANCE_INTERVAL);

    loop {
        tokio::select! {
            Some(message) = inbound_rx.recv() => {
                match message {
                    Inbound::Connect { username, remote, respond_with_id } => {
                        let client_id = core.register_client(username, remote);
                        let _ = respond_with_id.send(client_id);
                    }
                    Inbound::Call { client_id, call } => handle_call(&mut core, &client_id, call),
                    Inbound::Disconnected { client_id } => core.detach_client(&client_id),
                }
            }
            Some(command) = admin_rx.recv() => {
                match command {
                    AdminCommand::ListAllGames { respond_to } => { let _ = respond_to.send(core.list_all_games()); }
                    AdminCommand::ListAvatars { respond_to } => { let _ = respond_to.send(core.list_avatars()); }
                    AdminCommand::ShowLeaderboardMatrix { respond_to } => { let _ = respond_to.send(core.show_leaderboard_matrix()); }
                    AdminCommand::Quit => break,
                }
            }
            _ = maintenance.tick() => {
                core.run_maintenance();
            }
        }
    }

    info!("shutting down, persisting final snapshot");
    core.persist_snapshots();

    if let Some(handle) = console_handle {
        drop(handle); // the console thread is blocked on stdin; detaching it is fine at process exit
    }

    Ok(())
}

fn handle_call(core: &mut ServerCore, client_id: &str, call: wire::Call) {
    match call {
        wire::Call::Authenticate { .. } => {
            // Handled by the transport layer before a Client is ever registered.
        }
        wire::Call::CheckCompatibility { client_version } => {
            if core.check_compatibility(client_id, client_version) == Some(server::client::RemoteOutcome::Dead) {
                core.detach_client(client_id);
            }
        }
        wire::Call::RequestStats => {
            if core.request_stats(client_id) == Some(server::client::RemoteOutcome::Dead) {
                core.detach_client(client_id);
            }
        }
        wire::Call::StartQueuing => core.start_queuing(client_id),
        wire::Call::StopQueuing => core.stop_queuing(client_id),
        wire::Call::ReceiveAction { action } => core.receive_action(client_id, action),
    }
}
