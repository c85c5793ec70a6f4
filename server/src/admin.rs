//! The line-oriented admin console (spec §4.5).
//!
//! Runs on its own OS thread because it blocks on standard input; every
//! effect is submitted to the reactor through [`AdminCommand`] rather than
//! touched directly, per spec §5's "call from main loop" requirement — in
//! particular `quit` must never shut the reactor down from this thread.

use std::io::{self, BufRead, Write};

use tokio::sync::{mpsc, oneshot};

/// A command submitted by the console thread for the reactor to execute.
pub enum AdminCommand {
    ListAllGames { respond_to: oneshot::Sender<String> },
    ListAvatars { respond_to: oneshot::Sender<String> },
    ShowLeaderboardMatrix { respond_to: oneshot::Sender<String> },
    Quit,
}

/// Spawns the console thread. Returns its join handle so `main` can wait on
/// a clean `quit` before exiting.
pub fn spawn(commands: mpsc::UnboundedSender<AdminCommand>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || run(commands))
}

fn run(commands: mpsc::UnboundedSender<AdminCommand>) {
    let stdin = io::stdin();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // stdin closed
            Ok(_) => {}
            Err(_) => break,
        }

        let command = line.trim().to_lowercase();
        match command.as_str() {
            "" => continue,
            "quit" => {
                let _ = commands.send(AdminCommand::Quit);
                break;
            }
            "list_all_games" => dispatch(&commands, |respond_to| AdminCommand::ListAllGames { respond_to }),
            "list_avatars" => dispatch(&commands, |respond_to| AdminCommand::ListAvatars { respond_to }),
            "show_leaderboard_matrix" => dispatch(&commands, |respond_to| AdminCommand::ShowLeaderboardMatrix { respond_to }),
            other => println!("unknown command: {other}"),
        }
    }
}

fn dispatch(commands: &mpsc::UnboundedSender<AdminCommand>, build: impl FnOnce(oneshot::Sender<String>) -> AdminCommand) {
    let (respond_to, receiver) = oneshot::channel();
    if commands.send(build(respond_to)).is_err() {
        println!("server is shutting down");
        return;
    }
    match receiver.blocking_recv() {
        Ok(output) => println!("{output}"),
        Err(_) => println!("server is shutting down"),
    }
}
