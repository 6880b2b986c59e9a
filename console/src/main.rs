//! # scp-tracker
//!
//! why: give the replication engine a usable surface without a browser
//! relations: drives tracker-net's SessionHandle with tracker-core's keypad and quick actions
//! what: mode selection, stdin command loop, log rendering, event notifications

mod telemetry;

use std::net::SocketAddr;

use chrono::Local;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::error;
use tracker_core::session::{generate_code, is_valid_code};
use tracker_core::{BreachKeypad, LogEntry, QuickAction, Session};
use tracker_net::{NetError, SessionEvent, SessionHandle};

#[derive(Parser)]
#[command(name = "scp-tracker", version, about = "SCP site event tracker")]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Track events locally, no networking.
    Offline,
    /// Host a shared session that clients join with the session code.
    Host {
        /// Session code to host under (generated when omitted).
        #[arg(long)]
        code: Option<String>,
        /// Listening address override; defaults to the address derived
        /// from the code.
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Join a hosted session by its code.
    Client {
        /// Session code shared by the host.
        code: String,
        /// Host address override; defaults to the address derived from
        /// the code.
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() {
    telemetry::init_console();
    let cli = Cli::parse();
    if let Err(e) = run(cli.mode).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(mode: Mode) -> Result<(), NetError> {
    let handle = match mode {
        Mode::Offline => {
            println!(">> OFFLINE MODE: events stay on this terminal");
            SessionHandle::offline()
        }
        Mode::Host { code, bind } => {
            let code = match code {
                Some(code) => normalize_code(code)?,
                None => generate_code(),
            };
            let handle = SessionHandle::host(&Session::host(&code), bind).await?;
            println!(">> HOSTING SESSION {code}");
            if let Some(addr) = handle.local_addr() {
                println!(">> listening on {addr}");
            }
            handle
        }
        Mode::Client { code, addr } => {
            let code = normalize_code(code)?;
            let handle = SessionHandle::client(&Session::client(&code), addr).await?;
            println!(">> CONNECTED TO SESSION {code}");
            handle
        }
    };

    repl(handle).await
}

fn normalize_code(code: String) -> Result<String, NetError> {
    let code = code.to_uppercase();
    if !is_valid_code(&code) {
        return Err(NetError::InvalidSession(
            "session codes are 6 characters from A-Z (minus I/O) and 2-9",
        ));
    }
    Ok(code)
}

/// The interactive command loop. Digits feed the breach keypad; named
/// commands fire quick actions or remove entries.
async fn repl(handle: SessionHandle) -> Result<(), NetError> {
    spawn_event_printer(handle.subscribe());
    spawn_log_renderer(handle.logs());

    let mut keypad = BreachKeypad::new();
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        match line {
            "" => {}
            "quit" | "exit" => break,
            "help" => print_help(),
            "riot" => handle.add(QuickAction::ClassDRiot.entry()).await?,
            "escape" => handle.add(QuickAction::ClassDEscape.entry()).await?,
            "chaos" => handle.add(QuickAction::ChaosInsurgency.entry()).await?,
            "clear" => {
                keypad.clear();
                println!("keypad [{}]", keypad.display());
            }
            "list" => render(&handle.logs().borrow()),
            _ => {
                if let Some(id) = line.strip_prefix("rm ") {
                    handle.remove(id.trim()).await?;
                } else if line.bytes().all(|b| b.is_ascii_digit()) {
                    for b in line.bytes() {
                        if let Some(entry) = keypad.press(b - b'0') {
                            println!("** {}", entry.content);
                            handle.add(entry).await?;
                        }
                    }
                    println!("keypad [{}]", keypad.display());
                } else {
                    println!("unrecognized command: {line} (try 'help')");
                }
            }
        }
    }

    handle.close().await;
    Ok(())
}

fn spawn_event_printer(mut events: broadcast::Receiver<SessionEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Fault(text)) => println!("!! {text}"),
                Ok(SessionEvent::PeerJoined { addr }) => println!("-- peer joined from {addr}"),
                Ok(SessionEvent::PeerLeft { addr }) => println!("-- peer left ({addr})"),
                Ok(SessionEvent::LinkChanged(state)) => println!("-- link is now {state:?}"),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn spawn_log_renderer(mut logs: tokio::sync::watch::Receiver<Vec<LogEntry>>) {
    tokio::spawn(async move {
        while logs.changed().await.is_ok() {
            let snapshot = logs.borrow_and_update().clone();
            render(&snapshot);
        }
    });
}

fn render(entries: &[LogEntry]) {
    println!("---- SITE LOG: {} entries ----", entries.len());
    for entry in entries {
        let time = entry.timestamp.with_timezone(&Local).format("%H:%M:%S");
        println!("[{time}] {:<28} id={}", entry.content, entry.id);
    }
}

fn print_help() {
    println!("commands:");
    println!("  <digits>   feed the breach keypad (3 digits log 'SCP-### BREACH')");
    println!("  riot       log '{}'", QuickAction::ClassDRiot.content());
    println!("  escape     log '{}'", QuickAction::ClassDEscape.content());
    println!("  chaos      log '{}'", QuickAction::ChaosInsurgency.content());
    println!("  rm <id>    remove the entry with that id");
    println!("  clear      reset the keypad buffer");
    println!("  list       print the current log");
    println!("  quit       leave the session");
}
