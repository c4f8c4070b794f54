use clap::Parser;
use client::input::{self, InputManager};
use client::network::{Client, ClientConfig};
use client::rendering::CrosstermBackend;
use client::shutdown::{Shutdown, ShutdownReason};
use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::info;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:9000")]
    server: String,

    /// How long a struck fighter flashes yellow, in milliseconds
    #[arg(long, default_value = "100")]
    hit_flash_ms: u64,

    /// Write log output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Raw mode and alternate screen for the lifetime of the guard.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), cursor::Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

fn init_logging(log_file: Option<&PathBuf>) -> io::Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(path) = log_file {
        builder.target(env_logger::Target::Pipe(Box::new(File::create(path)?)));
    }
    builder.init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    info!("Starting client...");
    info!("Connecting to: {}", args.server);

    let config = ClientConfig {
        server: args.server,
        hit_flash: Duration::from_millis(args.hit_flash_ms),
    };
    let client = Client::connect(config).await?;

    let guard = TerminalGuard::enter()?;
    let shutdown = Shutdown::new();
    let (key_tx, key_rx) = mpsc::unbounded_channel();
    let input = InputManager::spawn(key_tx, shutdown.clone(), Duration::from_millis(50))?;

    let result = client
        .run(CrosstermBackend::stdout(), key_rx, shutdown.clone())
        .await;
    shutdown.trigger(ShutdownReason::Quit);
    input.join();

    if let Ok((reason, _)) = &result {
        if reason.is_game_over() {
            input::wait_for_any_key()?;
        }
    }

    drop(guard);
    let (reason, _) = result?;
    info!("Client exited: {}", reason);

    Ok(())
}
