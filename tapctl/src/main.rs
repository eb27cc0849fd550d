//! tapctl: inspect and watch system event taps.

mod render;
#[cfg(target_os = "macos")]
mod watch;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Inspect and watch system event taps")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Number of taps installed system-wide
    Count,
    /// Every tap installed system-wide
    List {
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Install a passive tap and print the events it sees
    Watch {
        /// Tap profile (YAML or JSON). Defaults to a session tap on every category
        #[arg(long)]
        profile: Option<PathBuf>,
        /// Stop after this many seconds instead of running until interrupted
        #[arg(long)]
        seconds: Option<u64>,
    },
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tapctl=info,eventtap_core=info,eventtap_platform=info".into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    run(cli.command)
}

#[cfg(target_os = "macos")]
fn run(command: Command) -> Result<()> {
    use eventtap_core::TapManager;
    use eventtap_platform::MacBackend;

    let manager = TapManager::new(MacBackend::new());
    match command {
        Command::Count => println!("{}", manager.enumerator().count()?),
        Command::List { json } => {
            let taps = manager.enumerator().list()?;
            if json {
                println!("{}", render::taps_json(&taps)?);
            } else {
                print!("{}", render::tap_table(&taps));
            }
        }
        Command::Watch { profile, seconds } => {
            watch::run(&manager, profile.as_deref(), seconds)?;
        }
    }
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn run(command: Command) -> Result<()> {
    let name = match command {
        Command::Count => "count",
        Command::List { .. } => "list",
        Command::Watch { .. } => "watch",
    };
    Err(anyhow::Error::new(eventtap_platform::PlatformError::Unsupported)
        .context(format!("tapctl {name}")))
}
