mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{capture, init, CaptureArgs, InitArgs};
use tracing_subscriber::EnvFilter;

/// Domshot CLI - turn recorded page selections into standalone SVG images
#[derive(Parser, Debug)]
#[command(name = "domshot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log pipeline stages (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a domshot.config.json and an example snapshot
    Init(InitArgs),

    /// Capture page snapshots to SVG
    Capture(CaptureArgs),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Capture(args) => capture(args, &cwd).await,
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
