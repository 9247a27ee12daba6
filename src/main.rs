mod app;
mod cli;
mod reader;
mod resolver;
mod sheet;
mod xml;

use std::time::Duration;

use app::ReaderConfig;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (name, result) = match cli.command {
        Command::Read { source, output } => ("read", app::read(&ReaderConfig::from(&source), output)),
        Command::Dump { source } => ("dump", app::dump(&ReaderConfig::from(&source))),
        Command::Formats { source } => ("formats", app::formats(&ReaderConfig::from(&source))),
        Command::Watch {
            source,
            interval_ms,
            output,
        } => {
            let interval = Duration::from_millis(interval_ms.max(1));
            let config = ReaderConfig::from(&source);
            ("watch", app::watch(&config, interval, output).await)
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!(command = name, error = %e, "command failed");
            eprintln!("sheetclip {name}: {e}");
            std::process::exit(1);
        }
    }
}
