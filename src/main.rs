use chrono::{DateTime, Utc};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use slotledger::interfaces::runner::ScriptRunner;
use slotledger::interfaces::script::ScriptReader;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON-lines booking script to replay
    script: PathBuf,

    /// Shared secret for signing and verifying webhook payloads
    #[arg(long, default_value = "test-secret")]
    secret: String,

    /// Clock start for the replay (defaults to now)
    #[arg(long)]
    start_time: Option<DateTime<Utc>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let start = cli.start_time.unwrap_or_else(Utc::now);
    let mut runner = ScriptRunner::new(cli.secret, start);

    let file = File::open(cli.script).into_diagnostic()?;
    for command in ScriptReader::new(file).commands() {
        match command {
            Ok(command) => {
                if let Err(e) = runner.apply(command).await {
                    eprintln!("Error applying command: {e}");
                }
            }
            Err(e) => {
                eprintln!("Error reading command: {e}");
            }
        }
    }

    let stdout = io::stdout();
    runner.report(stdout.lock()).await.into_diagnostic()?;

    Ok(())
}
