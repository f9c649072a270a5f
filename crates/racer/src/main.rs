//! racebank-racer - reproduce transfer races against a running server

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use racebank_racer::Target;
use tokio::io::AsyncReadExt;

/// Send the same raw HTTP request over many connections at once
#[derive(Parser)]
#[command(name = "racebank-racer", version, about, long_about = None)]
struct Cli {
    /// Number of concurrent connections
    #[arg(short = 'g', long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
    connections: u32,

    /// File containing the raw request ("-" reads stdin)
    #[arg(short, long, default_value = "-")]
    file: PathBuf,

    /// Target host
    #[arg(short = 'H', long)]
    host: String,

    /// Target port
    #[arg(short, long, default_value_t = 80)]
    port: u16,

    /// Connect over TLS (the server certificate is not verified)
    #[arg(short = 's', long)]
    https: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    racebank_observability::init();
    let cli = Cli::parse();

    let request = read_request(&cli.file).await?;
    let target = if cli.https {
        Target::tls(&cli.host, cli.port)?
    } else {
        Target::plain(&cli.host, cli.port)
    };
    tracing::info!(
        addr = target.addr(),
        tls = cli.https,
        connections = cli.connections,
        bytes = request.len(),
        "starting race"
    );

    let outcome = racebank_racer::race(&target, &request, cli.connections as usize).await?;

    let mut stdout = std::io::stdout().lock();
    for response in &outcome.responses {
        stdout.write_all(response).context("failed to write response")?;
    }
    stdout.flush().context("failed to flush stdout")?;

    tracing::info!(
        responses = outcome.responses.len(),
        read_failures = outcome.read_failures,
        "race finished"
    );
    Ok(())
}

async fn read_request(file: &Path) -> Result<Vec<u8>> {
    let mut request = Vec::new();
    if file.as_os_str() == "-" {
        tokio::io::stdin()
            .read_to_end(&mut request)
            .await
            .context("failed to read request from stdin")?;
    } else {
        request = tokio::fs::read(file)
            .await
            .with_context(|| format!("failed to read request from {}", file.display()))?;
    }
    Ok(request)
}
