//! Last-byte synchronized request racing.
//!
//! Every connection sends the whole request except its final byte, then waits
//! until all connections have reached that point. The final bytes are released
//! together so the server receives N complete requests at (nearly) the same
//! instant, which maximizes overlap between their handlers.
//!
//! Targets are plain TCP or TLS. TLS targets are not authenticated: any
//! certificate is accepted, so self-signed test servers work.

mod tls;

use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Barrier;
use tokio::task::JoinSet;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

/// Where the race connections go.
#[derive(Clone)]
pub struct Target {
    addr: String,
    tls: Option<(TlsConnector, ServerName<'static>)>,
}

impl Target {
    /// Plain TCP to `host:port`.
    pub fn plain(host: &str, port: u16) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            tls: None,
        }
    }

    /// TLS to `host:port`, with `host` as the server name and no certificate
    /// verification.
    pub fn tls(host: &str, port: u16) -> anyhow::Result<Self> {
        let server_name = ServerName::try_from(host.to_string())
            .with_context(|| format!("invalid TLS server name '{host}'"))?;
        Ok(Self {
            addr: format!("{host}:{port}"),
            tls: Some((tls::unverified_connector()?, server_name)),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect(&self) -> std::io::Result<Box<dyn RaceStream>> {
        let tcp = TcpStream::connect(&self.addr).await?;
        match &self.tls {
            None => Ok(Box::new(tcp)),
            Some((connector, server_name)) => {
                let stream = connector.connect(server_name.clone(), tcp).await?;
                Ok(Box::new(stream))
            }
        }
    }
}

trait RaceStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> RaceStream for T {}

/// Responses collected from one race, in completion order.
#[derive(Debug, Default)]
pub struct RaceOutcome {
    pub responses: Vec<Vec<u8>>,
    /// Connections whose response could not be read.
    pub read_failures: usize,
}

/// Send `request` over `connections` parallel connections to `target`.
///
/// Connection and write failures abort the whole race. A failed read only
/// drops that connection's response. The request should ask the server to
/// close the connection (`Connection: close`), since each response is read
/// until end of stream.
pub async fn race(target: &Target, request: &[u8], connections: usize) -> anyhow::Result<RaceOutcome> {
    if request.is_empty() {
        bail!("request can not be empty");
    }
    if connections == 0 {
        bail!("at least one connection is required");
    }

    let request: Arc<[u8]> = Arc::from(request);
    let barrier = Arc::new(Barrier::new(connections));
    let mut tasks = JoinSet::new();

    for idx in 0..connections {
        let target = target.clone();
        let request = request.clone();
        let barrier = barrier.clone();
        tasks.spawn(async move {
            let (head, last) = request.split_at(request.len() - 1);

            let mut stream = target
                .connect()
                .await
                .with_context(|| format!("connection {idx}: failed to connect to {}", target.addr()))?;
            send(&mut stream, head)
                .await
                .with_context(|| format!("connection {idx}: failed to send request"))?;

            barrier.wait().await;
            send(&mut stream, last)
                .await
                .with_context(|| format!("connection {idx}: failed to send final byte"))?;

            let mut response = Vec::new();
            match stream.read_to_end(&mut response).await {
                Ok(_) => {
                    debug!(connection = idx, bytes = response.len(), "response received");
                    Ok::<_, anyhow::Error>(Some(response))
                }
                Err(e) => {
                    warn!(connection = idx, error = %e, "failed to read response");
                    Ok(None)
                }
            }
        });
    }

    let mut outcome = RaceOutcome::default();
    while let Some(joined) = tasks.join_next().await {
        match joined.context("racer task panicked")? {
            Ok(Some(response)) => outcome.responses.push(response),
            Ok(None) => outcome.read_failures += 1,
            Err(e) => {
                // Remaining tasks may be parked on the barrier forever.
                tasks.abort_all();
                return Err(e);
            }
        }
    }
    Ok(outcome)
}

async fn send(stream: &mut Box<dyn RaceStream>, bytes: &[u8]) -> std::io::Result<()> {
    stream.write_all(bytes).await?;
    // TLS holds written bytes until flushed.
    stream.flush().await
}
