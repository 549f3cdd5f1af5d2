//! Connects to a receiver over TCP and prints every state batch.
//!
//! ```text
//! cargo run --example monitor -- 192.168.1.50:8102 [config.json]
//! ```

use async_trait::async_trait;
use pioneer_avr::{AvrClient, AvrError, Result, SessionConfig, Transport};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing_subscriber::EnvFilter;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Reconnectable TCP transport
struct TcpTransport {
    addr: String,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            stream: None,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn open(&mut self) -> Result<()> {
        tracing::debug!(addr = %self.addr, "connecting");
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| AvrError::Timeout)??;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(addr = %self.addr, error = %e, "failed to set TCP_NODELAY");
        }
        self.stream = Some(stream);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
        }
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(AvrError::NotConnected)?;
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(AvrError::NotConnected)?;
        match tokio::time::timeout(timeout, stream.read(buf)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(AvrError::Timeout),
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pioneer_avr=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| "192.168.1.50:8102".to_string());
    let config = match args.next() {
        Some(path) => SessionConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => SessionConfig::default(),
    };

    let client = AvrClient::spawn(TcpTransport::new(addr), config)?;
    let mut updates = client.subscribe_state();

    let mut provisioning = client.zones().subscribe_provisioning();
    tokio::spawn(async move {
        while let Ok(request) = provisioning.recv().await {
            println!("zone {} has traffic but no consumer", request.zone);
        }
    });

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = updates.recv() => match update {
                Ok(update) => {
                    for reading in update.readings {
                        println!("{:<24} {}", reading.name, reading.value);
                    }
                    println!();
                }
                Err(e) => {
                    eprintln!("updates ended: {}", e);
                    break;
                }
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
