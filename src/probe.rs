use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;
use tracing::debug;

/// Decides whether one (target, port) pair accepts connections.
///
/// Implementations never fail: anything short of a confirmed open port is `false`.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn is_open(&self, target: &str, port: u16) -> bool;
}

/// Plain TCP connect probe bounded by a timeout.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn is_open(&self, target: &str, port: u16) -> bool {
        // Name resolution runs inside the timeout too.
        match time::timeout(self.timeout, TcpStream::connect((target, port))).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                debug!(target_addr = target, port, error = %e, "connect failed");
                false
            }
            Err(_) => {
                debug!(
                    target_addr = target,
                    port,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "connect timed out"
                );
                false
            }
        }
    }
}
