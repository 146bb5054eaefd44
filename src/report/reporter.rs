//! Report transports
//!
//! Defines a trait abstraction for delivering a rendered payload:
//! - Production: a short-lived TCP connection to a graphite collector
//! - Disabled: no destination configured, nothing is sent
//! - Testing: in-memory recording of every payload

use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Error type for report delivery
#[derive(Debug)]
pub enum ReportError {
    /// Could not open a connection to the collector
    Connect(std::io::Error),
    /// Connection opened but the payload could not be written
    Write(std::io::Error),
    /// Connect or write did not finish in time
    Timeout(&'static str),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Connect(e) => write!(f, "failed to connect to collector: {}", e),
            ReportError::Write(e) => write!(f, "failed to write report: {}", e),
            ReportError::Timeout(stage) => write!(f, "timed out during {}", stage),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Connect(e) | ReportError::Write(e) => Some(e),
            ReportError::Timeout(_) => None,
        }
    }
}

pub type ReportFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ReportError>> + Send + 'a>>;

/// Trait for delivering a report payload to a collector
pub trait Reporter: Send + Sync + 'static {
    /// Deliver one non-empty payload
    fn send<'a>(&'a self, payload: &'a str) -> ReportFuture<'a>;

    /// Human-readable destination, used in logs
    fn destination(&self) -> String;
}

/// Arc wrapper for trait object usage
pub type SharedReporter = Arc<dyn Reporter>;

/// Sends each report over a fresh TCP connection: open, write, close
#[derive(Debug, Clone)]
pub struct GraphiteReporter {
    addr: String,
    connect_timeout: Duration,
    write_timeout: Duration,
}

impl GraphiteReporter {
    pub fn new(addr: impl Into<String>) -> Self {
        GraphiteReporter {
            addr: addr.into(),
            connect_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, write: Duration) -> Self {
        self.connect_timeout = connect;
        self.write_timeout = write;
        self
    }

    async fn deliver(&self, payload: &str) -> Result<(), ReportError> {
        let mut stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| ReportError::Timeout("connect"))?
            .map_err(ReportError::Connect)?;

        tokio::time::timeout(self.write_timeout, async {
            stream.write_all(payload.as_bytes()).await?;
            stream.shutdown().await
        })
        .await
        .map_err(|_| ReportError::Timeout("write"))?
        .map_err(ReportError::Write)
    }
}

impl Reporter for GraphiteReporter {
    fn send<'a>(&'a self, payload: &'a str) -> ReportFuture<'a> {
        Box::pin(self.deliver(payload))
    }

    fn destination(&self) -> String {
        self.addr.clone()
    }
}

/// No-op reporter for environments without a collector
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn send<'a>(&'a self, _payload: &'a str) -> ReportFuture<'a> {
        Box::pin(async { Ok(()) })
    }

    fn destination(&self) -> String {
        "none".to_string()
    }
}

/// Records every payload in memory - for tests
#[derive(Default)]
pub struct RecordingReporter {
    payloads: Mutex<Vec<String>>,
    attempts: AtomicU64,
    failing: AtomicBool,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail with a connection error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Payloads that were delivered successfully
    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().clone()
    }

    /// Number of send calls, successful or not
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Reporter for RecordingReporter {
    fn send<'a>(&'a self, payload: &'a str) -> ReportFuture<'a> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(ReportError::Connect(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "recording reporter set to fail",
                )));
            }
            self.payloads.lock().push(payload.to_string());
            Ok(())
        })
    }

    fn destination(&self) -> String {
        "memory".to_string()
    }
}

/// Create a no-op reporter
pub fn noop_reporter() -> SharedReporter {
    Arc::new(NoopReporter)
}

/// Create a recording reporter for tests
pub fn recording_reporter() -> Arc<RecordingReporter> {
    Arc::new(RecordingReporter::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_graphite_reporter_writes_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = String::new();
            socket.read_to_string(&mut received).await.unwrap();
            received
        });

        let reporter = GraphiteReporter::new(addr);
        reporter.send("stats.hits 1 100\n").await.unwrap();

        assert_eq!(server.await.unwrap(), "stats.hits 1 100\n");
    }

    #[tokio::test]
    async fn test_graphite_reporter_connect_failure() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let reporter = GraphiteReporter::new(addr);
        let err = reporter.send("stats.hits 1 100\n").await.unwrap_err();
        assert!(matches!(err, ReportError::Connect(_) | ReportError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_noop_reporter_succeeds() {
        let reporter = NoopReporter;
        assert!(reporter.send("anything\n").await.is_ok());
        assert_eq!(reporter.destination(), "none");
    }

    #[tokio::test]
    async fn test_recording_reporter() {
        let reporter = RecordingReporter::new();

        reporter.send("one\n").await.unwrap();
        reporter.set_failing(true);
        assert!(reporter.send("two\n").await.is_err());

        assert_eq!(reporter.payloads(), vec!["one\n".to_string()]);
        assert_eq!(reporter.attempts(), 2);
    }

    #[test]
    fn test_error_display() {
        let err = ReportError::Timeout("connect");
        assert_eq!(err.to_string(), "timed out during connect");
    }
}
