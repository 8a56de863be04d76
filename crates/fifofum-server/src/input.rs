//! Reverse path: subscriber input appended to a writable pipe.
//!
//! At most one target exists per server instance, configured at startup and
//! shared by every connection. Each inbound message becomes one line,
//! flushed immediately so the downstream producer sees it promptly.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use fifofum_core::channel::is_stdio_token;

/// The configured input-echo target.
pub struct InputEcho {
    target: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    description: String,
}

impl InputEcho {
    /// Open the target named on the command line: a writable pipe path, or
    /// the stdio token for standard output.
    ///
    /// Opening a FIFO for writing blocks until a reader attaches, matching
    /// the producer-side contract of named pipes.
    pub async fn open(path: &str) -> std::io::Result<Self> {
        if is_stdio_token(path) {
            return Ok(Self::from_writer(Box::new(tokio::io::stdout()), path));
        }
        let file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
        Ok(Self::from_writer(Box::new(file), path))
    }

    /// Wrap an arbitrary writer (used by tests and the stdio token path).
    pub fn from_writer(
        writer: Box<dyn AsyncWrite + Send + Unpin>,
        description: &str,
    ) -> Self {
        Self {
            target: Mutex::new(writer),
            description: description.to_string(),
        }
    }

    /// Target as named on the command line, for log context.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Append one inbound message as a newline-terminated line and flush.
    ///
    /// Failures are the caller's to log; they must never tear down the
    /// connection or the process.
    pub async fn write_line(&self, text: &str) -> std::io::Result<()> {
        let mut target = self.target.lock().await;
        target.write_all(text.as_bytes()).await?;
        target.write_all(b"\n").await?;
        target.flush().await
    }
}
