//! Pipe ingestion: sources, supervision, and the passthrough sink.
//!
//! Data flow per pipe:
//! ```text
//! FIFO readable → bounded read → LineAssembler → SourceState::process_line
//!              → Broadcaster::send_to_all / PassthroughSink::log
//! ```
//! One tokio task owns each pipe end to end, so lines are processed
//! strictly in read order and there is exactly one in-flight reassembly
//! state per pipe.

use std::io::Write as _;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::unix::pipe;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use fifofum_core::channel::{is_stdio_token, source_name};
use fifofum_core::route::{RouterConfig, SourceState};
use fifofum_core::{LineAssembler, READ_CHUNK_SIZE, Result};

use crate::broadcast::Broadcaster;

/// Back-off after a failed read (or EOF with no writer attached) before the
/// pipe is polled again, so a persistently erroring descriptor cannot
/// busy-loop the task.
pub const ERROR_COOLDOWN: Duration = Duration::from_secs(1);

/// Readable end of one configured source.
enum PipeHandle {
    /// A named pipe, opened non-blocking in read-write access mode so the
    /// descriptor stays usable across producer restarts instead of hitting
    /// EOF when the last writer detaches.
    Fifo(pipe::Receiver),
    /// The stdin token (`-` / `_`).
    Stdin(tokio::io::Stdin),
}

impl PipeHandle {
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Fifo(receiver) => receiver.read(buf).await,
            Self::Stdin(stdin) => stdin.read(buf).await,
        }
    }
}

/// One configured pipe: identity, readable handle, and routing state.
pub struct PipeSource {
    path: String,
    handle: PipeHandle,
    assembler: LineAssembler,
    state: SourceState,
}

impl PipeSource {
    /// Open a pipe path (or the stdin token) and derive its channel name.
    pub fn open(path: &str) -> Result<Self> {
        let handle = if is_stdio_token(path) {
            PipeHandle::Stdin(tokio::io::stdin())
        } else {
            PipeHandle::Fifo(
                pipe::OpenOptions::new().read_write(true).open_receiver(path)?,
            )
        };
        Ok(Self {
            path: path.to_string(),
            handle,
            assembler: LineAssembler::new(),
            state: SourceState::new(source_name(path)),
        })
    }

    /// Sanitized channel name derived from the path.
    pub fn name(&self) -> &str {
        self.state.name()
    }
}

/// Mirrors non-payload lines to standard output.
///
/// Purely observational: a broken output stream must not affect ingestion
/// or broadcast, so write results are discarded.
#[derive(Debug, Clone, Copy)]
pub struct PassthroughSink {
    multi_source: bool,
}

impl PassthroughSink {
    /// `multi_source` selects the pipe-name prefix, needed to tell lines
    /// apart when more than one pipe is configured.
    pub const fn new(multi_source: bool) -> Self {
        Self { multi_source }
    }

    /// Render one line for the given pipe.
    pub fn format(&self, pipe_name: &str, line: &str) -> String {
        if self.multi_source {
            format!("{pipe_name}:{line}")
        } else {
            line.to_string()
        }
    }

    /// Write one line to stdout, ignoring failures.
    pub fn log(&self, pipe_name: &str, line: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", self.format(pipe_name, line));
        let _ = out.flush();
    }
}

/// Owns every configured pipe and the task driving it.
pub struct PipeSupervisor {
    config: RouterConfig,
    sink: PassthroughSink,
    broadcaster: Broadcaster,
    tasks: Vec<JoinHandle<()>>,
}

impl PipeSupervisor {
    /// Create a supervisor for one server instance. `multi_source` must be
    /// true when more than one pipe is configured.
    pub fn new(config: RouterConfig, multi_source: bool, broadcaster: Broadcaster) -> Self {
        Self {
            config,
            sink: PassthroughSink::new(multi_source),
            broadcaster,
            tasks: Vec::new(),
        }
    }

    /// Take ownership of a source and spawn its read loop.
    pub fn spawn(&mut self, source: PipeSource) {
        let config = self.config;
        let sink = self.sink;
        let broadcaster = self.broadcaster.clone();
        self.tasks
            .push(tokio::spawn(run_source(source, config, sink, broadcaster)));
    }

    /// Number of supervised pipes.
    pub fn pipe_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Drop for PipeSupervisor {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Read loop for one pipe: lives for the whole process, recovering from
/// transient errors with the skip-first-line guard plus a cooldown.
async fn run_source(
    mut source: PipeSource,
    config: RouterConfig,
    sink: PassthroughSink,
    broadcaster: Broadcaster,
) {
    let mut buf = [0u8; READ_CHUNK_SIZE];
    loop {
        match source.handle.read(&mut buf).await {
            Ok(0) => {
                // EOF: no writer on the other end right now. The resumed
                // stream's first line may be a truncated continuation.
                debug!(pipe = %source.state.name(), "Pipe EOF, waiting for a writer");
                source.state.mark_interrupted();
                tokio::time::sleep(ERROR_COOLDOWN).await;
            }
            Ok(n) => {
                for line in source.assembler.push(&buf[..n]) {
                    let routed = source.state.process_line(&line, &config);
                    if routed.passthrough {
                        sink.log(source.state.name(), &line);
                    }
                    if let Some(message) = routed.message {
                        broadcaster.send_to_all(&message.encode()).await;
                    }
                }
            }
            Err(e) => {
                warn!(
                    pipe = %source.state.name(),
                    path = %source.path,
                    error = %e,
                    "Pipe read failed, backing off"
                );
                source.state.mark_interrupted();
                tokio::time::sleep(ERROR_COOLDOWN).await;
            }
        }
    }
}
