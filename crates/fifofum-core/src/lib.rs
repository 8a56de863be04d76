//! `fifofum` Core Library
//!
//! Pure ingestion logic shared by the fifofum server:
//! - Incremental line reassembly from raw non-blocking pipe reads
//! - Channel directive parsing and per-line routing
//! - Channel-name sanitization and the wire message format
//! - Common error types

pub mod assemble;
pub mod channel;
pub mod error;
pub mod route;
pub mod tracing_init;

pub use assemble::{LineAssembler, READ_CHUNK_SIZE};
pub use error::{Error, Result};
pub use route::{Message, RouterConfig, SourceState};
