//! `fifofum` Server
//!
//! Bridges named pipes (FIFOs) to live browser clients:
//! - `pipe` — per-pipe read loops and supervision
//! - `broadcast` — subscriber registry and message fan-out
//! - `input` — reverse path from browsers into a writable pipe
//! - `routes` — the HTTP/WebSocket surface

pub mod broadcast;
pub mod input;
pub mod pipe;
pub mod routes;
