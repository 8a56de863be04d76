//! `fifofum` server binary.
//!
//! Streams newline-terminated text and image data URLs from named pipes to
//! connected browsers over WebSocket, with an optional reverse path from
//! the browser into a writable pipe.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use fifofum_core::channel::is_stdio_token;
use fifofum_core::route::RouterConfig;
use fifofum_core::tracing_init::init_tracing;
use fifofum_server::broadcast::Broadcaster;
use fifofum_server::input::InputEcho;
use fifofum_server::pipe::{PipeSource, PipeSupervisor};
use fifofum_server::routes::{AppState, build_router};

#[derive(Parser, Debug)]
#[command(name = "fifofum")]
#[command(version, about = "FIFO pipe server - streams images and text from named pipes to browsers")]
struct Args {
    /// Bind address
    #[arg(long, default_value = "127.0.0.1", env = "FIFOFUM_ADDR")]
    addr: IpAddr,

    /// Bind port
    #[arg(long, default_value_t = 8008, env = "FIFOFUM_PORT")]
    port: u16,

    /// Input capture pipe path ("-" or "_" writes to standard output)
    #[arg(long, env = "FIFOFUM_INPUT")]
    input: Option<String>,

    /// Mirror non-image output lines to stdout
    #[arg(long, env = "FIFOFUM_PASSTHROUGH")]
    passthrough: bool,

    /// Honor "channel: NAME" directives on multiplexed pipes
    #[arg(long, env = "FIFOFUM_MULTIPLEX")]
    multiplex: bool,

    /// URL of a background image for plotted channels
    #[arg(long, default_value = "", env = "FIFOFUM_BACKGROUND")]
    background: String,

    /// Directory of static files to serve (default: ./www when present)
    #[arg(long, env = "FIFOFUM_WWW_DIR")]
    www_dir: Option<PathBuf>,

    /// Log level filter (e.g. "info", "debug", "warn")
    #[arg(long, default_value = "info", env = "FIFOFUM_LOG_LEVEL")]
    log_level: String,

    /// Output logs as JSON (for structured log aggregation)
    #[arg(long, env = "FIFOFUM_LOG_JSON")]
    log_json: bool,

    /// Named pipe (FIFO) paths to stream; "-" or "_" reads standard input
    #[arg(required = true)]
    pipes: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(
        &format!(
            "fifofum_core={level},fifofum_server={level}",
            level = args.log_level
        ),
        args.log_json,
    );

    // Fail before anything starts: a missing pipe is a configuration error.
    for path in &args.pipes {
        if !is_stdio_token(path) && !Path::new(path).exists() {
            return Err(fifofum_core::Error::PipeNotFound { path: path.clone() }.into());
        }
    }

    let config = RouterConfig {
        multiplex: args.multiplex,
        passthrough: args.passthrough,
    };
    let broadcaster = Broadcaster::new();
    let mut supervisor = PipeSupervisor::new(config, args.pipes.len() > 1, broadcaster.clone());

    for path in &args.pipes {
        let source =
            PipeSource::open(path).with_context(|| format!("opening pipe {path}"))?;
        info!(pipe = %source.name(), path = %path, "Opened pipe");
        supervisor.spawn(source);
    }

    let input = match args.input.as_deref() {
        Some(path) if !path.is_empty() => {
            let echo = InputEcho::open(path)
                .await
                .with_context(|| format!("opening input pipe {path}"))?;
            info!(input = %path, "Transmitting input via pipe");
            Some(Arc::new(echo))
        }
        _ => None,
    };

    let www_dir = args.www_dir.or_else(|| {
        let dir = PathBuf::from("www");
        dir.is_dir().then_some(dir)
    });

    let state = AppState {
        broadcaster,
        input,
        background_url: args.background,
    };
    let app = build_router(state, www_dir.clone());

    let bind = SocketAddr::new(args.addr, args.port);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(addr = %bind, www_dir = ?www_dir, pipes = supervisor.pipe_count(), "fifofum listening");

    axum::serve(listener, app).await?;
    Ok(())
}
