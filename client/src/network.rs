//! Connection to the arena server and the session's main loop.
//!
//! After connecting, the first line from the server assigns our fighter id
//! and spawn cell. From then on one loop reads server lines and key presses
//! and routes both through the [`GameSession`]; a separate task owns the
//! socket's write half so every outbound line is written whole.

use crate::commands::command_bus;
use crate::game::GameSession;
use crate::input::Key;
use crate::position_index::PositionIndex;
use crate::rendering::{Backend, Renderer, BANNER_START};
use crate::shutdown::{Shutdown, ShutdownReason};
use log::{debug, error, info, warn};
use shared::{Line, ProtocolError};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unable to open connection to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("server closed the connection before assigning a fighter")]
    ClosedBeforeBootstrap,
    #[error("unable to read connection line: {0}")]
    Bootstrap(#[from] ProtocolError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: String,
    /// How long a struck fighter stays yellow.
    pub hit_flash: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:9000".to_string(),
            hit_flash: Duration::from_millis(100),
        }
    }
}

/// Identity handed out by the server in its first line, `_,{id},{x},{y}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bootstrap {
    pub id: i32,
    pub x: i32,
    pub y: i32,
}

pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    bootstrap: Bootstrap,
    config: ClientConfig,
}

impl Client {
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        info!("Connecting to server...");
        let stream = TcpStream::connect(&config.server)
            .await
            .map_err(|source| ClientError::Connect {
                addr: config.server.clone(),
                source,
            })?;

        Self::from_stream(stream, config).await
    }

    /// Reads the bootstrap line from an already connected stream.
    pub async fn from_stream(stream: TcpStream, config: ClientConfig) -> Result<Self, ClientError> {
        let (read_half, writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let mut raw = String::new();
        if reader.read_line(&mut raw).await? == 0 {
            return Err(ClientError::ClosedBeforeBootstrap);
        }

        let line = Line::parse(&raw)?;
        let bootstrap = Bootstrap {
            id: line.id,
            x: line.x,
            y: line.y,
        };
        info!(
            "Connected! Fighter ID: {} at ({}, {})",
            bootstrap.id, bootstrap.x, bootstrap.y
        );

        Ok(Self {
            reader,
            writer,
            bootstrap,
            config,
        })
    }

    pub fn bootstrap(&self) -> Bootstrap {
        self.bootstrap
    }

    /// Plays the session until `shutdown` fires.
    ///
    /// Returns why the session ended together with the backend, so the
    /// caller can keep a game-over board on screen.
    pub async fn run<B: Backend + 'static>(
        self,
        backend: B,
        mut keys: mpsc::UnboundedReceiver<Key>,
        shutdown: Shutdown,
    ) -> Result<(ShutdownReason, B), ClientError> {
        let Client {
            reader,
            writer,
            bootstrap,
            config,
        } = self;

        let index = Arc::new(PositionIndex::new());
        let (bus, stream) = command_bus();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let mut renderer = Renderer::new(
            backend,
            bus.clone(),
            out_tx,
            shutdown.clone(),
            config.hit_flash,
        );
        renderer.draw_board(BANNER_START)?;
        let renderer_task = tokio::spawn(renderer.run(stream));
        let writer_task = tokio::spawn(write_lines(writer, out_rx, shutdown.clone()));

        let mut session = GameSession::new(index, bus, shutdown.clone());
        session.spawn_local(bootstrap.id, bootstrap.x, bootstrap.y);

        let mut lines = reader.lines();
        let mut keys_open = true;

        let reason = loop {
            tokio::select! {
                biased;

                reason = shutdown.wait() => break reason,
                result = lines.next_line() => match result {
                    Ok(Some(raw)) => match Line::parse(&raw) {
                        Ok(line) => session.handle_line(line),
                        Err(e) => warn!("Dropping malformed line: {}", e),
                    },
                    Ok(None) => {
                        info!("Server closed the connection");
                        shutdown.trigger(ShutdownReason::Disconnected);
                    }
                    Err(e) => {
                        error!("Error reading from server: {}", e);
                        shutdown.trigger(ShutdownReason::Disconnected);
                    }
                },
                key = keys.recv(), if keys_open => match key {
                    Some(key) => session.handle_key(key),
                    None => {
                        debug!("Keyboard channel closed");
                        keys_open = false;
                    }
                },
            }
        };

        info!("Session ended: {} ({} fighters seen)", reason, session.len());

        let backend = renderer_task
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        if let Err(e) = writer_task.await {
            error!("Network writer task panicked: {}", e);
        }

        Ok((reason, backend))
    }
}

/// Owns the write half; one `write_all` per line.
async fn write_lines(
    mut writer: OwnedWriteHalf,
    mut lines: mpsc::UnboundedReceiver<Line>,
    shutdown: Shutdown,
) {
    loop {
        tokio::select! {
            line = lines.recv() => match line {
                Some(line) => {
                    debug!("Sending {}", line);
                    if let Err(e) = writer.write_all(line.to_wire().as_bytes()).await {
                        error!("Error sending to server: {}", e);
                        shutdown.trigger(ShutdownReason::Disconnected);
                        break;
                    }
                }
                None => break,
            },
            _ = shutdown.wait() => break,
        }
    }

    let _ = writer.shutdown().await;
}
