//! # TCP Module Transport
//!
//! Modules connect over TCP and exchange length-prefixed frames.
//!
//! ```text
//! ┌────────────┬──────────────────────┐
//! │ len: u16 LE│ frame (len bytes)    │   repeated
//! └────────────┴──────────────────────┘
//! ```
//!
//! The first frame of a connection is the module name as UTF-8 text. Every
//! later frame is one encoded packet and is handed to the runtime as
//! [`HubCommand::Frame`]. Outbound frames go through the
//! [`ConnectionRegistry`], which owns one writer task per connection.

use crate::ports::FrameSink;
use crate::runtime::HubCommand;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Largest frame the length prefix can carry.
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

struct Connection {
    id: u64,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

/// Outbound side of every live module connection, keyed by module name.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<Mutex<HashMap<String, Connection>>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `module`, replacing any previous one.
    /// Returns the connection id used to unregister it.
    pub fn register(&self, module: &str, outbound: mpsc::UnboundedSender<Vec<u8>>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let previous = self
            .connections
            .lock()
            .insert(module.to_string(), Connection { id, outbound });
        if previous.is_some() {
            warn!(module = %module, "Module connected twice, previous transport replaced");
        }
        id
    }

    /// Drop the connection unless a newer one took its place.
    /// Returns `true` if it was removed.
    pub fn unregister(&self, module: &str, id: u64) -> bool {
        let mut connections = self.connections.lock();
        if connections.get(module).is_some_and(|c| c.id == id) {
            connections.remove(module);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_connected(&self, module: &str) -> bool {
        self.connections.lock().contains_key(module)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }
}

impl FrameSink for ConnectionRegistry {
    fn send(&mut self, module: &str, frame: Vec<u8>) -> bool {
        if frame.len() > MAX_FRAME_LEN {
            warn!(module = %module, len = frame.len(), "Frame too long for transport, dropped");
            return false;
        }
        let connections = self.connections.lock();
        match connections.get(module) {
            Some(connection) => connection.outbound.send(frame).is_ok(),
            None => false,
        }
    }
}

// =============================================================================
// FRAMING
// =============================================================================

/// Read one frame. `Ok(None)` on a clean end of stream.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut len = [0u8; 2];
    match reader.read_exact(&mut len).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let mut frame = vec![0u8; usize::from(u16::from_le_bytes(len))];
    reader.read_exact(&mut frame).await?;
    Ok(Some(frame))
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &[u8]) -> io::Result<()> {
    let len = u16::try_from(frame.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame too long"))?;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(frame).await?;
    Ok(())
}

// =============================================================================
// SERVER
// =============================================================================

/// Accept module connections until the runtime goes away.
pub async fn serve(
    listener: TcpListener,
    commands: mpsc::UnboundedSender<HubCommand>,
    registry: ConnectionRegistry,
) {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Module transport listening");
    }
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "Failed to accept module connection");
                continue;
            }
        };
        if commands.is_closed() {
            return;
        }
        tokio::spawn(handle_connection(
            stream,
            peer,
            commands.clone(),
            registry.clone(),
        ));
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    commands: mpsc::UnboundedSender<HubCommand>,
    registry: ConnectionRegistry,
) {
    let (mut reader, mut writer) = stream.into_split();

    let module = match read_frame(&mut reader).await {
        Ok(Some(name)) => match String::from_utf8(name) {
            Ok(name) if !name.is_empty() => name,
            _ => {
                warn!(%peer, "Module sent an invalid name, connection closed");
                return;
            }
        },
        Ok(None) => return,
        Err(e) => {
            debug!(%peer, error = %e, "Connection closed before module name");
            return;
        }
    };

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let connection_id = registry.register(&module, outbound_tx);
    info!(module = %module, %peer, "Module transport connected");

    let writer_module = module.clone();
    let writer_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if let Err(e) = write_frame(&mut writer, &frame).await {
                debug!(module = %writer_module, error = %e, "Write failed, writer stopped");
                return;
            }
        }
    });

    if commands
        .send(HubCommand::ModuleConnected {
            module: module.clone(),
        })
        .is_ok()
    {
        loop {
            match read_frame(&mut reader).await {
                Ok(Some(frame)) => {
                    let command = HubCommand::Frame {
                        module: module.clone(),
                        frame,
                    };
                    if commands.send(command).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(module = %module, error = %e, "Read failed");
                    break;
                }
            }
        }
    }

    writer_task.abort();
    if registry.unregister(&module, connection_id) {
        info!(module = %module, "Module transport disconnected");
        let _ = commands.send(HubCommand::ModuleDisconnected { module });
    }
}
