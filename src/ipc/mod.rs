//! IPC (Inter-Process Communication) via Unix sockets
//!
//! Provides message-based communication between the edit surface and the daemon.
//! Uses length-prefixed JSON over Unix domain sockets.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

mod messages;
pub use messages::{ControlRequest, ControlResponse};

use crate::constants::ipc::{CLIENT_READ_TIMEOUT_MS, MAX_MESSAGE_SIZE, SOCKET_RELATIVE_PATH};

/// Get default socket path (XDG_RUNTIME_DIR with fallback to cache)
pub fn default_socket_path() -> Result<PathBuf> {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir).join(SOCKET_RELATIVE_PATH));
    }

    // Fallback to cache dir
    let cache = dirs::cache_dir()
        .context("Failed to determine cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(cache.join(SOCKET_RELATIVE_PATH))
}

/// Client connection to the daemon (used by the edit surface)
pub struct ControlClient {
    stream: UnixStream,
}

impl ControlClient {
    /// Connect to specific socket path
    pub fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .context(format!("Failed to connect to daemon at {}", path.display()))?;
        Ok(Self { stream })
    }

    /// Send request and wait for response
    pub fn request(&mut self, req: &ControlRequest) -> Result<ControlResponse> {
        write_message(&mut self.stream, req)?;
        read_message(&mut self.stream)
    }
}

/// Server listener for the daemon
pub struct ControlServer {
    listener: UnixListener,
    socket_path: PathBuf,
    read_timeout: Duration,
}

impl ControlServer {
    /// Create server and bind to specific socket path
    pub fn bind_to(socket_path: PathBuf) -> Result<Self> {
        // Create directory if needed
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create socket directory: {}", parent.display()))?;
        }

        // Remove stale socket if exists
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .context(format!("Failed to remove stale socket: {}", socket_path.display()))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .context(format!("Failed to bind socket at {}", socket_path.display()))?;

        // Set permissions to 0700 (owner only)
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o700))
                .context("Failed to set socket permissions")?;
        }

        Ok(Self {
            listener,
            socket_path,
            read_timeout: Duration::from_millis(CLIENT_READ_TIMEOUT_MS),
        })
    }

    #[cfg(test)]
    fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Get socket path
    pub fn path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        // Clean up socket file
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// A request handed to the tick thread together with the way back to the client
pub struct Envelope {
    pub request: ControlRequest,
    pub reply: Sender<ControlResponse>,
}

/// Spawn a background thread accepting edit surface connections.
///
/// Requests are forwarded to the tick thread through `sender`; the thread never
/// touches engine state itself. Connections are served one at a time.
pub fn spawn_listener(
    server: &ControlServer,
    sender: Sender<Envelope>,
) -> Result<thread::JoinHandle<()>> {
    let listener = server
        .listener
        .try_clone()
        .context("Failed to clone control socket listener")?;
    let read_timeout = server.read_timeout;

    let handle = thread::spawn(move || {
        info!("Control listener started");
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    // a silent client must not hold up everyone queued behind it
                    if let Err(e) = stream.set_read_timeout(Some(read_timeout)) {
                        error!(error = %e, "Failed to set control connection timeout");
                        continue;
                    }
                    if let Err(e) = serve_connection(stream, &sender) {
                        debug!(error = %e, "Control connection ended");
                    }
                }
                Err(e) => error!(error = %e, "Failed to accept control connection"),
            }
        }
    });

    Ok(handle)
}

fn serve_connection(mut stream: UnixStream, sender: &Sender<Envelope>) -> Result<()> {
    loop {
        let request: ControlRequest = read_message(&mut stream)?;
        debug!(request = ?request, "Control request received");

        let (reply_tx, reply_rx) = mpsc::channel();
        let forwarded = sender.send(Envelope {
            request,
            reply: reply_tx,
        });
        let response = match forwarded.ok().and_then(|_| reply_rx.recv().ok()) {
            Some(response) => response,
            None => ControlResponse::Error("Daemon is shutting down".to_string()),
        };

        write_message(&mut stream, &response)?;
    }
}

/// Write length-prefixed message to stream
fn write_message<W: Write, T: Serialize>(stream: &mut W, msg: &T) -> Result<()> {
    let json = serde_json::to_vec(msg).context("Failed to serialize message to JSON")?;

    // Write length prefix (u32 little-endian)
    let len = json.len() as u32;
    stream
        .write_all(&len.to_le_bytes())
        .context("Failed to write message length")?;

    // Write JSON payload
    stream
        .write_all(&json)
        .context("Failed to write message payload")?;

    stream.flush().context("Failed to flush stream")?;

    Ok(())
}

/// Read length-prefixed message from stream
fn read_message<R: Read, T: for<'de> Deserialize<'de>>(stream: &mut R) -> Result<T> {
    // Read length prefix
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .context("Failed to read message length")?;
    let len = u32::from_le_bytes(len_buf) as usize;

    // Sanity check (prevent DoS via huge allocation)
    if len > MAX_MESSAGE_SIZE {
        return Err(anyhow!("Message too large: {} bytes (max: {})", len, MAX_MESSAGE_SIZE));
    }

    // Read JSON payload
    let mut json_buf = vec![0u8; len];
    stream
        .read_exact(&mut json_buf)
        .context("Failed to read message payload")?;

    // Deserialize
    serde_json::from_slice(&json_buf).context("Failed to deserialize message from JSON")
}
