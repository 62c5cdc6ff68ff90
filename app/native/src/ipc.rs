//! Unix Domain Socket IPC for CLI<->daemon communication.
//!
//! The daemon starts a socket server on startup; CLI commands connect, send
//! one JSON request line, and read one JSON response line. If the socket does
//! not exist or the connection fails, the daemon is not running.
//!
//! # Request Format
//!
//! Requests are JSON objects with a `type` field and optional parameters:
//!
//! ```json
//! {"type": "activate", "path": "/walls/ocean.mp4"}
//! {"type": "widgetSet", "key": "scale", "value": "1.5"}
//! ```
//!
//! # Response Format
//!
//! Responses are JSON with either `data` or `error`:
//!
//! ```json
//! {"data": [...]}
//! {"error": "Wallpaper error: no such file"}
//! ```

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::settings::SlideshowSettings;

/// Socket filename within the runtime directory.
const SOCKET_FILENAME: &str = "fresco.sock";

/// Default timeout for socket operations in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Number of retry attempts for transient connection failures.
const MAX_RETRIES: u32 = 3;

/// Delay between retry attempts in milliseconds.
const RETRY_DELAY_MS: u64 = 100;

/// Whether the server is running.
static SERVER_RUNNING: AtomicBool = AtomicBool::new(false);

/// Requests the CLI can send to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    /// Ping to check the daemon is running.
    Ping,
    /// Current activation state, slideshow and widget settings.
    Status,
    /// All catalog items in display order.
    List,
    /// Add explicitly picked files to the catalog.
    Add { paths: Vec<String> },
    /// Scan a folder and add every recognized media file.
    AddFolder { dir: String },
    /// Activate a catalog item as the background.
    Activate { path: String },
    /// Clear the active background.
    Stop,
    /// Advance the slideshow by one step immediately.
    Next,
    /// Remove an item from the catalog.
    Remove { path: String },
    /// Replace the slideshow settings.
    Slideshow { settings: SlideshowSettings },
    /// Open or close the date widget.
    WidgetEnable { enabled: bool },
    /// Update one widget setting by key.
    WidgetSet { key: String, value: String },
    /// Register or unregister session autostart.
    Autostart { enable: bool },
    /// Show the management UI window.
    Show,
    /// Hide the management UI window.
    Hide,
}

/// Response from daemon to CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// Successful response with data.
    Success { data: serde_json::Value },
    /// Error response.
    Error { error: String },
}

impl Response {
    /// Creates a success response.
    pub fn success(data: impl Serialize) -> Self {
        Self::Success {
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self { Self::Error { error: message.into() } }
}

/// Gets the path to the control socket.
#[must_use]
pub fn socket_path() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join(SOCKET_FILENAME)
}

/// Removes the socket file if it exists.
fn remove_socket() {
    let path = socket_path();
    if path.exists() {
        let _ = std::fs::remove_file(&path);
    }
}

/// Starts the control socket server.
///
/// Called once during daemon startup. The server runs in a background thread
/// and handles each connection on its own thread, so slow clients never stall
/// the accept loop.
pub fn start_server<F>(handler: F)
where F: Fn(Request) -> Response + Send + Sync + 'static {
    if SERVER_RUNNING.swap(true, Ordering::SeqCst) {
        tracing::warn!("control socket server already running");
        return;
    }

    // Remove any stale socket left by a previous run.
    remove_socket();

    let path = socket_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let listener = match UnixListener::bind(&path) {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, path = %path.display(), "failed to bind control socket");
            SERVER_RUNNING.store(false, Ordering::SeqCst);
            return;
        }
    };

    tracing::info!(path = %path.display(), "control socket listening");

    let handler = Arc::new(handler);
    let spawned = thread::Builder::new()
        .name("ipc-server".to_string())
        .spawn(move || server_loop(listener, handler));
    if let Err(err) = spawned {
        tracing::error!(error = %err, "failed to spawn control socket thread");
        SERVER_RUNNING.store(false, Ordering::SeqCst);
    }
}

/// Main server loop that accepts connections.
fn server_loop<F>(listener: UnixListener, handler: Arc<F>)
where F: Fn(Request) -> Response + Send + Sync + 'static {
    for stream in listener.incoming() {
        if !SERVER_RUNNING.load(Ordering::SeqCst) {
            break;
        }

        match stream {
            Ok(stream) => {
                let handler = handler.clone();
                thread::spawn(move || handle_connection(stream, handler.as_ref()));
            }
            Err(err) => {
                tracing::warn!(error = %err, "control socket connection error");
            }
        }
    }
}

/// Handles a single client connection.
fn handle_connection<F>(stream: UnixStream, handler: &F)
where F: Fn(Request) -> Response {
    let _ = stream.set_read_timeout(Some(Duration::from_millis(DEFAULT_TIMEOUT_MS)));

    let Ok(clone) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(clone);
    let mut line = String::new();
    if reader.read_line(&mut line).is_err() {
        return;
    }

    let response = match serde_json::from_str::<Request>(line.trim()) {
        Ok(request) => handler(request),
        Err(err) => Response::error(format!("Invalid request: {err}")),
    };

    let json = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"error":"Failed to serialize response"}"#.to_string());

    let mut stream = reader.into_inner();
    let _ = writeln!(stream, "{json}");
}

/// Stops the control socket server and removes the socket file.
pub fn stop_server() {
    SERVER_RUNNING.store(false, Ordering::SeqCst);
    // Wake the accept loop so it observes the stop without needing a real
    // client to connect first.
    let _ = UnixStream::connect(socket_path());
    remove_socket();
}

/// Error type for IPC client operations.
#[derive(Debug)]
pub enum IpcError {
    /// Daemon is not running (socket doesn't exist or can't connect).
    DaemonNotRunning,
    /// Connection timeout.
    Timeout,
    /// IO error.
    Io(std::io::Error),
    /// Invalid response from the daemon.
    InvalidResponse(String),
}

impl std::fmt::Display for IpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DaemonNotRunning => write!(f, "Fresco daemon is not running"),
            Self::Timeout => write!(f, "Connection timed out"),
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::InvalidResponse(msg) => write!(f, "Invalid response: {msg}"),
        }
    }
}

impl std::error::Error for IpcError {}

/// Sends a request to the running daemon and returns the response.
///
/// Retries transient connection failures up to 3 times; timeouts and malformed
/// responses fail immediately.
pub fn send_request(request: &Request) -> Result<Response, IpcError> {
    let mut last_error = IpcError::DaemonNotRunning;

    for attempt in 0..MAX_RETRIES {
        match send_request_once(request) {
            Ok(response) => return Ok(response),
            Err(err) => {
                last_error = err;
                if !matches!(last_error, IpcError::DaemonNotRunning) {
                    break;
                }
                if attempt < MAX_RETRIES - 1 {
                    thread::sleep(Duration::from_millis(RETRY_DELAY_MS));
                }
            }
        }
    }

    Err(last_error)
}

/// Sends a request once without retrying.
fn send_request_once(request: &Request) -> Result<Response, IpcError> {
    let path = socket_path();
    if !path.exists() {
        return Err(IpcError::DaemonNotRunning);
    }

    let mut stream = UnixStream::connect(&path).map_err(|err| match err.kind() {
        std::io::ErrorKind::ConnectionRefused
        | std::io::ErrorKind::NotFound
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::ConnectionReset => IpcError::DaemonNotRunning,
        _ => IpcError::Io(err),
    })?;

    stream
        .set_read_timeout(Some(Duration::from_millis(DEFAULT_TIMEOUT_MS)))
        .map_err(IpcError::Io)?;
    stream
        .set_write_timeout(Some(Duration::from_millis(DEFAULT_TIMEOUT_MS)))
        .map_err(IpcError::Io)?;

    let json = serde_json::to_string(request)
        .map_err(|err| IpcError::InvalidResponse(err.to_string()))?;
    writeln!(stream, "{json}").map_err(IpcError::Io)?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).map_err(|err| {
        if err.kind() == std::io::ErrorKind::WouldBlock
            || err.kind() == std::io::ErrorKind::TimedOut
        {
            IpcError::Timeout
        } else {
            IpcError::Io(err)
        }
    })?;

    serde_json::from_str(line.trim())
        .map_err(|err| IpcError::InvalidResponse(err.to_string()))
}
