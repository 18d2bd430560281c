use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use crate::models::{DeviceSummary, TopActivity};

/// Failure surface of the underlying protocol client. The session layer maps
/// these onto its own error taxonomy and never exposes them directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No device matches the requested serial.
    NotFound(String),
    Timeout,
    /// The debug server rejected the request (bad forward spec, rebind
    /// refusal, install failure and the like).
    Protocol(String),
    Io(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NotFound(serial) => write!(f, "device not found: {serial}"),
            TransportError::Timeout => write!(f, "operation timed out"),
            TransportError::Protocol(message) => write!(f, "protocol error: {message}"),
            TransportError::Io(message) => write!(f, "io error: {message}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Live connection to an in-flight shell command. The holder owns the
/// connection lifetime; dropping the stream releases the underlying socket on
/// every exit path.
pub trait ShellStream: Read + Write + Send {
    /// Zero-byte liveness write against the underlying socket. `Err` means
    /// the peer side is gone.
    fn probe(&mut self) -> std::io::Result<()>;
}

/// Control connection to the local debug server.
pub trait Transport: Send + Sync {
    fn devices(&self) -> Result<Vec<DeviceSummary>, TransportError>;

    fn open_device(&self, serial: &str) -> Result<Box<dyn DeviceHandle>, TransportError>;
}

/// Primitive operations against one resolved device. Implemented by the
/// protocol client; consumed exclusively through `Session`.
pub trait DeviceHandle: Send + Sync {
    fn serial(&self) -> &str;

    fn state(&self) -> Result<String, TransportError>;

    /// Buffered shell execution; returns the complete output bytes.
    fn shell(&self, cmd: &str, timeout: Option<Duration>) -> Result<Vec<u8>, TransportError>;

    /// Streaming shell execution; the returned stream stays open until
    /// dropped.
    fn shell_stream(
        &self,
        cmd: &str,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn ShellStream>, TransportError>;

    fn properties(&self) -> Result<HashMap<String, String>, TransportError>;

    fn push(&self, local: &Path, remote: &str) -> Result<(), TransportError>;

    fn pull(&self, remote: &str, local: &Path) -> Result<(), TransportError>;

    fn install(&self, local: &Path, reinstall: bool) -> Result<(), TransportError>;

    fn uninstall(&self, package: &str) -> Result<(), TransportError>;

    fn forward(&self, local: &str, remote: &str, no_rebind: bool) -> Result<(), TransportError>;

    fn kill_forward(&self, local: &str) -> Result<(), TransportError>;

    fn kill_forward_all(&self) -> Result<(), TransportError>;

    /// Currently registered (local, remote) pairs for this device.
    fn list_forward(&self) -> Result<Vec<(String, String)>, TransportError>;

    fn input_tap(&self, x: u32, y: u32) -> Result<(), TransportError>;

    fn input_swipe(
        &self,
        x0: u32,
        y0: u32,
        x1: u32,
        y1: u32,
        duration_ms: u32,
    ) -> Result<(), TransportError>;

    fn input_keyevent(&self, key: &str) -> Result<(), TransportError>;

    fn screencap(&self) -> Result<Vec<u8>, TransportError>;

    fn top_activity(&self) -> Result<TopActivity, TransportError>;

    /// Structured size query, when the client exposes one. `None` when the
    /// device does not answer it.
    fn wm_size(&self) -> Result<Option<(u32, u32)>, TransportError>;

    fn wm_density(&self) -> Result<Option<f64>, TransportError>;
}
