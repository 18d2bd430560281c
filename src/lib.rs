pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod session;
pub mod telemetry;
pub mod transport;

pub use config::SessionConfig;
pub use error::BridgeError;
pub use models::{
    CpuInfo, DeviceInfoReport, DeviceSummary, DisplayGeometry, DisplayInfo, ForwardMapping,
    GpuInfo, TopActivity, WindowViewport,
};
pub use session::{
    DevicePortSpec, InteractiveShell, LogcatLines, Session, SessionRegistry, ShellCmd,
};
pub use transport::{DeviceHandle, ShellStream, Transport, TransportError};
