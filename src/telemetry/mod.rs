//! Pure text parsers for the telemetry inference engine. Each function takes
//! command output and returns an optional structured value; the session layer
//! chains them in fixed fallback order.

pub mod display;
pub mod hardware;
pub mod net;
pub mod window;
