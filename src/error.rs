use serde::Serialize;
use std::fmt;

pub const ERR_CONNECTIVITY: &str = "ERR_CONNECTIVITY";
pub const ERR_COMMAND: &str = "ERR_COMMAND";
pub const ERR_TIMEOUT: &str = "ERR_TIMEOUT";
pub const ERR_PARSE: &str = "ERR_PARSE";
pub const ERR_CONFIG: &str = "ERR_CONFIG";

#[derive(Debug, Clone, Serialize)]
pub struct BridgeError {
    pub error: String,
    pub code: String,
    pub trace_id: String,
}

impl BridgeError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            trace_id: trace_id.into(),
        }
    }

    /// No device found, device unreachable, or wait-for-device ran out of time.
    pub fn connectivity(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_CONNECTIVITY, message, trace_id)
    }

    /// The transport rejected or failed a command; the cause is folded into the message.
    pub fn command(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_COMMAND, message, trace_id)
    }

    pub fn timeout(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_TIMEOUT, message, trace_id)
    }

    /// No inference strategy matched and the operation has no sane default.
    pub fn parse_inference(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_PARSE, message, trace_id)
    }

    pub fn config(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_CONFIG, message, trace_id)
    }

    pub fn is_connectivity(&self) -> bool {
        self.code == ERR_CONNECTIVITY
    }

    /// Command-execution class, including the timeout flavor.
    pub fn is_command(&self) -> bool {
        self.code == ERR_COMMAND || self.code == ERR_TIMEOUT
    }

    pub fn is_timeout(&self) -> bool {
        self.code == ERR_TIMEOUT
    }

    pub fn is_parse(&self) -> bool {
        self.code == ERR_PARSE
    }

    pub fn is_config(&self) -> bool {
        self.code == ERR_CONFIG
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.code)
    }
}

impl std::error::Error for BridgeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_class_covers_timeout() {
        let err = BridgeError::timeout("shell command timed out", "trace");
        assert!(err.is_command());
        assert!(err.is_timeout());
        assert!(!err.is_connectivity());
    }

    #[test]
    fn display_includes_code() {
        let err = BridgeError::connectivity("no device found for [X]", "trace");
        assert_eq!(err.to_string(), "no device found for [X] (ERR_CONNECTIVITY)");
    }
}
