use std::io::{self, BufRead, BufReader, Read, Write};
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::BridgeError;
use crate::session::Session;
use crate::transport::ShellStream;

/// A shell command, either a full line or a token sequence. Tokens are
/// joined with single spaces; a line is whitespace-normalized the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCmd {
    Line(String),
    Tokens(Vec<String>),
}

impl ShellCmd {
    pub fn format(&self) -> String {
        match self {
            ShellCmd::Line(line) => line
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
            ShellCmd::Tokens(tokens) => tokens.join(" "),
        }
    }
}

impl From<&str> for ShellCmd {
    fn from(line: &str) -> Self {
        ShellCmd::Line(line.to_string())
    }
}

impl From<String> for ShellCmd {
    fn from(line: String) -> Self {
        ShellCmd::Line(line)
    }
}

impl From<Vec<String>> for ShellCmd {
    fn from(tokens: Vec<String>) -> Self {
        ShellCmd::Tokens(tokens)
    }
}

impl From<Vec<&str>> for ShellCmd {
    fn from(tokens: Vec<&str>) -> Self {
        ShellCmd::Tokens(tokens.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for ShellCmd {
    fn from(tokens: &[&str]) -> Self {
        ShellCmd::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }
}

impl Session {
    /// Buffered shell execution with the session's default timeout; output
    /// decoded as UTF-8 text.
    pub fn shell(&self, cmd: impl Into<ShellCmd>) -> Result<String, BridgeError> {
        self.shell_with_timeout(cmd, self.config.shell_timeout)
    }

    pub fn shell_with_timeout(
        &self,
        cmd: impl Into<ShellCmd>,
        timeout: Option<Duration>,
    ) -> Result<String, BridgeError> {
        let bytes = self.shell_bytes(cmd, timeout)?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    /// Buffered shell execution returning the raw bytes rendered as escaped
    /// ASCII text, for output that is not valid UTF-8.
    pub fn raw_shell(&self, cmd: impl Into<ShellCmd>) -> Result<String, BridgeError> {
        let bytes = self.shell_bytes(cmd, self.config.shell_timeout)?;
        Ok(bytes.escape_ascii().to_string())
    }

    fn shell_bytes(
        &self,
        cmd: impl Into<ShellCmd>,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, BridgeError> {
        let formatted = cmd.into().format();
        debug!(trace_id = %self.trace_id, command = %formatted, "adb shell");
        self.device()?
            .shell(&formatted, timeout)
            .map_err(|err| self.command_error(err))
    }

    /// Streaming execution. The handler receives the live stream and owns it
    /// for its whole scope; the connection is released when the stream drops,
    /// on success and error paths alike. The handler must read to
    /// end-of-stream itself, there is no maximum read size.
    pub fn shell_streaming<T>(
        &self,
        cmd: impl Into<ShellCmd>,
        timeout: Option<Duration>,
        handler: impl FnOnce(Box<dyn ShellStream>) -> Result<T, BridgeError>,
    ) -> Result<T, BridgeError> {
        let formatted = cmd.into().format();
        debug!(trace_id = %self.trace_id, command = %formatted, "adb shell (streaming)");
        let stream = self
            .device()?
            .shell_stream(&formatted, timeout)
            .map_err(|err| self.command_error(err))?;
        handler(stream)
    }

    /// Live bidirectional handle to a running shell command.
    pub fn start_shell(&self, cmd: impl Into<ShellCmd>) -> Result<InteractiveShell, BridgeError> {
        let formatted = cmd.into().format();
        debug!(trace_id = %self.trace_id, command = %formatted, "adb shell (interactive)");
        let stream = self
            .device()?
            .shell_stream(&formatted, None)
            .map_err(|err| self.command_error(err))?;
        Ok(InteractiveShell {
            stream: Some(stream),
            trace_id: self.trace_id.clone(),
        })
    }

    /// Stream logcat lines. The returned iterator is infinite until the
    /// device stops emitting or the caller drops it; it is not restartable.
    /// Lines are filtered by `grep` substring when non-empty.
    pub fn logcat(
        &self,
        grep: &str,
        extra_args: &str,
        timeout: Option<Duration>,
    ) -> Result<LogcatLines, BridgeError> {
        let cmd = if extra_args.is_empty() {
            "logcat".to_string()
        } else {
            format!("logcat {extra_args}")
        };
        let stream = self
            .device()?
            .shell_stream(&ShellCmd::from(cmd).format(), timeout)
            .map_err(|err| self.command_error(err))?;
        Ok(LogcatLines {
            reader: BufReader::new(stream),
            grep: (!grep.is_empty()).then(|| grep.to_string()),
            trace_id: self.trace_id.clone(),
            done: false,
        })
    }
}

/// Handle to an in-flight interactive shell. `wait` and `communicate` are
/// deliberate stubs and never block; callers drive the stream through the
/// `Read`/`Write` impls and `poll` for liveness.
pub struct InteractiveShell {
    stream: Option<Box<dyn ShellStream>>,
    trace_id: String,
}

impl InteractiveShell {
    /// Zero-byte liveness write. A failed probe closes the handle and
    /// reports the connection down.
    pub fn poll(&mut self) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        match stream.probe() {
            Ok(()) => true,
            Err(err) => {
                error!(trace_id = %self.trace_id, error = %err, "interactive shell connection lost");
                self.kill();
                false
            }
        }
    }

    pub fn wait(&self) {
        warn!(trace_id = %self.trace_id, "InteractiveShell::wait is not implemented and returns immediately");
    }

    pub fn communicate(&self) {
        warn!(trace_id = %self.trace_id, "InteractiveShell::communicate is not implemented and returns immediately");
    }

    /// Close the connection. Safe to call more than once.
    pub fn kill(&mut self) {
        self.stream.take();
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl Read for InteractiveShell {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.as_mut() {
            Some(stream) => stream.read(buf),
            None => Ok(0),
        }
    }
}

impl Write for InteractiveShell {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.stream.as_mut() {
            Some(stream) => stream.write(buf),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "interactive shell is closed",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream.as_mut() {
            Some(stream) => stream.flush(),
            None => Ok(()),
        }
    }
}

/// Lazy line sequence over a live logcat stream. Dropping the iterator
/// releases the underlying connection; `stop` makes that explicit.
pub struct LogcatLines {
    reader: BufReader<Box<dyn ShellStream>>,
    grep: Option<String>,
    trace_id: String,
    done: bool,
}

impl LogcatLines {
    /// End the stream early and release the connection.
    pub fn stop(self) {}
}

impl Iterator for LogcatLines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while !self.done {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    self.done = true;
                }
                Ok(_) => {
                    let data = line.trim_end_matches(['\r', '\n']);
                    if let Some(grep) = &self.grep {
                        if !data.contains(grep.as_str()) {
                            continue;
                        }
                    }
                    return Some(data.to_string());
                }
                Err(err) => {
                    warn!(trace_id = %self.trace_id, error = %err, "logcat stream read failed");
                    self.done = true;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_join_with_single_spaces() {
        let cmd = ShellCmd::from(vec!["pm", "list", "packages", "-3"]);
        assert_eq!(cmd.format(), "pm list packages -3");
    }

    #[test]
    fn line_is_whitespace_normalized() {
        let cmd = ShellCmd::from("wm size;   wm density");
        assert_eq!(cmd.format(), "wm size; wm density");
    }

    #[test]
    fn owned_tokens_convert() {
        let cmd = ShellCmd::from(vec!["input".to_string(), "text".to_string(), "abc".to_string()]);
        assert_eq!(cmd.format(), "input text abc");
    }
}
