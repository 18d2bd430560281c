use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::BridgeError;
use crate::models::{DeviceSummary, DisplayInfo, TopActivity};
use crate::telemetry::window::parse_keyboard_shown;
use crate::transport::{DeviceHandle, Transport, TransportError};

mod forward;
mod info;
mod registry;
mod shell;


pub use forward::{DevicePortSpec, FORWARD_PORT_MAX, FORWARD_PORT_MIN};
pub use registry::SessionRegistry;
pub use shell::{InteractiveShell, LogcatLines, ShellCmd};

pub const STATUS_DEVICE: &str = "device";
pub const STATUS_OFFLINE: &str = "offline";

/// First SDK whose shell output drops the carriage-return prefix.
pub const SDK_VERSION_ANDROID7: u32 = 24;

/// Bound handle to one target device plus its lazily computed caches.
///
/// One caller thread per session for command work; the display-info cache is
/// the only state deliberately guarded for concurrent readers. Concurrent
/// commands on the same session must be serialized by the caller or routed
/// through separate sessions.
pub struct Session {
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    trace_id: String,
    serial: Mutex<Option<String>>,
    device: Mutex<Option<Arc<dyn DeviceHandle>>>,
    sdk_version: Mutex<Option<u32>>,
    line_breaker: Mutex<Option<&'static [u8]>>,
    display_info: Mutex<Option<DisplayInfo>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("trace_id", &self.trace_id)
            .field("serial", &self.serial)
            .field("sdk_version", &self.sdk_version)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Unbound session; call `connect` to resolve a device.
    pub fn new(transport: Arc<dyn Transport>, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            trace_id: Uuid::new_v4().to_string(),
            serial: Mutex::new(None),
            device: Mutex::new(None),
            sdk_version: Mutex::new(None),
            line_breaker: Mutex::new(None),
            display_info: Mutex::new(None),
        }
    }

    /// Create a session and bind it to `serial` in one step.
    pub fn open(
        transport: Arc<dyn Transport>,
        serial: &str,
        config: SessionConfig,
    ) -> Result<Self, BridgeError> {
        let session = Self::new(transport, config);
        session.connect(Some(serial))?;
        Ok(session)
    }

    /// Resolve a device handle. Passing a serial different from the bound one
    /// replaces the handle in place; passing `None` reconnects to the last
    /// known serial.
    pub fn connect(&self, serial: Option<&str>) -> Result<(), BridgeError> {
        let target = match serial {
            Some(value) => value.to_string(),
            None => self
                .serial
                .lock()
                .map_err(|_| self.lock_poisoned())?
                .clone()
                .ok_or_else(|| {
                    BridgeError::connectivity("no device serial specified", &self.trace_id)
                })?,
        };
        let handle = self.transport.open_device(&target).map_err(|err| match err {
            TransportError::NotFound(_) => BridgeError::connectivity(
                format!("no device found for [{target}]"),
                &self.trace_id,
            ),
            other => BridgeError::connectivity(
                format!("device connect failed: {other}"),
                &self.trace_id,
            ),
        })?;
        debug!(trace_id = %self.trace_id, serial = %target, "device connected");
        *self.device.lock().map_err(|_| self.lock_poisoned())? = Some(Arc::from(handle));
        *self.serial.lock().map_err(|_| self.lock_poisoned())? = Some(target);
        Ok(())
    }

    /// Release the device handle. The session is never implicitly
    /// reconnected afterwards.
    pub fn disconnect(&self) {
        if let Ok(mut guard) = self.device.lock() {
            guard.take();
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn serial(&self) -> Result<String, BridgeError> {
        self.serial
            .lock()
            .map_err(|_| self.lock_poisoned())?
            .clone()
            .ok_or_else(|| BridgeError::connectivity("session is not connected", &self.trace_id))
    }

    pub fn devices(&self) -> Result<Vec<DeviceSummary>, BridgeError> {
        self.transport.devices().map_err(|err| {
            BridgeError::connectivity(format!("device listing failed: {err}"), &self.trace_id)
        })
    }

    pub fn status(&self) -> Result<String, BridgeError> {
        self.device()?
            .state()
            .map_err(|err| self.command_error(err))
    }

    /// Poll once per second until any device appears.
    pub fn wait_for_device(&self, timeout_secs: u64) -> Result<(), BridgeError> {
        let mut remaining = timeout_secs;
        while remaining > 0 {
            if !self.devices()?.is_empty() {
                return Ok(());
            }
            remaining -= 1;
            thread::sleep(Duration::from_secs(1));
        }
        Err(BridgeError::connectivity("device not ready", &self.trace_id))
    }

    pub fn properties(&self) -> Result<HashMap<String, String>, BridgeError> {
        self.device()?
            .properties()
            .map_err(|err| self.command_error(err))
    }

    pub fn getprop(&self, key: &str) -> Result<String, BridgeError> {
        self.properties()?.get(key).cloned().ok_or_else(|| {
            BridgeError::parse_inference(format!("property {key} is not set"), &self.trace_id)
        })
    }

    /// SDK version, fetched at most once per session. Up to three attempts
    /// before the miss propagates; only a success is cached.
    pub fn sdk_version(&self) -> Result<u32, BridgeError> {
        let mut cache = self.sdk_version.lock().map_err(|_| self.lock_poisoned())?;
        if let Some(version) = *cache {
            return Ok(version);
        }
        let mut last_err = None;
        for _ in 0..3 {
            match self.fetch_sdk_version() {
                Ok(version) => {
                    *cache = Some(version);
                    return Ok(version);
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            BridgeError::command("sdk version unavailable", &self.trace_id)
        }))
    }

    fn fetch_sdk_version(&self) -> Result<u32, BridgeError> {
        let raw = self.getprop("ro.build.version.sdk")?;
        raw.trim().parse().map_err(|_| {
            BridgeError::parse_inference(
                format!("unexpected sdk version value: {raw:?}"),
                &self.trace_id,
            )
        })
    }

    /// Line terminator of this device's shell output. Devices below
    /// `SDK_VERSION_ANDROID7` prefix a carriage return; this quirk is real
    /// and must be preserved.
    pub fn line_breaker(&self) -> Result<&'static [u8], BridgeError> {
        {
            let cache = self.line_breaker.lock().map_err(|_| self.lock_poisoned())?;
            if let Some(breaker) = *cache {
                return Ok(breaker);
            }
        }
        let breaker: &'static [u8] = if self.sdk_version()? >= SDK_VERSION_ANDROID7 {
            b"\n"
        } else {
            b"\r\n"
        };
        *self.line_breaker.lock().map_err(|_| self.lock_poisoned())? = Some(breaker);
        Ok(breaker)
    }

    pub fn push(&self, local: &Path, remote: &str) -> Result<(), BridgeError> {
        self.device()?
            .push(local, remote)
            .map_err(|err| self.command_error(err))
    }

    pub fn pull(&self, remote: &str, local: &Path) -> Result<(), BridgeError> {
        self.device()?
            .pull(remote, local)
            .map_err(|err| self.command_error(err))
    }

    /// Absence is a normal `false`, not an error; only non-command failures
    /// (connectivity) propagate.
    pub fn exists_file(&self, filepath: &str) -> Result<bool, BridgeError> {
        match self.shell(vec!["ls", filepath]) {
            Ok(output) => Ok(!output.contains("No such file or directory")),
            Err(err) if err.is_command() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Size column of `ls -l`; a missing file surfaces as an error here.
    pub fn file_size(&self, filepath: &str) -> Result<u64, BridgeError> {
        let output = self.shell(vec!["ls", "-l", filepath])?;
        output
            .split_whitespace()
            .nth(4)
            .and_then(|field| field.parse().ok())
            .ok_or_else(|| {
                BridgeError::parse_inference(
                    format!("unable to read size of {filepath}"),
                    &self.trace_id,
                )
            })
    }

    pub fn install_app(&self, filepath: &Path, replace: bool) -> Result<(), BridgeError> {
        if !filepath.is_file() {
            return Err(BridgeError::config(
                format!("install source does not exist: {}", filepath.display()),
                &self.trace_id,
            ));
        }
        self.device()?.install(filepath, replace).map_err(|err| {
            BridgeError::command(format!("installation failure: {err}"), &self.trace_id)
        })
    }

    pub fn uninstall_app(&self, package: &str) -> Result<(), BridgeError> {
        self.device()?
            .uninstall(package)
            .map_err(|err| self.command_error(err))
    }

    pub fn list_app(&self, third_only: bool) -> Result<Vec<String>, BridgeError> {
        let mut cmd = vec!["pm", "list", "packages"];
        if third_only {
            cmd.push("-3");
        }
        let output = self.shell(cmd)?;
        Ok(output
            .lines()
            .filter_map(|line| line.trim().split_once(':'))
            .map(|(_, package)| package.to_string())
            .collect())
    }

    /// Path to the installed package. A command failure is folded into the
    /// no-marker case; the absence of a `package:` marker is the error.
    pub fn path_app(&self, package: &str) -> Result<String, BridgeError> {
        let output = match self.shell(vec!["pm", "path", package]) {
            Ok(output) => output,
            Err(err) if err.is_command() => String::new(),
            Err(err) => return Err(err),
        };
        match output.split_once("package:") {
            Some((_, tail)) => Ok(tail.trim().to_string()),
            None => Err(BridgeError::parse_inference(
                format!("package not found, output:[{output}]"),
                &self.trace_id,
            )),
        }
    }

    pub fn check_app(&self, package: &str) -> Result<bool, BridgeError> {
        let output = self.shell(vec!["dumpsys", "package", package])?;
        let re = Regex::new(&format!(r"Package\s+\[{}\]", regex::escape(package)))
            .map_err(|err| BridgeError::config(format!("bad package name: {err}"), &self.trace_id))?;
        if re.is_match(&output) {
            Ok(true)
        } else {
            Err(BridgeError::parse_inference(
                format!("package \"{package}\" not found"),
                &self.trace_id,
            ))
        }
    }

    /// Launch an app through the monkey launcher shortcut, or a specific
    /// activity via `am start`.
    pub fn start_app(&self, package: &str, activity: Option<&str>) -> Result<(), BridgeError> {
        match activity {
            None => self.shell(vec![
                "monkey",
                "-p",
                package,
                "-c",
                "android.intent.category.LAUNCHER",
                "1",
            ])?,
            Some(activity) => self.shell(vec![
                "am".to_string(),
                "start".to_string(),
                "-n".to_string(),
                format!("{package}/{package}.{activity}"),
            ])?,
        };
        Ok(())
    }

    /// Cold-start the activity and return the reported launch time in
    /// milliseconds.
    pub fn start_app_timing(&self, package: &str, activity: &str) -> Result<u32, BridgeError> {
        let output = self.shell(vec![
            "am".to_string(),
            "start".to_string(),
            "-S".to_string(),
            "-W".to_string(),
            format!("{package}/{activity}"),
            "-c".to_string(),
            "android.intent.category.LAUNCHER".to_string(),
            "-a".to_string(),
            "android.intent.action.MAIN".to_string(),
        ])?;
        let ok = Regex::new(r"Status:\s*ok")
            .map(|re| re.is_match(&output))
            .unwrap_or(false);
        if !ok {
            return Err(BridgeError::command(
                format!("starting app {package}/{activity} failed"),
                &self.trace_id,
            ));
        }
        Ok(Regex::new(r"TotalTime:\s*(\d+)")
            .ok()
            .and_then(|re| re.captures(&output))
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(0))
    }

    pub fn stop_app(&self, package: &str) -> Result<(), BridgeError> {
        self.shell(vec!["am", "force-stop", package])?;
        Ok(())
    }

    pub fn clear_app(&self, package: &str) -> Result<(), BridgeError> {
        self.shell(vec!["pm", "clear", package])?;
        Ok(())
    }

    /// `versionCode` of the installed package, `None` when the dump carries
    /// no version marker.
    pub fn package_version(&self, package: &str) -> Result<Option<u64>, BridgeError> {
        let output = self.shell(vec!["dumpsys", "package", package])?;
        Ok(Regex::new(r"versionCode=(\d+)")
            .ok()
            .and_then(|re| re.captures(&output))
            .and_then(|caps| caps[1].parse().ok()))
    }

    pub fn keyevent(&self, key_name: &str) -> Result<(), BridgeError> {
        self.device()?
            .input_keyevent(&key_name.to_uppercase())
            .map_err(|err| self.command_error(err))
    }

    pub fn touch(&self, point: (u32, u32)) -> Result<(), BridgeError> {
        let (x, y) = point;
        self.device()?
            .input_tap(x, y)
            .map_err(|err| self.command_error(err))
    }

    pub fn swipe(
        &self,
        from: (u32, u32),
        to: (u32, u32),
        duration_ms: u32,
    ) -> Result<(), BridgeError> {
        let (x0, y0) = from;
        let (x1, y1) = to;
        self.device()?
            .input_swipe(x0, y0, x1, y1, duration_ms)
            .map_err(|err| self.command_error(err))
    }

    /// Type text. Purely alphabetic content goes through one `input text`
    /// call; mixed content falls back to one keyevent per character, since
    /// `input text` can reorder mixed alphanumeric input on some devices.
    pub fn text(&self, content: &str) -> Result<(), BridgeError> {
        if !content.is_empty() && content.chars().all(char::is_alphabetic) {
            self.shell(vec!["input".to_string(), "text".to_string(), content.to_string()])?;
        } else {
            for ch in content.chars() {
                self.shell(vec![
                    "input".to_string(),
                    "keyevent".to_string(),
                    format!("KEYCODE_{}", ch.to_uppercase()),
                ])?;
            }
        }
        Ok(())
    }

    /// Best-effort unlock via MENU then BACK. Might not work on all devices.
    pub fn unlock(&self) -> Result<(), BridgeError> {
        self.shell("input keyevent MENU")?;
        self.shell("input keyevent BACK")?;
        Ok(())
    }

    /// Screenshot of the device display as raw screencap bytes.
    pub fn snapshot(&self) -> Result<Vec<u8>, BridgeError> {
        self.device()?
            .screencap()
            .map_err(|err| self.command_error(err))
    }

    pub fn top_activity(&self) -> Result<TopActivity, BridgeError> {
        self.device()?
            .top_activity()
            .map_err(|err| self.command_error(err))
    }

    pub fn is_keyboard_shown(&self) -> Result<bool, BridgeError> {
        let output = self.shell("dumpsys input_method")?;
        Ok(parse_keyboard_shown(&output))
    }

    /// Screen-on state; there is no safe default, so an unreadable dump is
    /// an error.
    pub fn is_screen_on(&self) -> Result<bool, BridgeError> {
        let output = self.shell("dumpsys window policy")?;
        crate::telemetry::window::parse_screen_on(&output).ok_or_else(|| {
            BridgeError::parse_inference("could not determine screen ON state", &self.trace_id)
        })
    }

    pub fn is_locked(&self) -> Result<bool, BridgeError> {
        let output = self.shell("dumpsys window policy")?;
        crate::telemetry::window::parse_lock_state(&output).ok_or_else(|| {
            BridgeError::parse_inference("could not determine screen lock state", &self.trace_id)
        })
    }

    fn device(&self) -> Result<Arc<dyn DeviceHandle>, BridgeError> {
        self.device
            .lock()
            .map_err(|_| self.lock_poisoned())?
            .clone()
            .ok_or_else(|| {
                BridgeError::connectivity(
                    "no device is connected, call connect first",
                    &self.trace_id,
                )
            })
    }

    fn command_error(&self, err: TransportError) -> BridgeError {
        match err {
            TransportError::Timeout => {
                BridgeError::timeout("adb command timed out", &self.trace_id)
            }
            other => BridgeError::command(format!("adb command failed: {other}"), &self.trace_id),
        }
    }

    /// Run a command, treating command-level failure as empty output.
    /// Used by inference chains whose strategies probe commands that may not
    /// exist on a given OS generation.
    fn shell_or_empty(&self, cmd: &str) -> Result<String, BridgeError> {
        match self.shell(cmd) {
            Ok(output) => Ok(output),
            Err(err) if err.is_command() => Ok(String::new()),
            Err(err) => Err(err),
        }
    }

    fn lock_poisoned(&self) -> BridgeError {
        BridgeError::command("session state lock poisoned", &self.trace_id)
    }
}
