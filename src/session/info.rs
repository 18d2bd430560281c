use std::net::Ipv4Addr;

use tracing::warn;

use crate::error::BridgeError;
use crate::models::{DeviceInfoReport, DisplayGeometry, DisplayInfo, WindowViewport};
use crate::session::Session;
use crate::telemetry::display::{
    parse_cur_resolution, parse_display_width_height, parse_max_xy,
    parse_physical_display_info, parse_restricted_screen, parse_unrestricted_screen,
    parse_wm_size_density,
};
use crate::telemetry::hardware::{
    parse_cpu_freq, parse_cpuinfo, parse_gpu, parse_storage, parse_total_ram,
};
use crate::telemetry::net::{
    derive_gateway, parse_ifconfig, parse_ip, parse_ip_addr_show, parse_netcfg_ip,
    parse_subnet_mask_len,
};
use crate::telemetry::window::{
    compute_viewport, parse_focused_package, parse_input_orientation,
    parse_surface_flinger_orientation, parse_window_frames,
};

/// Mask length assumed when no source can tell; approximate, not
/// authoritative.
const DEFAULT_SUBNET_MASK_LEN: u8 = 17;

type GeometryStrategy = fn(&Session) -> Result<Option<DisplayGeometry>, BridgeError>;

/// Display geometry sources, newest first. Each strategy either yields both
/// width and height or passes; the first hit wins.
const GEOMETRY_STRATEGIES: [GeometryStrategy; 4] = [
    Session::geometry_from_wm_api,
    Session::geometry_from_dumpsys_display,
    Session::geometry_from_dumpsys_window,
    Session::geometry_from_wm_text,
];

impl Session {
    /// Cached display info. The mutex spans the whole check-compute-store
    /// sequence, so concurrent readers either see the stored value or block
    /// until the single in-flight computation finishes.
    pub fn display_info(&self) -> Result<DisplayInfo, BridgeError> {
        let mut cache = self.display_info.lock().map_err(|_| self.lock_poisoned())?;
        if let Some(info) = cache.as_ref() {
            return Ok(info.clone());
        }
        let info = self.get_display_info()?;
        *cache = Some(info.clone());
        Ok(info)
    }

    /// Fresh display info: raw geometry plus orientation, rotation and max
    /// touch coordinates. No orientation correction is applied to the
    /// dimensions.
    pub fn get_display_info(&self) -> Result<DisplayInfo, BridgeError> {
        let geometry = self.physical_display_info()?;
        let orientation = self.display_orientation()?;
        let (max_x, max_y) = self.max_xy()?;
        Ok(DisplayInfo {
            width: geometry.width,
            height: geometry.height,
            density: geometry.density,
            orientation,
            rotation: u16::from(orientation) * 90,
            max_x,
            max_y,
            physical_width: None,
            physical_height: None,
        })
    }

    pub fn physical_display_info(&self) -> Result<DisplayGeometry, BridgeError> {
        for strategy in GEOMETRY_STRATEGIES {
            if let Some(geometry) = strategy(self)? {
                return Ok(geometry);
            }
        }
        Err(BridgeError::parse_inference(
            "no display geometry source matched",
            &self.trace_id,
        ))
    }

    fn geometry_from_wm_api(&self) -> Result<Option<DisplayGeometry>, BridgeError> {
        let device = self.device()?;
        let Some((width, height)) = device.wm_size().map_err(|err| self.command_error(err))?
        else {
            return Ok(None);
        };
        let density = device
            .wm_density()
            .map_err(|err| self.command_error(err))?
            .unwrap_or(-1.0);
        Ok(Some(DisplayGeometry {
            width,
            height,
            density,
        }))
    }

    fn geometry_from_dumpsys_display(&self) -> Result<Option<DisplayGeometry>, BridgeError> {
        let output = self.shell("dumpsys display")?;
        Ok(parse_physical_display_info(&output).map(|(width, height, density)| {
            DisplayGeometry {
                width,
                height,
                density,
            }
        }))
    }

    fn geometry_from_dumpsys_window(&self) -> Result<Option<DisplayGeometry>, BridgeError> {
        let output = self.shell("dumpsys window")?;
        let Some((width, height)) =
            parse_unrestricted_screen(&output).or_else(|| parse_display_width_height(&output))
        else {
            return Ok(None);
        };
        // Density is not part of the window dump; query it separately and
        // fall back to the unknown sentinel.
        let density = self
            .device()?
            .wm_density()
            .map_err(|err| self.command_error(err))?
            .unwrap_or(-1.0);
        Ok(Some(DisplayGeometry {
            width,
            height,
            density,
        }))
    }

    fn geometry_from_wm_text(&self) -> Result<Option<DisplayGeometry>, BridgeError> {
        let output = self.shell("wm size; wm density")?;
        Ok(parse_wm_size_density(&output).map(|(width, height, density)| DisplayGeometry {
            width,
            height,
            density,
        }))
    }

    /// Effective screen resolution without black border or virtual keys.
    pub fn restricted_screen(&self) -> Result<Option<(u32, u32)>, BridgeError> {
        let output = self.shell("dumpsys window")?;
        Ok(parse_restricted_screen(&output))
    }

    /// Orientation is best-effort: when neither marker generation matches,
    /// the answer is 0 with a logged warning, never an error.
    pub fn display_orientation(&self) -> Result<u8, BridgeError> {
        let output = self.shell("dumpsys SurfaceFlinger")?;
        if let Some(orientation) = parse_surface_flinger_orientation(&output) {
            return Ok(orientation);
        }
        let output = self.shell("dumpsys input")?;
        if let Some(orientation) = parse_input_orientation(&output) {
            return Ok(orientation);
        }
        warn!(trace_id = %self.trace_id, "could not obtain display orientation, assuming 0");
        Ok(0)
    }

    pub fn max_xy(&self) -> Result<(Option<u32>, Option<u32>), BridgeError> {
        let output = self.shell("getevent -p")?;
        Ok(parse_max_xy(&output))
    }

    /// Opt-in correction for devices whose resolution was modified (some
    /// Samsung and Huawei models). When a `cur=WxH` marker exists, the
    /// normalized values replace width/height and the previous dimensions
    /// move to `physical_width`/`physical_height`. Not applied by the
    /// default geometry path.
    pub fn update_cur_display(&self, mut info: DisplayInfo) -> Result<DisplayInfo, BridgeError> {
        let output = self.shell("dumpsys window displays")?;
        if let Some((width, height)) = parse_cur_resolution(&output) {
            info.physical_width = Some(info.width);
            info.physical_height = Some(info.height);
            info.width = width;
            info.height = height;
        }
        Ok(info)
    }

    /// Application window area of the current foreground package. Falls back
    /// to the full screen when the package or its frames cannot be found.
    pub fn display_of_all_screen(
        &self,
        info: &DisplayInfo,
    ) -> Result<WindowViewport, BridgeError> {
        let output = self.shell("dumpsys window windows")?;
        let package = self.search_for_current_package(&output);
        let mut viewport = WindowViewport {
            offset_x: 0.0,
            offset_y: 0.0,
            offset_width: f64::from(info.width),
            offset_height: f64::from(info.height),
        };
        if !package.is_empty() {
            let marker = format!("package={package}");
            for window in output.split("Window #") {
                if !window.contains(&marker) {
                    continue;
                }
                if let Some(frames) = parse_window_frames(window) {
                    viewport = compute_viewport(frames, info.orientation);
                }
            }
        }
        Ok(viewport)
    }

    /// Foreground package from a `dumpsys window windows` dump, falling back
    /// to the transport's top-activity query. Never fails; an undetectable
    /// package is an empty string.
    pub fn search_for_current_package(&self, dump: &str) -> String {
        if let Some(package) = parse_focused_package(dump) {
            return package;
        }
        match self.top_activity() {
            Ok(top) => top.package,
            Err(err) => {
                warn!(trace_id = %self.trace_id, error = %err, "cannot get current top activity");
                String::new()
            }
        }
    }

    /// Device IP on one interface, across four output-format generations.
    /// Command-level failures inside a strategy count as a miss for that
    /// strategy only.
    pub fn ip_address_from_interface(
        &self,
        interface: &str,
    ) -> Result<Option<String>, BridgeError> {
        let output = self.shell_or_empty(&format!("ip -f inet addr show {interface}"))?;
        if let Some(ip) = parse_ip_addr_show(&output) {
            return Ok(Some(ip));
        }
        let output = self.shell_or_empty("ifconfig")?;
        if let Some(ip) = parse_ifconfig(interface, &output) {
            return Ok(Some(ip));
        }
        let output = self.shell_or_empty("netcfg")?;
        if let Some(ip) = parse_netcfg_ip(interface, &output) {
            return Ok(Some(ip));
        }
        let output = self.shell_or_empty(&format!("getprop dhcp.{interface}.ipaddress"))?;
        Ok(parse_ip(&output))
    }

    /// First routable address across the usual interfaces. Loopback,
    /// carrier-NAT and link-local prefixes are skipped.
    pub fn ip_address(&self) -> Result<Option<String>, BridgeError> {
        for interface in ["eth0", "eth1", "wlan0"] {
            if let Some(ip) = self.ip_address_from_interface(interface)? {
                if !ip.starts_with("172.") && !ip.starts_with("127.") && !ip.starts_with("169.") {
                    return Ok(Some(ip));
                }
            }
        }
        Ok(None)
    }

    /// Gateway address: the DHCP property when present, otherwise the lowest
    /// host address of the device's own subnet. The fallback is a heuristic
    /// approximation and must not be treated as routing truth.
    pub fn gateway_address(&self) -> Result<Option<String>, BridgeError> {
        let output = self.shell_or_empty("getprop dhcp.wlan0.gateway")?;
        if let Some(gateway) = parse_ip(&output) {
            return Ok(Some(gateway));
        }
        let Some(ip) = self.ip_address()? else {
            return Ok(None);
        };
        let Ok(addr) = ip.parse::<Ipv4Addr>() else {
            return Ok(None);
        };
        let mask_len = self.subnet_mask_len()?;
        Ok(Some(derive_gateway(addr, mask_len).to_string()))
    }

    /// Mask length of the wlan0 subnet, defaulting to 17 with a warning when
    /// undetectable. Callers must treat the default as approximate.
    pub fn subnet_mask_len(&self) -> Result<u8, BridgeError> {
        let output = self.shell_or_empty("netcfg")?;
        if let Some(len) = parse_subnet_mask_len(&output) {
            return Ok(len);
        }
        warn!(
            trace_id = %self.trace_id,
            "failed to get subnet mask length, using {DEFAULT_SUBNET_MASK_LEN} as default"
        );
        Ok(DEFAULT_SUBNET_MASK_LEN)
    }

    pub fn memory(&self) -> Result<String, BridgeError> {
        let output = self.shell("dumpsys meminfo")?;
        parse_total_ram(&output).ok_or_else(|| {
            BridgeError::parse_inference("total RAM not found in dumpsys meminfo", &self.trace_id)
        })
    }

    pub fn storage(&self) -> Result<String, BridgeError> {
        let output = self.shell("df /data")?;
        parse_storage(&output).ok_or_else(|| {
            BridgeError::parse_inference("data partition size not found", &self.trace_id)
        })
    }

    pub fn cpuinfo(&self) -> Result<crate::models::CpuInfo, BridgeError> {
        let output = self.shell("cat /proc/cpuinfo")?;
        parse_cpuinfo(output.trim()).ok_or_else(|| {
            BridgeError::parse_inference("cpu name not found in /proc/cpuinfo", &self.trace_id)
        })
    }

    pub fn cpu_freq(&self) -> Result<String, BridgeError> {
        let output =
            self.shell("cat /sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq")?;
        parse_cpu_freq(&output).ok_or_else(|| {
            BridgeError::parse_inference("cpu max frequency unreadable", &self.trace_id)
        })
    }

    pub fn cpu_abi(&self) -> Result<String, BridgeError> {
        Ok(self.shell("getprop ro.product.cpu.abi")?.trim().to_string())
    }

    pub fn gpu(&self) -> Result<crate::models::GpuInfo, BridgeError> {
        let output = self.shell("dumpsys SurfaceFlinger")?;
        parse_gpu(&output).ok_or_else(|| {
            BridgeError::parse_inference("GLES line not found in SurfaceFlinger dump", &self.trace_id)
        })
    }

    pub fn model(&self) -> Result<String, BridgeError> {
        self.getprop("ro.product.model")
    }

    pub fn manufacturer(&self) -> Result<String, BridgeError> {
        self.getprop("ro.product.manufacturer")
    }

    /// Aggregate telemetry report. Every extractor runs independently; a
    /// failing field is reported as `None` and never aborts the rest. Built
    /// fresh on each call.
    pub fn device_info(&self) -> DeviceInfoReport {
        let serial = self.serial().unwrap_or_default();
        let mut report = DeviceInfoReport::empty(serial);
        report.memory = self.report_field("memory", Self::memory);
        report.storage = self.report_field("storage", Self::storage);
        report.display = self.report_field("display", Self::physical_display_info);
        report.cpuinfo = self.report_field("cpuinfo", Self::cpuinfo);
        report.cpufreq = self.report_field("cpufreq", Self::cpu_freq);
        report.cpuabi = self.report_field("cpuabi", Self::cpu_abi);
        report.sdkversion = self.report_field("sdkversion", Self::sdk_version);
        report.gpu = self.report_field("gpu", Self::gpu);
        report.model = self.report_field("model", Self::model);
        report.manufacturer = self.report_field("manufacturer", Self::manufacturer);
        report
    }

    fn report_field<T>(
        &self,
        field: &'static str,
        extract: impl FnOnce(&Self) -> Result<T, BridgeError>,
    ) -> Option<T> {
        match extract(self) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(trace_id = %self.trace_id, field, error = %err, "device info field unavailable");
                None
            }
        }
    }
}
