use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceSummary {
    pub serial: String,
    pub state: String,
}

/// Raw display dimensions and density factor, straight off the device frame.
/// No orientation correction is applied; width may exceed height.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayGeometry {
    pub width: u32,
    pub height: u32,
    /// `-1.0` when no density source matched.
    pub density: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayInfo {
    pub width: u32,
    pub height: u32,
    pub density: f64,
    /// 0 to 3, quarter turns.
    pub orientation: u8,
    /// `orientation * 90` degrees.
    pub rotation: u16,
    pub max_x: Option<u32>,
    pub max_y: Option<u32>,
    /// Present only after the active-resolution override path detected a
    /// `cur=WxH` marker; holds the pre-override dimensions.
    pub physical_width: Option<u32>,
    pub physical_height: Option<u32>,
}

/// Application window area within the screen, in portrait-normalized axes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowViewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub offset_width: f64,
    pub offset_height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CpuInfo {
    pub cpu_num: u32,
    pub cpu_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GpuInfo {
    pub gpu_model: String,
    pub opengl: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopActivity {
    pub package: String,
    pub activity: String,
    pub pid: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForwardMapping {
    pub serial: String,
    pub local: String,
    pub remote: String,
}

/// Aggregate telemetry report. Built fresh on every call; a field is `None`
/// when its extractor failed, and one failing field never clears the rest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceInfoReport {
    pub platform: String,
    pub serial: String,
    pub memory: Option<String>,
    pub storage: Option<String>,
    pub display: Option<DisplayGeometry>,
    pub cpuinfo: Option<CpuInfo>,
    pub cpufreq: Option<String>,
    pub cpuabi: Option<String>,
    pub sdkversion: Option<u32>,
    pub gpu: Option<GpuInfo>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
}

impl DeviceInfoReport {
    pub fn empty(serial: impl Into<String>) -> Self {
        Self {
            platform: "Android".to_string(),
            serial: serial.into(),
            memory: None,
            storage: None,
            display: None,
            cpuinfo: None,
            cpufreq: None,
            cpuabi: None,
            sdkversion: None,
            gpu: None,
            model: None,
            manufacturer: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_failed_fields_as_null() {
        let mut report = DeviceInfoReport::empty("SERIAL1");
        report.memory = Some("4G".to_string());
        let json = serde_json::to_value(&report).expect("serializable report");
        assert_eq!(json["platform"], "Android");
        assert_eq!(json["memory"], "4G");
        assert!(json["cpuinfo"].is_null());
    }
}
