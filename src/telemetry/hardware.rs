use regex::Regex;

use crate::models::{CpuInfo, GpuInfo};

/// Total RAM from `dumpsys meminfo`, rendered as a rounded gigabyte string.
///
/// Expected values after the marker:
/// - `3,887,372K` (comma-grouped kilobytes)
/// - `1917912 kB` (plain kilobytes)
pub fn parse_total_ram(output: &str) -> Option<String> {
    let re = Regex::new(r"Total RAM:\s+(\S+)").ok()?;
    let raw = re.captures(output)?.get(1)?.as_str();
    let gigabytes = if raw.contains(',') {
        let mut parts = raw.split(',');
        let whole: f64 = parts.next()?.parse().ok()?;
        let frac: f64 = strip_unit(parts.next()?).parse().ok()?;
        (whole + frac / 1000.0).round()
    } else {
        let kilobytes: f64 = strip_unit(raw).parse().ok()?;
        (kilobytes / 1000.0 / 1000.0).round()
    };
    Some(format!("{}G", gigabytes as u64))
}

/// Data-partition capacity from `df /data`, bucketed to the marketed sizes.
/// Two column layouts exist: old builds start the row with `/data`, new
/// builds end it with the mount point.
pub fn parse_storage(output: &str) -> Option<String> {
    // Greedy prefixes keep the captures on the last /data row and on its
    // size column rather than the device path.
    let raw = Regex::new(r"(?s).*/data\s+(\S+)")
        .ok()?
        .captures(output)
        .map(|caps| caps[1].to_string())
        .or_else(|| {
            Regex::new(r"(?s).*\s(\S+)\s+\S+\s+\S+\s+\S+\s+/data")
                .ok()?
                .captures(output)
                .map(|caps| caps[1].to_string())
        })?;
    let gigabytes = if let Some(value) = raw.strip_suffix('G') {
        value.parse::<f64>().ok()?.round()
    } else if let Some(value) = raw.strip_suffix('M') {
        (value.parse::<f64>().ok()? / 1000.0).round()
    } else {
        (raw.parse::<f64>().ok()? / 1000.0 / 1000.0).round()
    };
    let bucket = if gigabytes > 64.0 {
        "128G"
    } else if gigabytes > 32.0 {
        "64G"
    } else if gigabytes > 16.0 {
        "32G"
    } else if gigabytes > 8.0 {
        "16G"
    } else {
        "8G"
    };
    Some(bucket.to_string())
}

/// Core count and chip name from `/proc/cpuinfo`. The name comes from the
/// `Hardware` line when present, else the legacy `Processor` line.
pub fn parse_cpuinfo(output: &str) -> Option<CpuInfo> {
    let cpu_num = output.matches("processor").count() as u32;
    let name_re = Regex::new(r"Hardware\s+:\s+(\w.*)").ok()?;
    let caps = name_re.captures(output).or_else(|| {
        Regex::new(r"Processor\s+:\s+(\w.*)")
            .ok()
            .and_then(|re| re.captures(output))
    })?;
    Some(CpuInfo {
        cpu_num,
        cpu_name: caps[1].replace('\r', ""),
    })
}

/// cpu0 `cpuinfo_max_freq` sysfs value (kHz), rendered in gigahertz.
pub fn parse_cpu_freq(output: &str) -> Option<String> {
    let khz: f64 = output.trim().parse().ok()?;
    let ghz = (khz / 1000.0 / 1000.0 * 10.0).round() / 10.0;
    Some(format!("{ghz:.1}GHz"))
}

/// GPU model and OpenGL version from the `GLES:` line of
/// `dumpsys SurfaceFlinger`.
///
/// Expected line:
/// - `GLES: Qualcomm, Adreno (TM) 640, OpenGL ES 3.2 V@0415.0 (GIT@...)`
pub fn parse_gpu(output: &str) -> Option<GpuInfo> {
    let re = Regex::new(r"GLES:\s+(.*)").ok()?;
    let line = re.captures(output)?.get(1)?.as_str();
    let parts: Vec<&str> = line.split(',').collect();
    let gpu_model = parts.get(1)?.trim().to_string();
    let opengl = parts
        .get(2)
        .and_then(|segment| {
            let re = Regex::new(r"(\S+\s+\S+\s+\S+)").ok()?;
            re.captures(segment).map(|caps| caps[1].to_string())
        })
        .unwrap_or_default();
    Some(GpuInfo { gpu_model, opengl })
}

fn strip_unit(value: &str) -> &str {
    value.trim_end_matches(|c: char| !c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_grouped_total_ram() {
        let output = "Total RAM: 3,887,372K (status moderate)\n Free RAM: 1,500,000K\n";
        assert_eq!(parse_total_ram(output).as_deref(), Some("4G"));
    }

    #[test]
    fn parses_plain_total_ram() {
        let output = "Total RAM: 1917912 kB\n";
        assert_eq!(parse_total_ram(output).as_deref(), Some("2G"));
    }

    #[test]
    fn parses_storage_old_layout() {
        let output = "Filesystem               Size     Used     Free   Blksize\n/data                   57.0G    20.1G    36.9G   4096\n";
        assert_eq!(parse_storage(output).as_deref(), Some("64G"));
    }

    #[test]
    fn parses_storage_new_layout() {
        let output = "Filesystem     1K-blocks     Used Available Use% Mounted on\n/dev/block/dm-5 57086652 20000000  37086652  36% /data\n";
        assert_eq!(parse_storage(output).as_deref(), Some("64G"));
    }

    #[test]
    fn storage_buckets_small_devices() {
        let output = "Filesystem   Size  Used  Free  Blksize\n/data        12.5G 4.0G  8.5G  4096\n";
        assert_eq!(parse_storage(output).as_deref(), Some("16G"));
    }

    #[test]
    fn parses_cpuinfo_with_hardware_line() {
        let output = "Processor\t: AArch64 Processor rev 12 (aarch64)\nprocessor\t: 0\nprocessor\t: 1\nprocessor\t: 2\nprocessor\t: 3\nHardware\t: Qualcomm Technologies, Inc SM8150\n";
        let info = parse_cpuinfo(output).expect("cpu info");
        assert_eq!(info.cpu_num, 4);
        assert_eq!(info.cpu_name, "Qualcomm Technologies, Inc SM8150");
    }

    #[test]
    fn parses_cpuinfo_with_legacy_processor_line() {
        let output = "Processor\t: ARMv7 Processor rev 0 (v7l)\nprocessor\t: 0\nprocessor\t: 1\n";
        let info = parse_cpuinfo(output).expect("cpu info");
        assert_eq!(info.cpu_num, 2);
        assert_eq!(info.cpu_name, "ARMv7 Processor rev 0 (v7l)");
    }

    #[test]
    fn parses_cpu_freq() {
        assert_eq!(parse_cpu_freq("2803200\n").as_deref(), Some("2.8GHz"));
        assert_eq!(parse_cpu_freq("1958400").as_deref(), Some("2.0GHz"));
        assert_eq!(parse_cpu_freq("not a number"), None);
    }

    #[test]
    fn parses_gles_line() {
        let output = "GLES: Qualcomm, Adreno (TM) 640, OpenGL ES 3.2 V@0415.0 (GIT@aabbcc, I1234)\n";
        let gpu = parse_gpu(output).expect("gpu info");
        assert_eq!(gpu.gpu_model, "Adreno (TM) 640");
        assert_eq!(gpu.opengl, "OpenGL ES 3.2");
    }

    #[test]
    fn gpu_absent_without_gles_line() {
        assert_eq!(parse_gpu("nothing rendered here"), None);
    }
}
