use regex::Regex;

/// Parse a `dumpsys display` physical-display-info block.
///
/// Expected line:
/// - `PhysicalDisplayInfo{1440 x 2960, 60.0 fps, density 4.0, ...}`
pub fn parse_physical_display_info(output: &str) -> Option<(u32, u32, f64)> {
    let re = Regex::new(r"PhysicalDisplayInfo\{(\d+) x (\d+),.*?density ([\d.]+)").ok()?;
    let caps = re.captures(output)?;
    let width = caps[1].parse().ok()?;
    let height = caps[2].parse().ok()?;
    let density = caps[3].parse().ok()?;
    Some((width, height, density))
}

/// `dumpsys window` unrestricted-screen rectangle. This could also be
/// mSystem or mOverscanScreen on some builds.
pub fn parse_unrestricted_screen(output: &str) -> Option<(u32, u32)> {
    let re = Regex::new(r"mUnrestrictedScreen=\(\d+,\d+\) (\d+)x(\d+)").ok()?;
    let caps = re.captures(output)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Width/height-only markers, known to work on API 10 era dumps where the
/// screen rectangles are not available.
pub fn parse_display_width_height(output: &str) -> Option<(u32, u32)> {
    let re = Regex::new(r"DisplayWidth=(\d+) *DisplayHeight=(\d+)").ok()?;
    let caps = re.captures(output)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Combined `wm size; wm density` text block.
pub fn parse_wm_size_density(output: &str) -> Option<(u32, u32, f64)> {
    let re = Regex::new(r"(?s)Physical size: (\d+)x(\d+).*Physical density: (\d+)").ok()?;
    let caps = re.captures(output)?;
    Some((
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    ))
}

/// Effective resolution without black border / virtual keyboard, like
/// `mRestrictedScreen=(0,0) 720x1184`.
pub fn parse_restricted_screen(output: &str) -> Option<(u32, u32)> {
    let re = Regex::new(r"mRestrictedScreen=\(\d+,\d+\) (\d+)x(\d+)").ok()?;
    let caps = re.captures(output)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Modified-resolution marker from `dumpsys window displays`. Vendors are
/// inconsistent about axis order in `cur=WxH`, so the smaller number is
/// returned first and callers treat it as width.
pub fn parse_cur_resolution(output: &str) -> Option<(u32, u32)> {
    let re = Regex::new(r"cur=(\d+)x(\d+)").ok()?;
    let caps = re.captures(output)?;
    let a: u32 = caps[1].parse().ok()?;
    let b: u32 = caps[2].parse().ok()?;
    Some((a.min(b), a.max(b)))
}

/// Maximum touch coordinates from a `getevent -p` capability dump. Axis
/// 0035 carries x, 0036 carries y; either may be absent.
pub fn parse_max_xy(output: &str) -> (Option<u32>, Option<u32>) {
    let max_re = match Regex::new(r"max (\d+)") {
        Ok(re) => re,
        Err(_) => return (None, None),
    };
    let mut max_x = None;
    let mut max_y = None;
    for line in output.lines() {
        if line.contains("0035") {
            if let Some(caps) = max_re.captures(line) {
                max_x = caps[1].parse().ok();
            }
        }
        if line.contains("0036") {
            if let Some(caps) = max_re.captures(line) {
                max_y = caps[1].parse().ok();
            }
        }
    }
    (max_x, max_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_physical_display_info_block() {
        let output = "Display Devices: size=1\n  DisplayDeviceInfo{\"Built-in Screen\": uniqueId=\"local:0\", PhysicalDisplayInfo{1440 x 2960, 60.0 fps, density 4.0, 537.882 x 537.388 dpi}, state ON}\n";
        assert_eq!(
            parse_physical_display_info(output),
            Some((1440, 2960, 4.0))
        );
    }

    #[test]
    fn parses_unrestricted_screen() {
        let output = "  mSystemDecorLayer=1920 mScreenLayer=2000\n  mUnrestrictedScreen=(0,0) 1080x1920\n  mRestrictedScreen=(0,0) 1080x1836\n";
        assert_eq!(parse_unrestricted_screen(output), Some((1080, 1920)));
    }

    #[test]
    fn parses_width_height_markers() {
        let output = "  mRotation=0 mCurrentAppOrientation=-1\n  DisplayWidth=480 DisplayHeight=800\n";
        assert_eq!(parse_display_width_height(output), Some((480, 800)));
    }

    #[test]
    fn parses_wm_size_density_block() {
        let output = "Physical size: 1080x1920\nOverride size: 1080x1920\nPhysical density: 420\n";
        assert_eq!(parse_wm_size_density(output), Some((1080, 1920, 420.0)));
    }

    #[test]
    fn parses_restricted_screen() {
        let output = "  mUnrestrictedScreen=(0,0) 720x1280\n  mRestrictedScreen=(0,0) 720x1184\n";
        assert_eq!(parse_restricted_screen(output), Some((720, 1184)));
    }

    #[test]
    fn cur_resolution_normalizes_axis_order() {
        let output = "  Display: mDisplayId=0\n    init=1080x2280 420dpi cur=2280x1080 app=2280x1004\n";
        assert_eq!(parse_cur_resolution(output), Some((1080, 2280)));
    }

    #[test]
    fn cur_resolution_absent() {
        assert_eq!(parse_cur_resolution("init=1080x2280 420dpi"), None);
    }

    #[test]
    fn parses_max_touch_coordinates() {
        let output = "add device 1: /dev/input/event2\n    0035  : value 0, min 0, max 1439, fuzz 0, flat 0, resolution 0\n    0036  : value 0, min 0, max 2959, fuzz 0, flat 0, resolution 0\n";
        assert_eq!(parse_max_xy(output), (Some(1439), Some(2959)));
    }

    #[test]
    fn max_touch_coordinates_may_be_partial() {
        let output = "    0035  : value 0, min 0, max 1439, fuzz 0\n";
        assert_eq!(parse_max_xy(output), (Some(1439), None));
    }
}
