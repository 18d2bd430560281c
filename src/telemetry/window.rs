use regex::Regex;

use crate::models::WindowViewport;

/// SurfaceFlinger orientation marker; works well on older devices (SDK 15).
pub fn parse_surface_flinger_orientation(output: &str) -> Option<u8> {
    let re = Regex::new(r"orientation=(\d+)").ok()?;
    re.captures(output)?[1].parse().ok()
}

/// Input-subsystem orientation marker, the fallback source.
pub fn parse_input_orientation(output: &str) -> Option<u8> {
    let re = Regex::new(r"SurfaceOrientation:\s+(\d+)").ok()?;
    re.captures(output)?[1].parse().ok()
}

/// Package of the focused window from a `dumpsys window windows` dump. The
/// dump can list several focus lines; the last one is current.
pub fn parse_focused_package(output: &str) -> Option<String> {
    let re = Regex::new(r"mCurrentFocus=Window\{.* ([A-Za-z0-9_.]+)/[A-Za-z0-9_.]+\}").ok()?;
    re.captures_iter(output)
        .last()
        .map(|caps| caps[1].to_string())
}

/// Containing frame of one window block, as (left, top, right, bottom).
pub fn parse_window_frames(window_block: &str) -> Option<(f64, f64, f64, f64)> {
    let re = Regex::new(
        r"Frames: containing=\[(\d+\.?\d*),(\d+\.?\d*)\]\[(\d+\.?\d*),(\d+\.?\d*)\]",
    )
    .ok()?;
    let caps = re.captures(window_block)?;
    Some((
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
        caps[4].parse().ok()?,
    ))
}

/// Turn a containing frame into an application viewport. Landscape
/// orientations (1 and 3) report the frame with the axes flipped, so offset
/// and size are swapped back before the offset is subtracted from the size.
pub fn compute_viewport(frames: (f64, f64, f64, f64), orientation: u8) -> WindowViewport {
    let (mut offset_x, mut offset_y, mut width, mut height) = frames;
    if orientation == 1 || orientation == 3 {
        std::mem::swap(&mut offset_x, &mut offset_y);
        std::mem::swap(&mut width, &mut height);
    }
    WindowViewport {
        offset_x,
        offset_y,
        offset_width: width - offset_x,
        offset_height: height - offset_y,
    }
}

/// Screen-on state from `dumpsys window policy`. Two generations of
/// markers; MIUI 11 dropped `mScreenOnFully` in favor of `screenState`.
pub fn parse_screen_on(output: &str) -> Option<bool> {
    let re = Regex::new(r"mScreenOnFully=(true|false)").ok()?;
    if let Some(caps) = re.captures(output) {
        return Some(&caps[1] == "true");
    }
    let re = Regex::new(r"screenState=(SCREEN_STATE_ON|SCREEN_STATE_OFF)").ok()?;
    re.captures(output)
        .map(|caps| &caps[1] == "SCREEN_STATE_ON")
}

/// Lock-screen state from `dumpsys window policy`; the marker name varies
/// across OS generations.
pub fn parse_lock_state(output: &str) -> Option<bool> {
    let re =
        Regex::new(r"(?:mShowingLockscreen|isStatusBarKeyguard|showing)=(true|false)").ok()?;
    re.captures(output).map(|caps| &caps[1] == "true")
}

pub fn parse_keyboard_shown(output: &str) -> bool {
    output.contains("mInputShown=true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_surface_flinger_orientation() {
        let output = "Display 0 HWC layers:\n  type | orientation=3 | ...\n";
        assert_eq!(parse_surface_flinger_orientation(output), Some(3));
    }

    #[test]
    fn parses_input_orientation() {
        let output = "  Viewport: displayId=0\n    SurfaceOrientation: 1\n";
        assert_eq!(parse_input_orientation(output), Some(1));
    }

    #[test]
    fn focused_package_takes_last_match() {
        let output = "mCurrentFocus=Window{11 u0 com.old.app/com.old.app.Main}\nmCurrentFocus=Window{2f u0 com.android.settings/com.android.settings.Settings}\n";
        assert_eq!(
            parse_focused_package(output).as_deref(),
            Some("com.android.settings")
        );
    }

    #[test]
    fn focused_package_absent() {
        assert_eq!(parse_focused_package("mCurrentFocus=null"), None);
    }

    #[test]
    fn parses_window_frames() {
        let block = "  Window #2 Window{a1 u0 com.example/com.example.Main}:\n    Frames: containing=[0.0,63.0][1080.0,1920.0] parent=[0.0,63.0][1080.0,1920.0]\n";
        assert_eq!(
            parse_window_frames(block),
            Some((0.0, 63.0, 1080.0, 1920.0))
        );
    }

    #[test]
    fn viewport_subtracts_offset_in_portrait() {
        let viewport = compute_viewport((10.0, 20.0, 500.0, 900.0), 0);
        assert_eq!(
            viewport,
            WindowViewport {
                offset_x: 10.0,
                offset_y: 20.0,
                offset_width: 490.0,
                offset_height: 880.0,
            }
        );
    }

    #[test]
    fn viewport_swaps_axes_in_landscape() {
        for orientation in [1, 3] {
            let viewport = compute_viewport((10.0, 20.0, 500.0, 900.0), orientation);
            assert_eq!(
                viewport,
                WindowViewport {
                    offset_x: 20.0,
                    offset_y: 10.0,
                    offset_width: 880.0,
                    offset_height: 490.0,
                }
            );
        }
    }

    #[test]
    fn parses_screen_on_markers() {
        assert_eq!(parse_screen_on("mScreenOnEarly=true mScreenOnFully=true"), Some(true));
        assert_eq!(parse_screen_on("mScreenOnFully=false"), Some(false));
        assert_eq!(parse_screen_on("screenState=SCREEN_STATE_ON"), Some(true));
        assert_eq!(parse_screen_on("screenState=SCREEN_STATE_OFF"), Some(false));
        assert_eq!(parse_screen_on("no markers here"), None);
    }

    #[test]
    fn parses_lock_state_markers() {
        assert_eq!(parse_lock_state("mShowingLockscreen=true"), Some(true));
        assert_eq!(parse_lock_state("isStatusBarKeyguard=false"), Some(false));
        assert_eq!(parse_lock_state("showing=true"), Some(true));
        assert_eq!(parse_lock_state("nothing"), None);
    }

    #[test]
    fn detects_keyboard_shown() {
        assert!(parse_keyboard_shown("mInputShown=true mShowRequested=true"));
        assert!(!parse_keyboard_shown("mInputShown=false"));
    }
}
