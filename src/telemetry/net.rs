use std::net::Ipv4Addr;

use regex::Regex;

const IP_PATTERN: &str = r"(\d+\.){3}\d+";

/// `ip -f inet addr show <iface>` output, android >= 6.0.
pub fn parse_ip_addr_show(output: &str) -> Option<String> {
    let re = Regex::new(r"inet ((\d+\.){3}\d+)").ok()?;
    re.captures(output).map(|caps| caps[1].to_string())
}

/// `ifconfig` output; the address sits on a continuation line below the
/// interface name.
pub fn parse_ifconfig(interface: &str, output: &str) -> Option<String> {
    let re = Regex::new(&format!(
        r"(?s){}.*?inet addr:((\d+\.){{3}}\d+)",
        regex::escape(interface)
    ))
    .ok()?;
    re.captures(output).map(|caps| caps[1].to_string())
}

/// Legacy `netcfg` output, android <= 6.0.
pub fn parse_netcfg_ip(interface: &str, output: &str) -> Option<String> {
    let re = Regex::new(&format!(
        r"{}.* ((\d+\.){{3}}\d+)/\d+",
        regex::escape(interface)
    ))
    .ok()?;
    re.captures(output).map(|caps| caps[1].to_string())
}

/// First dotted quad anywhere in the text; used on `getprop` values.
pub fn parse_ip(output: &str) -> Option<String> {
    let re = Regex::new(IP_PATTERN).ok()?;
    re.find(output).map(|m| m.as_str().to_string())
}

/// Mask length of the wlan0 entry in `netcfg` output.
pub fn parse_subnet_mask_len(output: &str) -> Option<u8> {
    let re = Regex::new(r"wlan0.* (\d+\.){3}\d+/(\d+)").ok()?;
    re.captures(output).and_then(|caps| caps[2].parse().ok())
}

/// Best-effort gateway guess: the lowest host address of the device's own
/// subnet. This is a heuristic, not routing truth; networks are free to put
/// the gateway elsewhere.
pub fn derive_gateway(ip: Ipv4Addr, mask_len: u8) -> Ipv4Addr {
    let mask_len = mask_len.min(32);
    let mask: u32 = if mask_len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(mask_len))
    };
    let network = u32::from(ip) & mask;
    Ipv4Addr::from(network.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ip_addr_show() {
        let output = "24: wlan0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500\n    inet 192.168.1.130/24 brd 192.168.1.255 scope global wlan0\n";
        assert_eq!(parse_ip_addr_show(output).as_deref(), Some("192.168.1.130"));
    }

    #[test]
    fn parses_ifconfig_block() {
        let output = "wlan0     Link encap:Ethernet  HWaddr f8:e6:1a:00:00:00\n          inet addr:192.168.1.130  Bcast:192.168.1.255  Mask:255.255.255.0\nlo        Link encap:Local Loopback\n          inet addr:127.0.0.1  Mask:255.0.0.0\n";
        assert_eq!(
            parse_ifconfig("wlan0", output).as_deref(),
            Some("192.168.1.130")
        );
        assert_eq!(parse_ifconfig("lo", output).as_deref(), Some("127.0.0.1"));
        assert_eq!(parse_ifconfig("eth0", output), None);
    }

    #[test]
    fn parses_netcfg_entry() {
        let output = "lo       UP                                127.0.0.1/8   0x00000049 00:00:00:00:00:00\nwlan0    UP                                192.168.1.130/24  0x00001043 f8:e6:1a:00:00:00\n";
        assert_eq!(
            parse_netcfg_ip("wlan0", output).as_deref(),
            Some("192.168.1.130")
        );
    }

    #[test]
    fn parses_getprop_value() {
        assert_eq!(parse_ip("192.168.1.130\n").as_deref(), Some("192.168.1.130"));
        assert_eq!(parse_ip("\n"), None);
    }

    #[test]
    fn parses_subnet_mask_len() {
        let output = "wlan0    UP    192.168.1.130/24  0x00001043 f8:e6:1a:00:00:00\n";
        assert_eq!(parse_subnet_mask_len(output), Some(24));
        assert_eq!(parse_subnet_mask_len("eth0 UP 10.0.0.2/16"), None);
    }

    #[test]
    fn derives_gateway_from_mask() {
        assert_eq!(
            derive_gateway(Ipv4Addr::new(192, 168, 1, 130), 24),
            Ipv4Addr::new(192, 168, 1, 1)
        );
        assert_eq!(
            derive_gateway(Ipv4Addr::new(192, 168, 130, 20), 17),
            Ipv4Addr::new(192, 168, 128, 1)
        );
    }
}
