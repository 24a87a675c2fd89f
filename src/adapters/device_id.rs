//! Device identity derived from the primary network interface's hardware
//! address (spec.md §3): six lowercase hex octets separated by colons,
//! e.g. `aa:bb:cc:dd:ee:ff`. Computed once at startup and then immutable,
//! matching `Device::id` (spec.md §4.1).
//!
//! Grounded in `ZanzyTHEbar-pet-filter`'s `adapters::device_id`, adapted
//! from an ESP32 eFuse read to a Linux SBC's `/sys/class/net/*/address`
//! sysfs read (no crate needed on a host with a working `/sys`).

use std::fs;
use std::path::Path;

use crate::error::DeviceError;

const NET_CLASS_DIR: &str = "/sys/class/net";

/// Finds the first non-loopback interface under `/sys/class/net` with a
/// non-zero hardware address and renders it as `aa:bb:cc:dd:ee:ff`.
///
/// Interfaces are visited in sorted name order so the result is
/// deterministic across runs on the same hardware, even though sysfs
/// itself makes no ordering guarantee.
pub fn primary_interface_id() -> Result<String, DeviceError> {
    read_from(Path::new(NET_CLASS_DIR))
}

fn read_from(net_class_dir: &Path) -> Result<String, DeviceError> {
    let mut names: Vec<String> = fs::read_dir(net_class_dir)
        .map_err(|e| DeviceError::DeviceId(format!("cannot list {}: {e}", net_class_dir.display())))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name != "lo")
        .collect();
    names.sort();

    for name in names {
        let address_path = net_class_dir.join(&name).join("address");
        let Ok(raw) = fs::read_to_string(&address_path) else {
            continue;
        };
        if let Some(id) = parse_mac(raw.trim()) {
            return Ok(id);
        }
    }

    Err(DeviceError::DeviceId(format!(
        "no non-loopback interface with a hardware address under {}",
        net_class_dir.display()
    )))
}

/// Normalizes a sysfs `address` file's contents (already colon-separated
/// lowercase hex) and rejects the all-zero placeholder some virtual
/// interfaces report.
fn parse_mac(raw: &str) -> Option<String> {
    let octets: Vec<&str> = raw.split(':').collect();
    if octets.len() != 6 || !octets.iter().all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit())) {
        return None;
    }
    let normalized = octets.iter().map(|o| o.to_ascii_lowercase()).collect::<Vec<_>>().join(":");
    if normalized == "00:00:00:00:00:00" {
        return None;
    }
    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn picks_first_non_loopback_interface_alphabetically() {
        let dir = tempfile::tempdir().unwrap();
        for (name, mac) in [("lo", "00:00:00:00:00:00"), ("wlan0", "AA:BB:CC:DD:EE:FF"), ("eth0", "11:22:33:44:55:66")] {
            let iface = dir.path().join(name);
            fs::create_dir(&iface).unwrap();
            fs::write(iface.join("address"), format!("{mac}\n")).unwrap();
        }

        let id = read_from(dir.path()).unwrap();
        assert_eq!(id, "11:22:33:44:55:66");
    }

    #[test]
    fn skips_interfaces_with_zero_address() {
        let dir = tempfile::tempdir().unwrap();
        for (name, mac) in [("eth0", "00:00:00:00:00:00"), ("wlan0", "aa:bb:cc:dd:ee:ff")] {
            let iface = dir.path().join(name);
            fs::create_dir(&iface).unwrap();
            fs::write(iface.join("address"), format!("{mac}\n")).unwrap();
        }

        let id = read_from(dir.path()).unwrap();
        assert_eq!(id, "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn no_usable_interface_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("lo")).unwrap();
        fs::write(dir.path().join("lo").join("address"), "00:00:00:00:00:00\n").unwrap();

        assert!(read_from(dir.path()).is_err());
    }
}
