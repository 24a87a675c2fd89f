//! System metrics adapter for the Heartbeat Reporter (spec.md §4.4):
//! CPU percent, virtual-memory percent, root filesystem usage percent,
//! CPU thermal-zone temperature and uptime. The Rust analogue of the
//! original's `psutil` calls (`_threads.py::_heartbeat_thread`),
//! rendered over the `sysinfo` crate.

use std::time::Duration;

use sysinfo::{Components, Disks, System};

use crate::device::ports::{SystemMetrics, SystemSnapshot};

/// Minimum interval between two successive CPU percent samples:
/// `sysinfo` needs two refreshes separated by time to compute a
/// meaningful CPU usage figure.
const CPU_REFRESH_SETTLE: Duration = Duration::from_millis(200);

pub struct SysinfoMetrics {
    system: System,
    disks: Disks,
    components: Components,
    root_mount: String,
}

impl SysinfoMetrics {
    pub fn new() -> Self {
        let mut system = System::new_all();
        system.refresh_cpu_usage();
        std::thread::sleep(CPU_REFRESH_SETTLE);
        system.refresh_cpu_usage();

        Self { system, disks: Disks::new_with_refreshed_list(), components: Components::new_with_refreshed_list(), root_mount: "/".to_string() }
    }
}

impl Default for SysinfoMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMetrics for SysinfoMetrics {
    fn snapshot(&mut self) -> SystemSnapshot {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        self.disks.refresh(true);
        self.components.refresh(true);

        let cpu_percent = self.system.global_cpu_usage() as f64;

        let memory_percent = if self.system.total_memory() == 0 {
            0.0
        } else {
            self.system.used_memory() as f64 / self.system.total_memory() as f64 * 100.0
        };

        let disk_percent = self
            .disks
            .list()
            .iter()
            .find(|d| d.mount_point().to_string_lossy() == self.root_mount)
            .map(|d| {
                let total = d.total_space();
                if total == 0 {
                    0.0
                } else {
                    (total - d.available_space()) as f64 / total as f64 * 100.0
                }
            })
            .unwrap_or(0.0);

        let temperature_c = self
            .components
            .list()
            .iter()
            .find(|c| c.label().to_lowercase().contains("cpu") || c.label().to_lowercase().contains("soc"))
            .or_else(|| self.components.list().first())
            .and_then(|c| c.temperature())
            .unwrap_or(0.0) as f64;

        SystemSnapshot {
            uptime_secs: System::uptime() as f64,
            cpu_percent,
            memory_percent,
            disk_percent,
            temperature_c,
        }
    }
}
