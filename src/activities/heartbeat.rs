//! Heartbeat Reporter (spec.md §4.4): every 60 s, schedules a `stats`
//! message carrying system metrics and the current tamper state.

use std::sync::Arc;
use std::time::Duration;

use crate::device::Device;
use crate::device::ports::SystemMetrics;
use crate::supervisor::ShutdownHandle;

const PERIOD: Duration = Duration::from_secs(60);

pub fn run(device: Arc<Device>, shutdown: ShutdownHandle, mut metrics: Box<dyn SystemMetrics>) {
    loop {
        let snapshot = metrics.snapshot();
        let tamper_state = if device.tamper() { "active" } else { "inactive" };

        device.schedule(
            "stats",
            serde_json::json!({
                "system": {
                    "uptime": snapshot.uptime_secs,
                    "cpu": snapshot.cpu_percent,
                    "memory": snapshot.memory_percent,
                    "disk": snapshot.disk_percent,
                    "temperature": snapshot.temperature_c,
                },
                "tamper": { "state": tamper_state },
            }),
        );

        if shutdown.wait_timeout(PERIOD) {
            break;
        }
    }
}
