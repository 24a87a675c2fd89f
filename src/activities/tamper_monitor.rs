//! Tamper Monitor (spec.md §4.3): samples the tamper input, drives the
//! buzzer/LED, and publishes `event/tamper` on every active sample
//! (positive polarity, no debounce beyond the sampling cadence — spec.md
//! §9's fixed resolution of the source's polarity ambiguity).

use std::sync::Arc;
use std::time::Duration;

use crate::device::Device;
use crate::device::color::Color;
use crate::supervisor::ShutdownHandle;

const SAMPLE_PERIOD: Duration = Duration::from_millis(500);

pub fn run(device: Arc<Device>, shutdown: ShutdownHandle) {
    loop {
        let active = device.tamper();

        let actuator_result = if active {
            device.buzzer_set(true).and_then(|()| device.led_set_color(Color::Red))
        } else {
            device.buzzer_set(false).and_then(|()| device.led_off())
        };
        if let Err(err) = actuator_result {
            tracing::error!(error = %err, "tamper monitor actuator update failed");
        }

        if active {
            if let Err(err) = device.publish("event/tamper", serde_json::json!({ "state": "active" })) {
                tracing::error!(error = %err, "event/tamper publish failed");
            }
        }

        if shutdown.wait_timeout(SAMPLE_PERIOD) {
            break;
        }
    }
}
