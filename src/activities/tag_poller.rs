//! Tag Poller (spec.md §4.2): periodically reads passive NFC targets and
//! on a hit, runs the tag-ack pattern then schedules `event/tag`.

use std::sync::Arc;
use std::time::Duration;

use crate::device::Device;
use crate::supervisor::ShutdownHandle;

const READ_TIMEOUT: Duration = Duration::from_millis(500);
const SETTLE_WAIT: Duration = Duration::from_secs(2);

pub fn run(device: Arc<Device>, shutdown: ShutdownHandle) {
    loop {
        match device.read_tag(READ_TIMEOUT) {
            Ok(Some(uid)) => {
                let id = hex_lower(&uid);
                tracing::debug!(%id, "tag detected");
                if let Err(err) = device.tag_ack() {
                    tracing::error!(error = %err, "tag-ack pattern failed");
                }
                device.schedule("event/tag", serde_json::json!({ "id": id }));
            }
            Ok(None) => {}
            Err(err) => tracing::error!(error = %err, "tag read failed"),
        }

        if shutdown.wait_timeout(SETTLE_WAIT) {
            break;
        }
    }
}

/// Lowercase hex digits concatenated without separators (spec.md §4.2).
fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_lower_matches_scenario_1() {
        assert_eq!(hex_lower(&[0x04, 0xA2, 0x1F, 0x7B]), "04a21f7b");
    }
}
