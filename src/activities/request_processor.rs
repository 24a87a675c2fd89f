//! Request Processor (spec.md §4.5): consumes the inbound control-request
//! queue and, for each request, dispatches `output` then `visual` then
//! `acoustic` in fixed order, replying with a single `control/response`.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use crate::device::Device;
use crate::messages::{InboundRequest, Response};
use crate::outputs::{run_acoustic, run_output, run_visual};
use crate::supervisor::ShutdownHandle;

const QUEUE_POLL: Duration = Duration::from_millis(100);

pub fn run(device: Arc<Device>, shutdown: ShutdownHandle, inbound: mpsc::Receiver<String>) {
    loop {
        match inbound.recv_timeout(QUEUE_POLL) {
            Ok(raw) => {
                let response = process_one(&device, &raw);
                device.schedule(
                    "control/response",
                    serde_json::to_value(&response).expect("Response always serializes"),
                );
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if shutdown.is_shutdown() {
            break;
        }
    }
}

/// Parses one raw request and runs its sub-actions in fixed order,
/// aborting the rest on the first failure (spec.md §4.5 steps 1–4).
fn process_one(device: &Device, raw: &str) -> Response {
    let request: InboundRequest = match serde_json::from_str(raw) {
        Ok(request) => request,
        Err(err) => return Response::error(None, format!("invalid request: {err}")),
    };

    let id = request.id;
    let outcome = (|| -> Result<(), crate::error::RequestError> {
        if let Some(output) = &request.output {
            run_output(device, output)?;
        }
        if let Some(visual) = &request.visual {
            run_visual(device, visual)?;
        }
        if let Some(acoustic) = &request.acoustic {
            run_acoustic(device, acoustic)?;
        }
        Ok(())
    })();

    match outcome {
        Ok(()) => Response::success(id),
        Err(err) => Response::error(id, err.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceComponents;
    use crate::device::ports::{DigitalInput, DigitalOutput, MqttHandle, NfcFrontEnd, RgbOutput};

    struct NoopNfc;
    impl NfcFrontEnd for NoopNfc {
        fn read_passive_target(&mut self, _timeout: Duration) -> Result<Option<Vec<u8>>, crate::error::DeviceError> {
            Ok(None)
        }
        fn firmware_version(&mut self) -> Result<(u8, u8, u8, u8), crate::error::DeviceError> {
            Ok((0, 0, 0, 0))
        }
    }
    struct NoopOutput;
    impl DigitalOutput for NoopOutput {
        fn set(&mut self, _active: bool) -> Result<(), crate::error::DeviceError> {
            Ok(())
        }
    }
    struct NoopInput;
    impl DigitalInput for NoopInput {
        fn read(&mut self) -> Result<bool, crate::error::DeviceError> {
            Ok(false)
        }
    }
    struct NoopRgb;
    impl RgbOutput for NoopRgb {
        fn set_color(&mut self, _r: f64, _g: f64, _b: f64) -> Result<(), crate::error::DeviceError> {
            Ok(())
        }
    }
    struct NoopMqtt;
    impl MqttHandle for NoopMqtt {
        fn publish(&mut self, _topic: &str, _payload: Vec<u8>) -> Result<(), crate::error::DeviceError> {
            Ok(())
        }
        fn subscribe(&mut self, _topic: &str) -> Result<(), crate::error::DeviceError> {
            Ok(())
        }
        fn disconnect(&mut self) -> Result<(), crate::error::DeviceError> {
            Ok(())
        }
    }

    fn device() -> Device {
        let components = DeviceComponents {
            nfc: Box::new(NoopNfc),
            tamper_input: Some(Box::new(NoopInput)),
            buzzer: Box::new(NoopOutput),
            led: Box::new(NoopRgb),
            relay: Box::new(NoopOutput),
        };
        Device::new("aa:bb:cc:dd:ee:ff".into(), components, Box::new(NoopMqtt)).unwrap()
    }

    #[test]
    fn malformed_json_reports_error_with_no_id() {
        let response = process_one(&device(), "not-json");
        assert_eq!(response.result, "error");
        assert_eq!(response.id, None);
    }

    #[test]
    fn pulse_request_reports_success() {
        let response = process_one(&device(), r#"{"id":7,"output":{"command":"pulse","duration":0.0}}"#);
        assert_eq!(response.result, "success");
        assert_eq!(response.id, Some(7));
    }

    #[test]
    fn missing_sub_action_keys_are_skipped() {
        let response = process_one(&device(), r#"{"id":8}"#);
        assert_eq!(response.result, "success");
        assert_eq!(response.id, Some(8));
    }
}
