//! Sub-action dispatch for the Request Processor (spec.md §4.5): the
//! `output`, `visual` and `acoustic` handlers a control request can name.
//! Kept separate from [`crate::activities::request_processor`] so the
//! dispatch logic — what each command/state/pattern string means — is
//! unit-testable against a bare [`crate::device::Device`] without pulling
//! in the inbound-queue plumbing.
//!
//! Grounded in the original `_outputs.py::process_request`/`_do_pattern`,
//! rendered per spec.md §9's fixed resolutions: unknown commands/colors/
//! patterns are silent no-ops that still report success, and
//! `visual.pattern` is parsed as `"<pattern>/<color>"` from the `pattern`
//! field itself.

use crate::device::Device;
use crate::device::color::Color;
use crate::device::pattern::Pattern;
use crate::error::RequestError;
use crate::messages::{AcousticAction, OutputAction, VisualAction};

/// Runs the `output` sub-action (spec.md §4.5). Unknown commands are a
/// silent no-op.
pub fn run_output(device: &Device, action: &OutputAction) -> Result<(), RequestError> {
    match action.command.as_str() {
        "activate" => device.relay_set(true).map_err(Into::into),
        "deactivate" => device.relay_set(false).map_err(Into::into),
        "pulse" => {
            let duration = action.duration.unwrap_or(0.0);
            device.relay_pulse(duration).map_err(Into::into)
        }
        _ => Ok(()),
    }
}

/// Runs the `visual` sub-action (spec.md §4.5): either a `state` (`"off"`
/// / `"on/<color>"`) or a `pattern` (`"<name>/<color>"`). An unknown
/// color or pattern name is a silent no-op.
pub fn run_visual(device: &Device, action: &VisualAction) -> Result<(), RequestError> {
    if let Some(state) = &action.state {
        if state == "off" {
            device.led_off()?;
        } else if let Some(color_name) = state.strip_prefix("on/") {
            if let Some(color) = Color::parse(color_name) {
                device.led_set_color(color)?;
            }
        }
    }

    if let Some(pattern_spec) = &action.pattern {
        if let Some((pattern_name, color_name)) = pattern_spec.split_once('/') {
            if let (Some(pattern), Some(color)) = (Pattern::parse(pattern_name), Color::parse(color_name)) {
                device.led_pattern(pattern, color)?;
            }
        }
    }

    Ok(())
}

/// Runs the `acoustic` sub-action (spec.md §4.5): a named pattern on the
/// buzzer. An unknown pattern name is a silent no-op.
pub fn run_acoustic(device: &Device, action: &AcousticAction) -> Result<(), RequestError> {
    if let Some(pattern) = Pattern::parse(&action.pattern) {
        device.buzzer_pattern(pattern)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceComponents;
    use crate::device::ports::{DigitalInput, DigitalOutput, MqttHandle, NfcFrontEnd, RgbOutput};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct FakeNfc;
    impl NfcFrontEnd for FakeNfc {
        fn read_passive_target(&mut self, _timeout: Duration) -> Result<Option<Vec<u8>>, crate::error::DeviceError> {
            Ok(None)
        }
        fn firmware_version(&mut self) -> Result<(u8, u8, u8, u8), crate::error::DeviceError> {
            Ok((0, 0, 0, 0))
        }
    }
    struct FakeOutput(Arc<AtomicBool>);
    impl DigitalOutput for FakeOutput {
        fn set(&mut self, active: bool) -> Result<(), crate::error::DeviceError> {
            self.0.store(active, Ordering::SeqCst);
            Ok(())
        }
    }
    struct FakeInput;
    impl DigitalInput for FakeInput {
        fn read(&mut self) -> Result<bool, crate::error::DeviceError> {
            Ok(false)
        }
    }
    struct FakeRgb(Arc<Mutex<(f64, f64, f64)>>);
    impl RgbOutput for FakeRgb {
        fn set_color(&mut self, r: f64, g: f64, b: f64) -> Result<(), crate::error::DeviceError> {
            *self.0.lock().unwrap() = (r, g, b);
            Ok(())
        }
    }
    struct FakeMqtt;
    impl MqttHandle for FakeMqtt {
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

    fn device_with(relay: Arc<AtomicBool>, led: Arc<Mutex<(f64, f64, f64)>>) -> Device {
        let components = DeviceComponents {
            nfc: Box::new(FakeNfc),
            tamper_input: Some(Box::new(FakeInput)),
            buzzer: Box::new(FakeOutput(Arc::new(AtomicBool::new(false)))),
            led: Box::new(FakeRgb(led)),
            relay: Box::new(FakeOutput(relay)),
        };
        Device::new("aa:bb:cc:dd:ee:ff".into(), components, Box::new(FakeMqtt)).unwrap()
    }

    #[test]
    fn activate_turns_relay_on() {
        let relay = Arc::new(AtomicBool::new(false));
        let device = device_with(relay.clone(), Arc::new(Mutex::new((0.0, 0.0, 0.0))));
        run_output(&device, &OutputAction { command: "activate".into(), duration: None }).unwrap();
        assert!(relay.load(Ordering::SeqCst));
    }

    #[test]
    fn unknown_output_command_is_a_silent_no_op() {
        let relay = Arc::new(AtomicBool::new(false));
        let device = device_with(relay.clone(), Arc::new(Mutex::new((0.0, 0.0, 0.0))));
        run_output(&device, &OutputAction { command: "frobnicate".into(), duration: None }).unwrap();
        assert!(!relay.load(Ordering::SeqCst));
    }

    #[test]
    fn visual_on_blue_sets_led() {
        let led = Arc::new(Mutex::new((0.0, 0.0, 0.0)));
        let device = device_with(Arc::new(AtomicBool::new(false)), led.clone());
        run_visual(&device, &VisualAction { state: Some("on/blue".into()), pattern: None }).unwrap();
        assert_eq!(*led.lock().unwrap(), (0.0, 0.0, 1.0));
    }

    #[test]
    fn visual_unknown_color_is_a_silent_no_op() {
        let led = Arc::new(Mutex::new((0.0, 0.0, 0.0)));
        let device = device_with(Arc::new(AtomicBool::new(false)), led.clone());
        run_visual(&device, &VisualAction { state: Some("on/purple".into()), pattern: None }).unwrap();
        assert_eq!(*led.lock().unwrap(), (0.0, 0.0, 0.0));
    }

    #[test]
    fn visual_pattern_parses_name_then_color() {
        let led = Arc::new(Mutex::new((0.0, 0.0, 0.0)));
        let device = device_with(Arc::new(AtomicBool::new(false)), led.clone());
        run_visual(&device, &VisualAction { state: None, pattern: Some("p1/green".into()) }).unwrap();
        // p1 ends with off, so the LED is back at (0,0,0) after the pattern runs.
        assert_eq!(*led.lock().unwrap(), (0.0, 0.0, 0.0));
        assert_eq!(device.led_current(), Color::Off);
    }
}
