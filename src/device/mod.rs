//! The Device object (spec.md §3, §4.1): owns every shared hardware/broker
//! handle, the five mutual-exclusion guards, identity, and the two FIFOs.
//! Everything else in the crate only ever touches hardware through a
//! `&Device`.

pub mod color;
pub mod pattern;
pub mod ports;

use std::sync::Mutex;
use std::sync::mpsc;
use std::time::Duration;

use serde_json::Value;

use crate::error::DeviceError;
use color::Color;
use pattern::{Pattern, PatternActuator, run_pattern};
use ports::{DigitalInput, DigitalOutput, MqttHandle, NfcFrontEnd, RgbOutput};

/// The boxed hardware handles `Device::new` takes ownership of. Built by
/// production adapters (see [`crate::adapters`]) or by test fakes.
pub struct DeviceComponents {
    pub nfc: Box<dyn NfcFrontEnd>,
    /// `None` models "tamper input never initialized" (spec.md §4.1:
    /// `tamper()` then fails closed and always reports `true`).
    pub tamper_input: Option<Box<dyn DigitalInput>>,
    pub buzzer: Box<dyn DigitalOutput>,
    pub led: Box<dyn RgbOutput>,
    pub relay: Box<dyn DigitalOutput>,
}

struct LedState {
    output: Box<dyn RgbOutput>,
    current: Color,
}

pub struct Device {
    id: String,
    nfc: Mutex<Box<dyn NfcFrontEnd>>,
    tamper_input: Option<Mutex<Box<dyn DigitalInput>>>,
    buzzer: Mutex<Box<dyn DigitalOutput>>,
    led: Mutex<LedState>,
    relay: Mutex<Box<dyn DigitalOutput>>,
    mqtt: Mutex<Box<dyn MqttHandle>>,
    outbound_tx: mpsc::Sender<(String, Value)>,
    outbound_rx: Mutex<Option<mpsc::Receiver<(String, Value)>>>,
    inbound_tx: mpsc::Sender<String>,
    inbound_rx: Mutex<Option<mpsc::Receiver<String>>>,
}

impl Device {
    /// Assemble the Device (spec.md §4.1 steps 2–6): buzzer and relay are
    /// driven inactive (I6), the LED starts off, guards and both queues
    /// are created. Steps 1 (PN532 diagnostics), 7–9 (MQTT connect, boot
    /// event, subscribe) are orchestrated by the caller once the Device
    /// exists, since MQTT connect failure must be fatal *before* the
    /// supervisor ever sees a Device (spec.md §4.1 step 7).
    pub fn new(
        id: String,
        components: DeviceComponents,
        mqtt: Box<dyn MqttHandle>,
    ) -> Result<Self, DeviceError> {
        let mut buzzer = components.buzzer;
        buzzer.set(false)?;

        let mut relay = components.relay;
        relay.set(false)?;

        let mut led = components.led;
        led.set_color(0.0, 0.0, 0.0)?;

        let (outbound_tx, outbound_rx) = mpsc::channel();
        let (inbound_tx, inbound_rx) = mpsc::channel();

        Ok(Self {
            id,
            nfc: Mutex::new(components.nfc),
            tamper_input: components.tamper_input.map(Mutex::new),
            buzzer: Mutex::new(buzzer),
            led: Mutex::new(LedState { output: led, current: Color::Off }),
            relay: Mutex::new(relay),
            mqtt: Mutex::new(mqtt),
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
        })
    }

    /// Idempotent, pure (spec.md §4.1).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current sampled tamper state. Fails closed: an uninitialized input
    /// reports `true` (spec.md §4.1).
    pub fn tamper(&self) -> bool {
        match &self.tamper_input {
            Some(input) => {
                let mut guard = input.lock().expect("tamper input lock poisoned");
                guard.read().unwrap_or(true)
            }
            None => true,
        }
    }

    /// Read a passive NFC target, delegated to the PN532 front-end.
    pub fn read_tag(&self, timeout: Duration) -> Result<Option<Vec<u8>>, DeviceError> {
        let mut nfc = self.nfc.lock().expect("nfc lock poisoned");
        nfc.read_passive_target(timeout)
    }

    pub fn firmware_version(&self) -> Result<(u8, u8, u8, u8), DeviceError> {
        let mut nfc = self.nfc.lock().expect("nfc lock poisoned");
        nfc.firmware_version()
    }

    /// Enqueue a message for later publish. Never blocks on I/O (spec.md
    /// §4.1): the channel is unbounded and the send only fails if every
    /// receiver (the broker link's publisher) has already been dropped,
    /// which only happens during shutdown.
    pub fn schedule(&self, topic_suffix: impl Into<String>, payload: Value) {
        let _ = self.outbound_tx.send((topic_suffix.into(), payload));
    }

    /// Synchronous publish: acquires the MQTT guard, stamps `timestamp`
    /// at publish time (I3), serializes, and hands the bytes to the MQTT
    /// client, releasing the guard on every exit path.
    pub fn publish(&self, topic_suffix: &str, payload: Value) -> Result<(), DeviceError> {
        let timestamp = now_seconds();
        let mut envelope = match payload {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        envelope.insert("timestamp".to_string(), serde_json::json!(timestamp));

        let topic = format!("tapper/{}/{}", self.id, topic_suffix);
        let bytes = serde_json::to_vec(&Value::Object(envelope))?;

        let mut mqtt = self.mqtt.lock().expect("mqtt lock poisoned");
        mqtt.publish(&topic, bytes)
    }

    pub fn subscribe_control_requests(&self) -> Result<(), DeviceError> {
        let topic = format!("tapper/{}/control/request", self.id);
        let mut mqtt = self.mqtt.lock().expect("mqtt lock poisoned");
        mqtt.subscribe(&topic)
    }

    pub fn disconnect_mqtt(&self) -> Result<(), DeviceError> {
        let mut mqtt = self.mqtt.lock().expect("mqtt lock poisoned");
        mqtt.disconnect()
    }

    /// Taken once by the broker link's publisher activity.
    pub fn take_outbound_receiver(&self) -> Option<mpsc::Receiver<(String, Value)>> {
        self.outbound_rx.lock().expect("outbound queue lock poisoned").take()
    }

    /// Taken once by the request processor.
    pub fn take_inbound_receiver(&self) -> Option<mpsc::Receiver<String>> {
        self.inbound_rx.lock().expect("inbound queue lock poisoned").take()
    }

    /// Cloned by the broker link's network-I/O activity to hand off raw
    /// request payloads.
    pub fn inbound_sender(&self) -> mpsc::Sender<String> {
        self.inbound_tx.clone()
    }

    // -- Buzzer ----------------------------------------------------------

    pub fn buzzer_set(&self, active: bool) -> Result<(), DeviceError> {
        let mut buzzer = self.buzzer.lock().expect("buzzer lock poisoned");
        buzzer.set(active)
    }

    /// Run a named pattern on the buzzer, holding the buzzer guard for the
    /// whole duration (spec.md §4.5). Aborts and returns the failure the
    /// moment a GPIO write fails, per §4.5 step 4.
    pub fn buzzer_pattern(&self, pattern: Pattern) -> Result<(), DeviceError> {
        let mut buzzer = self.buzzer.lock().expect("buzzer lock poisoned");
        let mut actuator = BuzzerActuator { buzzer: &mut *buzzer };
        run_pattern(&mut actuator, pattern)
    }

    // -- LED ---------------------------------------------------------------

    pub fn led_off(&self) -> Result<(), DeviceError> {
        let mut led = self.led.lock().expect("led lock poisoned");
        led.output.set_color(0.0, 0.0, 0.0)?;
        led.current = Color::Off;
        Ok(())
    }

    pub fn led_set_color(&self, color: Color) -> Result<(), DeviceError> {
        let (r, g, b) = color.triplet();
        let mut led = self.led.lock().expect("led lock poisoned");
        led.output.set_color(r, g, b)?;
        led.current = color;
        Ok(())
    }

    pub fn led_current(&self) -> Color {
        self.led.lock().expect("led lock poisoned").current
    }

    /// Run a named pattern on the LED in `color`, holding the LED guard
    /// for the whole duration. Leaves the LED off afterward, matching the
    /// waveform's final `off` step (spec.md §4.5), but only once the
    /// pattern actually completes — a mid-pattern failure is propagated
    /// without touching `current` further.
    pub fn led_pattern(&self, pattern: Pattern, color: Color) -> Result<(), DeviceError> {
        let mut led = self.led.lock().expect("led lock poisoned");
        let mut actuator = LedActuator { led: &mut led.output, color };
        run_pattern(&mut actuator, pattern)?;
        led.current = Color::Off;
        Ok(())
    }

    // -- Relay ---------------------------------------------------------------

    pub fn relay_set(&self, active: bool) -> Result<(), DeviceError> {
        let mut relay = self.relay.lock().expect("relay lock poisoned");
        relay.set(active)
    }

    pub fn relay_pulse(&self, duration_secs: f64) -> Result<(), DeviceError> {
        let mut relay = self.relay.lock().expect("relay lock poisoned");
        relay.set(true)?;
        std::thread::sleep(Duration::from_secs_f64(duration_secs.max(0.0)));
        relay.set(false)
    }

    /// The tag-ack pattern (spec.md §4.2): atomic w.r.t. buzzer and LED.
    /// Locks are acquired buzzer-then-LED and released LED-then-buzzer —
    /// Rust's scope-exit drop order (LIFO) gives us the reverse release
    /// order for free, satisfying the single fixed lock order (spec.md
    /// §5, P6) without any explicit unlocking code.
    pub fn tag_ack(&self) -> Result<(), DeviceError> {
        let mut buzzer = self.buzzer.lock().expect("buzzer lock poisoned");
        let mut led = self.led.lock().expect("led lock poisoned");

        let saved = led.current;
        led.output.set_color(0.0, 0.0, 0.0)?;
        std::thread::sleep(Duration::from_millis(125));
        led.output.set_color(1.0, 1.0, 0.0)?;
        buzzer.set(true)?;
        std::thread::sleep(Duration::from_millis(125));
        let (r, g, b) = saved.triplet();
        led.output.set_color(r, g, b)?;
        buzzer.set(false)?;
        std::thread::sleep(Duration::from_millis(125));

        led.current = saved;
        Ok(())
        // `led` dropped first, then `buzzer`: buzzer, then LED, then LED
        // released, then buzzer released.
    }
}

struct BuzzerActuator<'a> {
    buzzer: &'a mut dyn DigitalOutput,
}

impl PatternActuator for BuzzerActuator<'_> {
    fn on(&mut self) -> Result<(), DeviceError> {
        self.buzzer.set(true)
    }
    fn off(&mut self) -> Result<(), DeviceError> {
        self.buzzer.set(false)
    }
}

struct LedActuator<'a> {
    led: &'a mut Box<dyn RgbOutput>,
    color: Color,
}

impl PatternActuator for LedActuator<'_> {
    fn on(&mut self) -> Result<(), DeviceError> {
        let (r, g, b) = self.color.triplet();
        self.led.set_color(r, g, b)
    }
    fn off(&mut self) -> Result<(), DeviceError> {
        self.led.set_color(0.0, 0.0, 0.0)
    }
}

/// Wall-clock seconds since the epoch, as a float (spec.md §3: `timestamp`).
pub fn now_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ports::SystemSnapshot;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeNfc {
        next: Option<Vec<u8>>,
    }
    impl NfcFrontEnd for FakeNfc {
        fn read_passive_target(&mut self, _timeout: Duration) -> Result<Option<Vec<u8>>, DeviceError> {
            Ok(self.next.take())
        }
        fn firmware_version(&mut self) -> Result<(u8, u8, u8, u8), DeviceError> {
            Ok((0x32, 1, 6, 7))
        }
    }

    struct FakeOutput {
        state: Arc<AtomicBool>,
    }
    impl DigitalOutput for FakeOutput {
        fn set(&mut self, active: bool) -> Result<(), DeviceError> {
            self.state.store(active, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeRgb {
        last: Arc<Mutex<(f64, f64, f64)>>,
    }
    impl RgbOutput for FakeRgb {
        fn set_color(&mut self, r: f64, g: f64, b: f64) -> Result<(), DeviceError> {
            *self.last.lock().unwrap() = (r, g, b);
            Ok(())
        }
    }

    struct FakeMqtt {
        published: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    }
    impl MqttHandle for FakeMqtt {
        fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), DeviceError> {
            self.published.lock().unwrap().push((topic.to_string(), payload));
            Ok(())
        }
        fn subscribe(&mut self, _topic: &str) -> Result<(), DeviceError> {
            Ok(())
        }
        fn disconnect(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }
    }

    struct FakeMetrics;
    impl ports::SystemMetrics for FakeMetrics {
        fn snapshot(&mut self) -> SystemSnapshot {
            SystemSnapshot {
                uptime_secs: 1.0,
                cpu_percent: 2.0,
                memory_percent: 3.0,
                disk_percent: 4.0,
                temperature_c: 5.0,
            }
        }
    }

    fn make_device(relay_state: Arc<AtomicBool>, buzzer_state: Arc<AtomicBool>) -> Device {
        make_device_with_mqtt(relay_state, buzzer_state).0
    }

    fn make_device_with_mqtt(
        relay_state: Arc<AtomicBool>,
        buzzer_state: Arc<AtomicBool>,
    ) -> (Device, Arc<Mutex<Vec<(String, Vec<u8>)>>>) {
        let published = Arc::new(Mutex::new(Vec::new()));
        let components = DeviceComponents {
            nfc: Box::new(FakeNfc { next: None }),
            tamper_input: None,
            buzzer: Box::new(FakeOutput { state: buzzer_state }),
            led: Box::new(FakeRgb { last: Arc::new(Mutex::new((0.0, 0.0, 0.0))) }),
            relay: Box::new(FakeOutput { state: relay_state }),
        };
        let device = Device::new(
            "aa:bb:cc:dd:ee:ff".to_string(),
            components,
            Box::new(FakeMqtt { published: published.clone() }),
        )
        .unwrap();
        (device, published)
    }

    #[test]
    fn relay_is_inactive_after_construction() {
        let relay_state = Arc::new(AtomicBool::new(true));
        let buzzer_state = Arc::new(AtomicBool::new(true));
        let device = make_device(relay_state.clone(), buzzer_state.clone());
        assert!(!relay_state.load(Ordering::SeqCst));
        assert!(!buzzer_state.load(Ordering::SeqCst));
        drop(device);
    }

    #[test]
    fn tamper_fails_closed_when_uninitialized() {
        let device = make_device(Arc::new(AtomicBool::new(false)), Arc::new(AtomicBool::new(false)));
        assert!(device.tamper());
    }

    #[test]
    fn publish_stamps_timestamp_and_prefixes_topic() {
        let (device, published) =
            make_device_with_mqtt(Arc::new(AtomicBool::new(false)), Arc::new(AtomicBool::new(false)));
        device.publish("event/tag", serde_json::json!({"id": "04a21f7b"})).unwrap();

        let published = published.lock().unwrap();
        let (topic, payload) = &published[0];
        assert_eq!(topic, "tapper/aa:bb:cc:dd:ee:ff/event/tag");

        let decoded: serde_json::Value = serde_json::from_slice(payload).unwrap();
        assert_eq!(decoded["id"], "04a21f7b");
        assert!(decoded["timestamp"].as_f64().is_some());
    }

    #[test]
    fn schedule_never_blocks_and_is_drained_fifo() {
        let device = make_device(Arc::new(AtomicBool::new(false)), Arc::new(AtomicBool::new(false)));
        device.schedule("stats", serde_json::json!({"a": 1}));
        device.schedule("stats", serde_json::json!({"a": 2}));

        let rx = device.take_outbound_receiver().unwrap();
        let (suffix1, payload1) = rx.recv().unwrap();
        let (suffix2, payload2) = rx.recv().unwrap();
        assert_eq!(suffix1, "stats");
        assert_eq!(payload1["a"], 1);
        assert_eq!(suffix2, "stats");
        assert_eq!(payload2["a"], 2);
    }

    #[test]
    fn tag_ack_restores_led_color() {
        let device = make_device(Arc::new(AtomicBool::new(false)), Arc::new(AtomicBool::new(false)));
        device.led_set_color(Color::Green).unwrap();
        device.tag_ack().unwrap();
        assert_eq!(device.led_current(), Color::Green);
    }
}
