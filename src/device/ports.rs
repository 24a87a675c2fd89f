//! Hardware/broker trait boundary, a.k.a. "ports" in the hexagonal sense.
//!
//! Grounded in `ZanzyTHEbar-pet-filter`'s `app::ports` module: the Device
//! embeds these as boxed trait objects instead of inheriting from a driver
//! type (spec.md §9's re-architecture note explicitly calls out the
//! source's `PN532_SPI` inheritance as a language-specific convenience to
//! drop). Production adapters live in [`crate::adapters`]; tests substitute
//! small in-memory fakes.

use std::time::Duration;

use crate::error::DeviceError;

/// The PN532 NFC front-end. The SPI transport and framing are external
/// (spec.md §1): this trait is the seam at which that vendor library is
/// wrapped.
pub trait NfcFrontEnd: Send {
    /// Poll for a passive target for up to `timeout`. `Ok(None)` means no
    /// tag was present within the window, not an error.
    fn read_passive_target(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, DeviceError>;

    /// `(ic, ver, rev, support)` as reported by the PN532 firmware, read
    /// once at construction for diagnostics (spec.md §4.1 step 1).
    fn firmware_version(&mut self) -> Result<(u8, u8, u8, u8), DeviceError>;
}

/// A single digital output (buzzer, relay): active-high, no PWM.
pub trait DigitalOutput: Send {
    fn set(&mut self, active: bool) -> Result<(), DeviceError>;
}

/// A single digital input (the tamper switch), sampled on demand.
pub trait DigitalInput: Send {
    /// Returns `true` when the line reads active (spec.md §3: active-high,
    /// no pull-up).
    fn read(&mut self) -> Result<bool, DeviceError>;
}

/// The RGB LED, addressed as a PWM intensity triplet in `[0, 1]`.
pub trait RgbOutput: Send {
    fn set_color(&mut self, r: f64, g: f64, b: f64) -> Result<(), DeviceError>;
}

/// The MQTT publish/subscribe/disconnect surface used from inside the
/// Device's MQTT guard. Kept separate from [`MqttEventSource`] because the
/// publish path and the network-I/O loop are different activities
/// (spec.md §4.6) holding the handle at different times.
pub trait MqttHandle: Send {
    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), DeviceError>;
    fn subscribe(&mut self, topic: &str) -> Result<(), DeviceError>;
    fn disconnect(&mut self) -> Result<(), DeviceError>;
}

/// An inbound MQTT message relevant to the network-I/O loop.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    Publish { topic: String, payload: Vec<u8> },
    /// Any other packet (PINGRESP, SUBACK, ...): logged and dropped.
    Other,
}

/// The blocking event source the network-I/O activity iterates until the
/// broker connection ends (spec.md §4.6: "runs the MQTT client's event loop
/// until disconnected"). `None` signals a clean end of the connection.
pub trait MqttEventSource: Send {
    fn next_event(&mut self) -> Option<Result<IncomingMessage, DeviceError>>;
}

/// System metrics for the heartbeat reporter (spec.md §4.4), the Rust
/// analogue of the original's `psutil` calls.
pub trait SystemMetrics: Send {
    fn snapshot(&mut self) -> SystemSnapshot;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemSnapshot {
    pub uptime_secs: f64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub temperature_c: f64,
}
