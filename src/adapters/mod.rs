//! Adapters — concrete implementations of the [`crate::device::ports`]
//! traits, each wrapping one external collaborator named in spec.md §1.
//!
//! | Adapter      | Implements                          | Wraps               |
//! |--------------|--------------------------------------|----------------------|
//! | `device_id`  | (produces the device identity string)| `/sys/class/net/*`   |
//! | `gpio`       | `DigitalOutput`, `DigitalInput`, `RgbOutput` | `gpio-cdev`   |
//! | `pn532`      | `NfcFrontEnd`                        | `pn532` + SPI        |
//! | `mqtt`       | `MqttHandle`, `MqttEventSource`      | `rumqttc` (blocking) |
//! | `metrics`    | `SystemMetrics`                      | `sysinfo`            |
//!
//! Grounded in `ZanzyTHEbar-pet-filter`'s `adapters` module: one file per
//! external collaborator, each implementing the port traits declared
//! alongside the domain code rather than the other way around.

pub mod device_id;
pub mod gpio;
pub mod metrics;
pub mod mqtt;
pub mod pn532;
