//! Concurrent device supervisor for the HARDWARIO TAPPER NFC reader appliance.
//!
//! A TAPPER unit polls an NFC front-end for passive tags, monitors a tamper
//! switch, drives a buzzer/RGB LED/relay, and reports to an MQTT broker while
//! accepting remote actuation requests. This crate implements that
//! supervisor: five independent activities fanned out onto a single
//! [`device::Device`], coordinated through a small locking discipline and a
//! pair of bounded-in-spirit FIFO queues, and joined by a [`supervisor`] that
//! shuts everything down cleanly on signal.

pub mod activities;
pub mod adapters;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod messages;
pub mod outputs;
pub mod supervisor;

pub use config::{AppConfig, Cli};
pub use device::Device;
pub use error::{DeviceError, RequestError};
