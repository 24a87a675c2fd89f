//! Typed errors at module seams, composed with `anyhow` at the activity and
//! `main` boundary (same split the original source draws between
//! `click.UsageError` / bare exceptions and the loguru-wrapped call sites).

use thiserror::Error;

/// Errors surfaced by the [`crate::device::Device`] and its hardware/broker
/// adapters.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("GPIO error: {0}")]
    Gpio(String),

    #[error("NFC front-end error: {0}")]
    Nfc(String),

    #[error("MQTT error: {0}")]
    Mqtt(String),

    #[error("MQTT connect timed out")]
    ConnectTimeout,

    #[error("MQTT connect failed: {0}")]
    ConnectFailed(String),

    #[error("failed to serialize outbound message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to derive device id: {0}")]
    DeviceId(String),
}

/// Errors surfaced while executing a single control-request sub-action.
///
/// Carries only a display message: the request processor's contract
/// (spec.md §4.5) is to report `{ result: "error", error: <message> }` and
/// continue serving, never to propagate a typed error further up.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RequestError(pub String);

impl From<DeviceError> for RequestError {
    fn from(err: DeviceError) -> Self {
        RequestError(err.to_string())
    }
}

impl From<String> for RequestError {
    fn from(msg: String) -> Self {
        RequestError(msg)
    }
}
