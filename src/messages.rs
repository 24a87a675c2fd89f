//! Wire shapes for everything that crosses the MQTT boundary (spec.md §3,
//! §6). Grounded in the teacher's tagged serde enums for the device
//! websocket link (`server/src/websocket/device.rs`), generalized from a
//! closed enum of message kinds to TAPPER's open `(topic_suffix, payload)`
//! outbound queue plus a fixed inbound request/response shape. The
//! outbound FIFO itself is carried as plain `(String, serde_json::Value)`
//! tuples (see `Device`'s `schedule`/`take_outbound_receiver`) — there's
//! no wire shape to name beyond that pair.

use serde::{Deserialize, Serialize};

/// A parsed `control/request` message (spec.md §4.5).
///
/// `id` is kept as a raw JSON value check via `as_i64` rather than a hard
/// `i64` field: a malformed or absent `id` must not prevent the rest of the
/// request from being inspected for a response (scenario 5, spec.md §8).
#[derive(Debug, Clone, Deserialize)]
pub struct InboundRequest {
    pub id: Option<i64>,
    #[serde(default)]
    pub output: Option<OutputAction>,
    #[serde(default)]
    pub visual: Option<VisualAction>,
    #[serde(default)]
    pub acoustic: Option<AcousticAction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputAction {
    pub command: String,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Either `state` (`"off"` / `"on/<color>"`) or `pattern`
/// (`"<name>/<color>"`) is present, never both in practice, but both are
/// modeled as optional so an unexpected combination doesn't fail to parse.
#[derive(Debug, Clone, Deserialize)]
pub struct VisualAction {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcousticAction {
    pub pattern: String,
}

/// A `control/response` reply (spec.md §3).
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub id: Option<i64>,
    pub result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(id: Option<i64>) -> Self {
        Self { id, result: "success", error: None }
    }

    pub fn error(id: Option<i64>, message: impl Into<String>) -> Self {
        Self { id, result: "error", error: Some(message.into()) }
    }
}
