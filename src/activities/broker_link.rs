//! MQTT Broker Link (spec.md §4.6): two activities sharing one broker
//! session — a Publisher draining the outbound queue, and a Network I/O
//! loop dispatching inbound `control/request` messages into the inbound
//! queue. Shutdown is driven externally: the signal handler disconnects
//! the MQTT client, which unblocks [`run_network_io`]'s blocking read;
//! the publisher notices the next time its queue wait times out.

use serde_json::Value;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use crate::device::Device;
use crate::device::ports::{IncomingMessage, MqttEventSource};
use crate::supervisor::ShutdownHandle;

const QUEUE_POLL: Duration = Duration::from_millis(200);

/// Drains the outbound queue, publishing each entry through the Device
/// (which itself serializes on the MQTT guard — spec.md §4.6: "Starves
/// no other activity").
pub fn run_publisher(device: Arc<Device>, shutdown: ShutdownHandle, outbound: mpsc::Receiver<(String, Value)>) {
    loop {
        match outbound.recv_timeout(QUEUE_POLL) {
            Ok((topic_suffix, payload)) => {
                if let Err(err) = device.publish(&topic_suffix, payload) {
                    tracing::error!(error = %err, %topic_suffix, "outbound publish failed");
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if shutdown.is_shutdown() {
            break;
        }
    }
}

/// Drives the MQTT event source until the connection ends, forwarding
/// `control/request` publishes into the Device's inbound queue. Any other
/// incoming packet is dropped at `trace` level.
pub fn run_network_io(device: Arc<Device>, request_topic: String, mut events: Box<dyn MqttEventSource>) {
    let inbound = device.inbound_sender();

    loop {
        match events.next_event() {
            Some(Ok(IncomingMessage::Publish { topic, payload })) if topic == request_topic => {
                match String::from_utf8(payload) {
                    Ok(text) => {
                        let _ = inbound.send(text);
                    }
                    Err(err) => tracing::warn!(error = %err, "non-utf8 control request payload dropped"),
                }
            }
            Some(Ok(IncomingMessage::Publish { topic, .. })) => {
                tracing::trace!(%topic, "ignoring publish on unrelated topic");
            }
            Some(Ok(IncomingMessage::Other)) => {}
            Some(Err(err)) => {
                tracing::error!(error = %err, "mqtt network i/o error");
                break;
            }
            None => break,
        }
    }

    tracing::debug!("mqtt network i/o loop ended");
}
