//! MQTT broker link adapter (spec.md §4.6): wraps `rumqttc`'s blocking
//! `Client`/`Connection` split, which maps directly onto the Publisher /
//! Network-I/O activity split the spec already calls for — `Client` is
//! the handle the MQTT guard protects, `Connection` is the blocking
//! event source the network-I/O activity iterates.
//!
//! Grounded in the teacher's `rumqttc` dependency (`server/Cargo.toml`)
//! and the connection-wiring style of `rhoopr-bambutop`'s `mqtt.rs`
//! (`other_examples/`), adapted from the async `AsyncClient`/`EventLoop`
//! pair to the synchronous pair since the rest of this crate's activities
//! are blocking OS threads (spec.md §5), not async tasks.

use std::fs;
use std::sync::mpsc;
use std::time::Duration;

use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS, TlsConfiguration, Transport};

use crate::config::{AppConfig, TlsConfig};
use crate::device::ports::{IncomingMessage, MqttEventSource, MqttHandle};
use crate::error::DeviceError;

const KEEPALIVE: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const OUTGOING_QUEUE_CAPACITY: usize = 64;

/// Builds the MQTT options from the validated config (spec.md §6: host,
/// port, keepalive 60s, optional TLS material) and drives the connection
/// handshake to completion, enforcing spec.md §4.1 step 7's connect
/// timeout/failure contract.
///
/// The handshake itself runs on a dedicated thread so a hung TCP/TLS
/// negotiation can be bounded by [`CONNECT_TIMEOUT`] rather than blocking
/// forever; `Connection` is not touched again until the thread hands it
/// back over the channel, so there is no concurrent use of the socket.
pub fn connect(config: &AppConfig, client_id: &str) -> Result<(MqttClientAdapter, MqttConnectionAdapter), DeviceError> {
    let mut options = MqttOptions::new(client_id, config.mqtt_host.clone(), config.mqtt_port);
    options.set_keep_alive(KEEPALIVE);

    if let Some(tls) = &config.tls {
        options.set_transport(Transport::Tls(load_tls(tls)?));
    }

    let (client, connection) = Client::new(options, OUTGOING_QUEUE_CAPACITY);

    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut connection = connection;
        let outcome = await_connack(&mut connection);
        let _ = tx.send(outcome.map(|()| connection));
    });

    match rx.recv_timeout(CONNECT_TIMEOUT) {
        Ok(Ok(connection)) => Ok((MqttClientAdapter { client }, MqttConnectionAdapter { connection })),
        Ok(Err(err)) => Err(err),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(DeviceError::ConnectTimeout),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(DeviceError::ConnectFailed("handshake thread dropped".into())),
    }
}

fn await_connack(connection: &mut Connection) -> Result<(), DeviceError> {
    for event in connection.iter() {
        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
            Ok(_) => continue,
            Err(err) => return Err(DeviceError::ConnectFailed(err.to_string())),
        }
    }
    Err(DeviceError::ConnectFailed("broker closed the connection before CONNACK".into()))
}

fn load_tls(tls: &TlsConfig) -> Result<TlsConfiguration, DeviceError> {
    let ca = fs::read(&tls.cafile).map_err(|e| DeviceError::Mqtt(format!("reading CA file: {e}")))?;
    let client_cert = fs::read(&tls.certfile).map_err(|e| DeviceError::Mqtt(format!("reading client cert: {e}")))?;
    let client_key = fs::read(&tls.keyfile).map_err(|e| DeviceError::Mqtt(format!("reading client key: {e}")))?;
    Ok(TlsConfiguration::Simple { ca, alpn: None, client_auth: Some((client_cert, client_key)) })
}

/// The MQTT guard's holder (spec.md §4.1 §5): publish/subscribe/disconnect
/// all go through the synchronous `Client` handle.
pub struct MqttClientAdapter {
    client: Client,
}

impl MqttHandle for MqttClientAdapter {
    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), DeviceError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| DeviceError::Mqtt(e.to_string()))
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), DeviceError> {
        self.client.subscribe(topic, QoS::AtLeastOnce).map_err(|e| DeviceError::Mqtt(e.to_string()))
    }

    fn disconnect(&mut self) -> Result<(), DeviceError> {
        self.client.disconnect().map_err(|e| DeviceError::Mqtt(e.to_string()))
    }
}

/// The network-I/O activity's event source (spec.md §4.6): drives the
/// connection until it ends, surfacing inbound publishes and dropping
/// everything else.
pub struct MqttConnectionAdapter {
    connection: Connection,
}

impl MqttEventSource for MqttConnectionAdapter {
    fn next_event(&mut self) -> Option<Result<IncomingMessage, DeviceError>> {
        match self.connection.iter().next()? {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                Some(Ok(IncomingMessage::Publish { topic: publish.topic, payload: publish.payload.to_vec() }))
            }
            Ok(Event::Incoming(Packet::Disconnect)) => None,
            Ok(_) => Some(Ok(IncomingMessage::Other)),
            Err(err) => Some(Err(DeviceError::Mqtt(err.to_string()))),
        }
    }
}
