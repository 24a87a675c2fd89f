//! Supervisor (spec.md §4.7): starts every activity, installs the signal
//! handler, waits for shutdown, joins everything, and runs cleanup.
//!
//! Grounded in the teacher's `#[tokio::main]` entry point
//! (`server/src/main.rs`) for the signal-handling half; the activities
//! themselves are blocking OS threads (spec.md §5's "parallel worker
//! activities... as OS threads" model, chosen because the PN532/GPIO
//! calls are blocking), run via `tokio::task::spawn_blocking` so the
//! async runtime still owns the signal handler and the join points.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use tokio::signal::unix::{SignalKind, signal};

use crate::activities::{broker_link, heartbeat, request_processor, tag_poller, tamper_monitor};
use crate::device::Device;
use crate::device::ports::{MqttEventSource, SystemMetrics};

/// The single shared shutdown flag (spec.md §3, I5): once set, never
/// cleared. Every activity observes it within one sampling period by
/// waiting on this handle instead of a plain `sleep`.
#[derive(Clone)]
pub struct ShutdownHandle {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self { inner: Arc::new((Mutex::new(false), Condvar::new())) }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.inner.0.lock().expect("shutdown lock poisoned")
    }

    /// Sets the flag and wakes every activity currently waiting on it.
    /// Idempotent: setting it twice has no further effect (I5).
    pub fn signal(&self) {
        *self.inner.0.lock().expect("shutdown lock poisoned") = true;
        self.inner.1.notify_all();
    }

    /// Waits up to `timeout` for shutdown to be signaled. Returns `true`
    /// the moment shutdown is observed (immediately, if already set),
    /// `false` if `timeout` elapses first.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.inner.0.lock().expect("shutdown lock poisoned");
        if *guard {
            return true;
        }
        let (guard, _) = self.inner.1.wait_timeout(guard, timeout).expect("shutdown condvar poisoned");
        *guard
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Starts all five activities plus the two broker-link activities,
/// installs SIGINT/SIGTERM handlers, waits for shutdown, joins every
/// activity, and runs cleanup (spec.md §7: buzzer off, relay off).
pub async fn run(
    device: Arc<Device>,
    request_topic: String,
    events: Box<dyn MqttEventSource>,
    metrics: Box<dyn SystemMetrics>,
) -> anyhow::Result<()> {
    let shutdown = ShutdownHandle::new();

    let inbound_rx = device.take_inbound_receiver().expect("inbound receiver taken exactly once");
    let outbound_rx = device.take_outbound_receiver().expect("outbound receiver taken exactly once");

    let tag_poller_handle = {
        let device = device.clone();
        let shutdown = shutdown.clone();
        tokio::task::spawn_blocking(move || tag_poller::run(device, shutdown))
    };
    let tamper_monitor_handle = {
        let device = device.clone();
        let shutdown = shutdown.clone();
        tokio::task::spawn_blocking(move || tamper_monitor::run(device, shutdown))
    };
    let heartbeat_handle = {
        let device = device.clone();
        let shutdown = shutdown.clone();
        tokio::task::spawn_blocking(move || heartbeat::run(device, shutdown, metrics))
    };
    let request_processor_handle = {
        let device = device.clone();
        let shutdown = shutdown.clone();
        tokio::task::spawn_blocking(move || request_processor::run(device, shutdown, inbound_rx))
    };
    let publisher_handle = {
        let device = device.clone();
        let shutdown = shutdown.clone();
        tokio::task::spawn_blocking(move || broker_link::run_publisher(device, shutdown, outbound_rx))
    };
    let network_io_handle = {
        let device = device.clone();
        tokio::task::spawn_blocking(move || broker_link::run_network_io(device, request_topic, events))
    };

    install_signal_handlers(device.clone(), shutdown.clone());

    // Block here until shutdown is signaled; this also bounds how long we
    // wait before starting to join activities, matching scenario 6's
    // "within 2 s" expectation in spirit (activities themselves observe
    // shutdown within one sampling period).
    while !shutdown.is_shutdown() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    for handle in [tag_poller_handle, tamper_monitor_handle, heartbeat_handle, request_processor_handle, publisher_handle] {
        handle.await.map_err(|e| anyhow::anyhow!("activity thread panicked: {e}"))?;
    }
    network_io_handle.await.map_err(|e| anyhow::anyhow!("network i/o thread panicked: {e}"))?;

    cleanup(&device);
    Ok(())
}

/// Installs handlers for SIGINT and SIGTERM that set the shutdown flag
/// and disconnect the MQTT client, unblocking the network-I/O activity
/// (spec.md §4.6, §4.7).
fn install_signal_handlers(device: Arc<Device>, shutdown: ShutdownHandle) {
    tokio::spawn(async move {
        let mut interrupt = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGINT handler");
                return;
            }
        };
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                return;
            }
        };

        tokio::select! {
            _ = interrupt.recv() => tracing::info!("received SIGINT, shutting down"),
            _ = terminate.recv() => tracing::info!("received SIGTERM, shutting down"),
        }

        shutdown.signal();
        if let Err(err) = device.disconnect_mqtt() {
            tracing::warn!(error = %err, "mqtt disconnect during shutdown failed");
        }
    });
}

/// Clean-shutdown cleanup (spec.md §7, P4, P5): buzzer and relay both
/// inactive.
fn cleanup(device: &Device) {
    if let Err(err) = device.buzzer_set(false) {
        tracing::warn!(error = %err, "cleanup: failed to turn buzzer off");
    }
    if let Err(err) = device.relay_set(false) {
        tracing::warn!(error = %err, "cleanup: failed to turn relay off");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn wait_timeout_returns_false_without_signal() {
        let shutdown = ShutdownHandle::new();
        assert!(!shutdown.wait_timeout(Duration::from_millis(20)));
    }

    #[test]
    fn signal_wakes_waiters_immediately() {
        let shutdown = ShutdownHandle::new();
        let waiter = shutdown.clone();
        let handle = thread::spawn(move || waiter.wait_timeout(Duration::from_secs(5)));

        thread::sleep(Duration::from_millis(20));
        shutdown.signal();

        assert!(handle.join().unwrap());
    }

    #[test]
    fn is_shutdown_reflects_signal_state() {
        let shutdown = ShutdownHandle::new();
        assert!(!shutdown.is_shutdown());
        shutdown.signal();
        assert!(shutdown.is_shutdown());
    }
}
