//! CLI entry point (SPEC_FULL.md §4.8): wires Config → Device → Supervisor,
//! preserving the fatal MQTT-connect exit-code contract (spec.md §4.1 step
//! 7, §6) and the `version` subcommand.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tapper::adapters::{device_id, gpio, metrics, mqtt, pn532};
use tapper::config::{AppConfig, Cli, Command, PinMap, RunArgs};
use tapper::device::{Device, DeviceComponents};
use tapper::error::DeviceError;

const DEFAULT_SPI_PATH: &str = "/dev/spidev0.0";
const DEFAULT_LOG_DIR: &str = "/var/log/tapper";

/// GPIO8 / CE0, the SPI bus's own chip-select line (spec.md §6: "NFC
/// chip-select: SPI CE0 (D8)", unaffected by the `legacy` pin map).
const NFC_CS_LINE: u32 = 8;

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Version => {
            println!("TAPPER version: {}", env!("CARGO_PKG_VERSION"));
        }
        Command::Run(args) => run(args),
    }
}

fn run(args: RunArgs) {
    let config = match AppConfig::load(args.config_path.as_deref(), &args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err:#}");
            std::process::exit(1);
        }
    };

    let _log_guard = match tapper::logging::init(&PathBuf::from(DEFAULT_LOG_DIR), config.debug) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize logging: {err:#}");
            std::process::exit(1);
        }
    };

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting TAPPER");

    if let Some(wifi) = &config.wifi {
        tracing::warn!(network = %wifi.network, "wifi section present in config; provisioning is the host's job, not this core (spec.md §1)");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            tracing::error!(error = %err, "failed to start async runtime");
            std::process::exit(1);
        }
    };

    let exit_code = rt.block_on(async_main(config));
    std::process::exit(exit_code);
}

async fn async_main(config: AppConfig) -> i32 {
    let device_id = match device_id::primary_interface_id() {
        Ok(id) => id,
        Err(err) => {
            tracing::error!(error = %err, "failed to derive device id");
            return 1;
        }
    };
    tracing::info!(%device_id, "device identity resolved");

    let pin_map = PinMap::resolve(config.legacy);

    let (mqtt_client, mqtt_connection) = match mqtt::connect(&config, &device_id) {
        Ok(pair) => pair,
        Err(DeviceError::ConnectTimeout) => {
            tracing::error!("MQTT connect timed out");
            return 110;
        }
        Err(err) => {
            tracing::error!(error = %err, "MQTT connect failed");
            return 113;
        }
    };

    let components = match build_hardware(&pin_map) {
        Ok(components) => components,
        Err(err) => {
            tracing::error!(error = %err, "failed to initialize hardware");
            return 1;
        }
    };

    let device = match Device::new(device_id.clone(), components, Box::new(mqtt_client)) {
        Ok(device) => device,
        Err(err) => {
            tracing::error!(error = %err, "failed to construct device");
            return 1;
        }
    };

    match device.firmware_version() {
        Ok((ic, ver, rev, support)) => tracing::info!(ic, ver, rev, support, "PN532 firmware version"),
        Err(err) => tracing::warn!(error = %err, "failed to read PN532 firmware version"),
    }

    if let Err(err) = device.publish("event/boot", serde_json::json!({})) {
        tracing::error!(error = %err, "failed to publish event/boot");
        return 1;
    }
    if let Err(err) = device.subscribe_control_requests() {
        tracing::error!(error = %err, "failed to subscribe to control/request");
        return 1;
    }

    let request_topic = format!("tapper/{device_id}/control/request");
    let device = Arc::new(device);
    let system_metrics = Box::new(metrics::SysinfoMetrics::new());

    match tapper::supervisor::run(device, request_topic, Box::new(mqtt_connection), system_metrics).await {
        Ok(()) => {
            tracing::info!("clean shutdown");
            0
        }
        Err(err) => {
            tracing::error!(error = %err, "supervisor exited with an error");
            1
        }
    }
}

/// Assembles the PN532, GPIO and LED handles (spec.md §4.1 steps 1–4).
fn build_hardware(pin_map: &PinMap) -> Result<DeviceComponents, DeviceError> {
    let mut chip = gpio::open_default_chip()?;

    let nfc = pn532::Pn532Adapter::open(&mut chip, DEFAULT_SPI_PATH, NFC_CS_LINE)?;
    let tamper_input = gpio::GpioInput::request(&mut chip, pin_map.tamper, "tapper-tamper")?;
    let buzzer = gpio::GpioOutput::request(&mut chip, pin_map.buzzer, "tapper-buzzer", false)?;
    let led = gpio::GpioRgb::request(&mut chip, pin_map.led_red, pin_map.led_green, pin_map.led_blue, "tapper-led")?;
    let relay = gpio::GpioOutput::request(&mut chip, pin_map.relay, "tapper-relay", false)?;

    Ok(DeviceComponents {
        nfc: Box::new(nfc),
        tamper_input: Some(Box::new(tamper_input)),
        buzzer: Box::new(buzzer),
        led: Box::new(led),
        relay: Box::new(relay),
    })
}
