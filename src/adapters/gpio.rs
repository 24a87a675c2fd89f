//! GPIO adapter: buzzer, relay, tamper input and the RGB LED, all driven
//! through the Linux GPIO character device (spec.md §6 pin map).
//!
//! Grounded in `sholiday-musicbox`'s Waveshare display feature stack
//! (same `gpio-cdev` + `linux-embedded-hal` pair, same "GPIO character
//! device path" configuration style) and in `AndrewAltimit-template-repo`'s
//! `tamper-sensor` crate for the tamper-input shape. The RGB LED has no
//! real PWM line available through `gpio-cdev` on the default character
//! device interface, so it is driven as three independent digital lines
//! thresholded at the 0/1 intensities the request processor and tag-ack
//! pattern actually ever ask for (spec.md §3 color enum); see DESIGN.md.

use std::path::Path;

use gpio_cdev::{Chip, LineHandle, LineRequestFlags};

use crate::device::ports::{DigitalInput, DigitalOutput, RgbOutput};
use crate::error::DeviceError;

const DEFAULT_CHIP_PATH: &str = "/dev/gpiochip0";

fn gpio_err(context: &str, err: impl std::fmt::Display) -> DeviceError {
    DeviceError::Gpio(format!("{context}: {err}"))
}

/// Opens the default GPIO character device chip.
pub fn open_default_chip() -> Result<Chip, DeviceError> {
    open_chip(DEFAULT_CHIP_PATH)
}

pub fn open_chip(path: impl AsRef<Path>) -> Result<Chip, DeviceError> {
    Chip::new(path.as_ref()).map_err(|e| gpio_err(&format!("opening {}", path.as_ref().display()), e))
}

/// A single active-high digital output line (buzzer, relay).
pub struct GpioOutput {
    handle: LineHandle,
}

impl GpioOutput {
    /// Requests `line` as an output, driven to `initial` immediately —
    /// the kernel applies the requested default the moment the line is
    /// claimed, so there is no window where the pin floats.
    pub fn request(chip: &mut Chip, line: u32, consumer: &str, initial: bool) -> Result<Self, DeviceError> {
        let handle = chip
            .get_line(line)
            .map_err(|e| gpio_err(&format!("getting line {line}"), e))?
            .request(LineRequestFlags::OUTPUT, initial as u8, consumer)
            .map_err(|e| gpio_err(&format!("requesting line {line} as output"), e))?;
        Ok(Self { handle })
    }
}

impl DigitalOutput for GpioOutput {
    fn set(&mut self, active: bool) -> Result<(), DeviceError> {
        self.handle.set_value(active as u8).map_err(|e| gpio_err("setting output line", e))
    }
}

/// The tamper switch: active-high, requested without an internal pull-up
/// (spec.md §3: "no pull-up assumed from hardware").
pub struct GpioInput {
    handle: LineHandle,
}

impl GpioInput {
    pub fn request(chip: &mut Chip, line: u32, consumer: &str) -> Result<Self, DeviceError> {
        let handle = chip
            .get_line(line)
            .map_err(|e| gpio_err(&format!("getting line {line}"), e))?
            .request(LineRequestFlags::INPUT, 0, consumer)
            .map_err(|e| gpio_err(&format!("requesting line {line} as input"), e))?;
        Ok(Self { handle })
    }
}

impl DigitalInput for GpioInput {
    fn read(&mut self) -> Result<bool, DeviceError> {
        self.handle.get_value().map(|v| v != 0).map_err(|e| gpio_err("reading input line", e))
    }
}

/// The RGB indicator LED as three digital lines (red, green, blue),
/// thresholded at 0.5 since nothing in the request-processor contract
/// ever asks for a fractional intensity (spec.md §3's triplet form is
/// only reachable by the fixed color enum in practice).
pub struct GpioRgb {
    red: LineHandle,
    green: LineHandle,
    blue: LineHandle,
}

impl GpioRgb {
    pub fn request(chip: &mut Chip, red: u32, green: u32, blue: u32, consumer: &str) -> Result<Self, DeviceError> {
        let line = |chip: &mut Chip, offset: u32| -> Result<LineHandle, DeviceError> {
            chip.get_line(offset)
                .map_err(|e| gpio_err(&format!("getting line {offset}"), e))?
                .request(LineRequestFlags::OUTPUT, 0, consumer)
                .map_err(|e| gpio_err(&format!("requesting line {offset} as output"), e))
        };
        Ok(Self { red: line(chip, red)?, green: line(chip, green)?, blue: line(chip, blue)? })
    }
}

impl RgbOutput for GpioRgb {
    fn set_color(&mut self, r: f64, g: f64, b: f64) -> Result<(), DeviceError> {
        self.red.set_value((r >= 0.5) as u8).map_err(|e| gpio_err("setting red line", e))?;
        self.green.set_value((g >= 0.5) as u8).map_err(|e| gpio_err("setting green line", e))?;
        self.blue.set_value((b >= 0.5) as u8).map_err(|e| gpio_err("setting blue line", e))?;
        Ok(())
    }
}
