//! One-Wire Backlight Hardware Library
//!
//! Hardware abstraction for the one-wire display backlight found on panels
//! driven through `/dev/backlight-1wire`. The host light service hands in an
//! RGB light state; this crate derives a brightness, remaps it through the
//! installed panel's calibration curve, and writes the resulting hardware
//! code to the backlight driver.

pub mod backlight;
pub mod brightness;
pub mod calibration;
pub mod error;

pub use backlight::BacklightDevice;
pub use brightness::LightState;
pub use calibration::{Calibration, PanelDescriptor};
pub use error::{Error, Result};

/// Capability identifier for the display backlight.
pub const LIGHT_ID_BACKLIGHT: &str = "backlight";

/// Panel descriptor exposed by the one-wire driver.
pub const PANEL_INFO_PATH: &str = "/proc/driver/one-wire-info";

/// Character device node of the backlight driver.
pub const BACKLIGHT_DEVICE_PATH: &str = "/dev/backlight-1wire";
