//! Backlight device lifecycle and driver writes.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use crate::brightness::{hardware_code, LightState};
use crate::calibration::Calibration;
use crate::error::{Error, Result};
use crate::{BACKLIGHT_DEVICE_PATH, LIGHT_ID_BACKLIGHT};

/// Handle to the one-wire backlight, owned by the host light service.
///
/// Carries the calibration selected at open time and the last brightness the
/// host applied. The lock serializes concurrent setters end-to-end, device
/// write included; the device node itself is opened and closed per write.
#[derive(Debug)]
pub struct BacklightDevice {
    device_path: PathBuf,
    calibration: Calibration,
    last_brightness: Mutex<u8>,
}

impl BacklightDevice {
    /// Opens the backlight for the given capability name.
    ///
    /// Only [`LIGHT_ID_BACKLIGHT`] is served; any other name is rejected.
    /// Panel calibration is loaded from the fixed descriptor path the first
    /// time any handle opens and reused for the rest of the process.
    pub fn open(name: &str) -> Result<Self> {
        if name != LIGHT_ID_BACKLIGHT {
            return Err(Error::UnsupportedLight(name.to_string()));
        }

        let calibration = *Calibration::global();
        info!(
            "backlight opened (panel {}, scale {:.1})",
            calibration.panel_id(),
            calibration.scale_low()
        );

        Ok(Self::with_calibration(calibration, BACKLIGHT_DEVICE_PATH))
    }

    /// Opens the backlight with explicit descriptor and device paths.
    ///
    /// Calibration is read fresh from `panel_info` rather than the
    /// process-wide descriptor. Bring-up and test path.
    pub fn open_with(
        name: &str,
        panel_info: impl AsRef<Path>,
        device: impl AsRef<Path>,
    ) -> Result<Self> {
        if name != LIGHT_ID_BACKLIGHT {
            return Err(Error::UnsupportedLight(name.to_string()));
        }

        let calibration = Calibration::load_from(panel_info);
        Ok(Self::with_calibration(calibration, device.as_ref()))
    }

    fn with_calibration(calibration: Calibration, device: impl Into<PathBuf>) -> Self {
        Self {
            device_path: device.into(),
            calibration,
            last_brightness: Mutex::new(255),
        }
    }

    /// Applies a light state: derive brightness, remap, write to the driver.
    ///
    /// Succeeds without touching the device when the panel is uncalibrated.
    pub fn set_light(&self, state: LightState) -> Result<()> {
        let brightness = state.brightness();

        let mut last = self.last_brightness.lock().unwrap();
        *last = brightness;

        if !self.calibration.is_calibrated() {
            return Ok(());
        }

        let code = hardware_code(i32::from(brightness), self.calibration.scale_low());
        debug!("set backlight {:3}, HW: {}", brightness, code);

        self.write_code(code)
    }

    /// Writes a hardware code straight to the driver, bypassing the
    /// calibration curve. Writes even when uncalibrated.
    pub fn write_raw(&self, code: i32) -> Result<()> {
        let _last = self.last_brightness.lock().unwrap();
        debug!("raw backlight write, HW: {}", code);
        self.write_code(code)
    }

    /// Last brightness applied through this handle.
    pub fn last_brightness(&self) -> u8 {
        *self.last_brightness.lock().unwrap()
    }

    /// Calibration this handle was opened with.
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Device node this handle writes to.
    pub fn device_path(&self) -> &Path {
        &self.device_path
    }

    fn write_code(&self, code: i32) -> Result<()> {
        let mut device = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.device_path)?;
        device.write_all(format!("{code}\n").as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brightness::rgb_to_brightness;
    use std::fs;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn test_rejects_unknown_capability() {
        let err = BacklightDevice::open("notifications").unwrap_err();
        assert!(matches!(err, Error::UnsupportedLight(_)));
        assert_eq!(err.to_errno(), -libc::EINVAL);

        let err =
            BacklightDevice::open_with("notifications", "/nonexistent", "/nonexistent").unwrap_err();
        assert!(matches!(err, Error::UnsupportedLight(_)));
    }

    #[test]
    fn test_open_targets_fixed_device_node() {
        let backlight = BacklightDevice::open(LIGHT_ID_BACKLIGHT).unwrap();
        assert_eq!(backlight.device_path(), Path::new(BACKLIGHT_DEVICE_PATH));
    }

    #[test]
    fn test_uncalibrated_suppresses_device_write() {
        let dir = tempdir().unwrap();
        let device = dir.path().join("backlight");
        fs::write(&device, "").unwrap();

        let backlight = BacklightDevice::open_with(
            LIGHT_ID_BACKLIGHT,
            dir.path().join("missing-info"),
            &device,
        )
        .unwrap();

        backlight.set_light(LightState::new(0x00ff_ffff)).unwrap();
        assert_eq!(fs::read_to_string(&device).unwrap(), "");
        assert_eq!(backlight.last_brightness(), 255);
    }

    #[test]
    fn test_calibrated_write_payload() {
        let dir = tempdir().unwrap();
        let info = dir.path().join("one-wire-info");
        fs::write(&info, "24 7\n").unwrap();
        let device = dir.path().join("backlight");
        fs::write(&device, "").unwrap();

        let backlight = BacklightDevice::open_with(LIGHT_ID_BACKLIGHT, &info, &device).unwrap();
        backlight.set_light(LightState::new(0x00ff_ffff)).unwrap();

        assert_eq!(fs::read_to_string(&device).unwrap(), "128\n");
        assert_eq!(backlight.last_brightness(), 255);
    }

    #[test]
    fn test_raw_write_payload() {
        let dir = tempdir().unwrap();
        let info = dir.path().join("one-wire-info");
        fs::write(&info, "28 1\n").unwrap();
        let device = dir.path().join("backlight");
        fs::write(&device, "").unwrap();

        let backlight = BacklightDevice::open_with(LIGHT_ID_BACKLIGHT, &info, &device).unwrap();
        backlight.write_raw(64).unwrap();

        assert_eq!(fs::read_to_string(&device).unwrap(), "64\n");
    }

    #[test]
    fn test_missing_device_reports_errno() {
        let dir = tempdir().unwrap();
        let info = dir.path().join("one-wire-info");
        fs::write(&info, "28 1\n").unwrap();

        let backlight = BacklightDevice::open_with(
            LIGHT_ID_BACKLIGHT,
            &info,
            dir.path().join("missing-device"),
        )
        .unwrap();

        let err = backlight.set_light(LightState::new(0x0080_8080)).unwrap_err();
        assert_eq!(err.to_errno(), -libc::ENOENT);
    }

    #[test]
    fn test_concurrent_setters_serialize() {
        let dir = tempdir().unwrap();
        let info = dir.path().join("one-wire-info");
        fs::write(&info, "28 1\n").unwrap();
        let device = dir.path().join("backlight");
        fs::write(&device, "").unwrap();

        let backlight = Arc::new(
            BacklightDevice::open_with(LIGHT_ID_BACKLIGHT, &info, &device).unwrap(),
        );

        // gray levels whose hardware codes are all the same width, so a torn
        // or interleaved write would change the payload length
        let grays: Vec<u32> = (64..72).map(|v| (v << 16) | (v << 8) | v).collect();

        let handles: Vec<_> = grays
            .iter()
            .map(|&color| {
                let backlight = Arc::clone(&backlight);
                thread::spawn(move || backlight.set_light(LightState::new(color)).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let payload = fs::read_to_string(&device).unwrap();
        let expected: Vec<String> = grays
            .iter()
            .map(|&color| {
                format!(
                    "{}\n",
                    hardware_code(i32::from(rgb_to_brightness(color)), 2.0)
                )
            })
            .collect();
        assert!(expected.contains(&payload), "unexpected payload {payload:?}");
        assert!(grays
            .iter()
            .any(|&color| rgb_to_brightness(color) == backlight.last_brightness()));
    }
}
