//! Panel identification and backlight calibration.
//!
//! The one-wire driver reports a small descriptor naming the installed panel
//! and its firmware revision. The panel id selects a low-end scale factor for
//! the brightness curve. Unrecognized panels fall back to a neutral 1.0; a
//! missing or garbled descriptor leaves the module uncalibrated, in which
//! case the backlight is never driven.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use tracing::debug;

use crate::PANEL_INFO_PATH;

/// Low-end scale factor per panel id, first match wins.
const SCALE_MAP: [(u32, f32); 2] = [(24, 0.5), (28, 2.0)];

/// Neutral scale for panels not in the map.
const DEFAULT_SCALE: f32 = 1.0;

/// Panel id marking the uncalibrated state.
const PANEL_UNSET: u32 = 0;

/// Descriptor reads are capped at this many leading bytes.
const DESCRIPTOR_MAX_LEN: usize = 255;

static GLOBAL: OnceLock<Calibration> = OnceLock::new();

/// Hardware descriptor reported by the one-wire driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelDescriptor {
    pub panel_id: u32,
    pub firmware_version: u32,
}

impl PanelDescriptor {
    /// Parses the leading `<panel_id> <firmware_version>` fields.
    ///
    /// Returns `None` unless both integers are present.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut fields = raw.split_whitespace();
        let panel_id = fields.next()?.parse().ok()?;
        let firmware_version = fields.next()?.parse().ok()?;
        Some(Self {
            panel_id,
            firmware_version,
        })
    }
}

/// Calibration selected for the installed panel.
///
/// `is_calibrated` is false when no usable descriptor was found; setters
/// treat that as a no-panel state and suppress device writes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    panel_id: u32,
    firmware_version: u32,
    scale_low: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            panel_id: PANEL_UNSET,
            firmware_version: 0,
            scale_low: DEFAULT_SCALE,
        }
    }
}

impl Calibration {
    /// Calibration from the fixed descriptor path, loaded once per process.
    ///
    /// Concurrent first callers all observe the same fully-loaded value.
    pub fn global() -> &'static Calibration {
        GLOBAL.get_or_init(|| Self::load_from(PANEL_INFO_PATH))
    }

    /// Reads and parses a descriptor file.
    ///
    /// Best-effort: a missing file, short read, or unparseable content yields
    /// the uncalibrated default rather than an error.
    pub fn load_from(path: impl AsRef<Path>) -> Calibration {
        let Some(descriptor) = read_descriptor(path.as_ref()) else {
            debug!("no usable panel descriptor, backlight uncalibrated");
            return Calibration::default();
        };

        let scale_low = scale_for(descriptor.panel_id);
        debug!(
            "one-wire backlight: LCD {:2} (param. {:.1})",
            descriptor.panel_id, scale_low
        );

        Calibration {
            panel_id: descriptor.panel_id,
            firmware_version: descriptor.firmware_version,
            scale_low,
        }
    }

    /// Whether a panel descriptor was successfully loaded.
    pub fn is_calibrated(&self) -> bool {
        self.panel_id != PANEL_UNSET
    }

    /// Reported panel id, 0 when uncalibrated.
    pub fn panel_id(&self) -> u32 {
        self.panel_id
    }

    /// Reported firmware revision.
    pub fn firmware_version(&self) -> u32 {
        self.firmware_version
    }

    /// Low-end scale factor for the brightness curve.
    pub fn scale_low(&self) -> f32 {
        self.scale_low
    }
}

/// Scale factor for a panel id, neutral for panels not in the map.
fn scale_for(panel_id: u32) -> f32 {
    SCALE_MAP
        .iter()
        .find(|(id, _)| *id == panel_id)
        .map(|(_, scale)| *scale)
        .unwrap_or(DEFAULT_SCALE)
}

fn read_descriptor(path: &Path) -> Option<PanelDescriptor> {
    let mut file = File::open(path).ok()?;
    let mut buf = [0u8; DESCRIPTOR_MAX_LEN];
    let len = file.read(&mut buf).ok()?;
    if len == 0 {
        return None;
    }
    PanelDescriptor::parse(&String::from_utf8_lossy(&buf[..len]))
}
