//! One-Wire Backlight Control Tool
//!
//! CLI for driving the one-wire display backlight during bring-up and
//! diagnostics. Stands in for the host light service.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use onewire_light_hw::{
    BacklightDevice, Calibration, LightState, BACKLIGHT_DEVICE_PATH, LIGHT_ID_BACKLIGHT,
    PANEL_INFO_PATH,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "onewirectl")]
#[command(about = "Control tool for the one-wire display backlight")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Backlight device node
    #[arg(long, default_value = BACKLIGHT_DEVICE_PATH)]
    device: String,

    /// Panel descriptor file
    #[arg(long, default_value = PANEL_INFO_PATH)]
    panel_info: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a color as backlight brightness
    Set {
        /// Color in hex format (e.g., #FFFFFF for full brightness)
        color: String,
    },
    /// Switch the backlight off
    Off,
    /// Write a raw hardware code, bypassing the calibration curve
    Raw {
        /// Hardware code (0-127 nominal)
        code: i32,
    },
    /// Show the detected panel and calibration
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    match &cli.command {
        Commands::Set { color } => {
            let color = parse_color(color)?;
            let backlight = open_backlight(&cli)?;
            backlight
                .set_light(LightState::new(color))
                .context("Failed to set backlight")?;
            println!("backlight brightness {}", backlight.last_brightness());
        }
        Commands::Off => {
            let backlight = open_backlight(&cli)?;
            backlight
                .set_light(LightState::new(0))
                .context("Failed to switch backlight off")?;
            println!("backlight off");
        }
        Commands::Raw { code } => {
            let backlight = open_backlight(&cli)?;
            backlight
                .write_raw(*code)
                .context("Failed to write hardware code")?;
            println!("hardware code {code}");
        }
        Commands::Info => {
            let calibration = Calibration::load_from(&cli.panel_info);
            if calibration.is_calibrated() {
                println!("panel: {}", calibration.panel_id());
                println!("firmware: {}", calibration.firmware_version());
                println!("low-end scale: {:.1}", calibration.scale_low());
            } else {
                println!("no panel descriptor at {}", cli.panel_info);
            }
        }
    }

    Ok(())
}

fn open_backlight(cli: &Cli) -> Result<BacklightDevice> {
    BacklightDevice::open_with(LIGHT_ID_BACKLIGHT, &cli.panel_info, &cli.device)
        .context("Failed to open backlight")
}

/// Parses a hex color string (#RRGGBB, RRGGBB, or 0xAARRGGBB).
fn parse_color(s: &str) -> Result<u32> {
    let hex = s.trim().trim_start_matches('#');
    let hex = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X")).unwrap_or(hex);
    if hex.is_empty() || hex.len() > 8 {
        bail!("invalid color: {s}");
    }
    u32::from_str_radix(hex, 16).with_context(|| format!("invalid color: {s}"))
}
