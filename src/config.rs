use anyhow::bail;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Overrides `--quality auto` with a fixed preset name.
pub const QUALITY_ENV: &str = "GLYPHWAVE_QUALITY";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "glyphwave",
    version,
    about = "Audio-reactive procedural glyph visualizer for the terminal"
)]
pub struct Config {
    /// Cell columns; defaults to the terminal width.
    #[arg(long)]
    pub width: Option<u16>,

    /// Cell rows; defaults to the terminal height.
    #[arg(long)]
    pub height: Option<u16>,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Render every Nth tick.
    #[arg(long, default_value_t = 1)]
    pub stride: u32,

    /// Pixel backend resolution scale; values below 1 downsample.
    #[arg(long, default_value_t = 1.0)]
    pub scale: f32,

    #[arg(long, value_enum, default_value_t = Backend::Ascii)]
    pub backend: Backend,

    /// Render quality; `auto` picks one from the host CPU.
    #[arg(long, value_enum, default_value_t = QualityPreset::Auto)]
    pub quality: QualityPreset,

    #[arg(long, default_value = "default")]
    pub palette: String,

    #[arg(long, default_value = "plasma")]
    pub pattern: String,

    #[arg(long, default_value = "chromatic")]
    pub color_mode: String,

    /// Disable ANSI colors in the ASCII backend.
    #[arg(long, default_value_t = false)]
    pub no_color: bool,

    /// Gate color and brightness by audio activation.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub color_on_audio: bool,

    /// Samples of audio history kept for analysis.
    #[arg(long, default_value_t = 2048)]
    pub buffer_size: usize,

    #[arg(long, default_value_t = 60)]
    pub history_size: usize,

    /// Overall energy below this is treated as silence (0 disables).
    #[arg(long, default_value_t = 0.20)]
    pub noise_floor: f32,

    /// Drive visuals from the synthetic feature generator.
    #[arg(long, default_value_t = false)]
    pub no_audio: bool,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, default_value_t = false)]
    pub auto_randomize: bool,

    /// Seconds between automatic randomizations.
    #[arg(long, default_value_t = 10.0)]
    pub randomize_interval: f32,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub status: bool,

    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Write the final state snapshot here as JSON on exit.
    #[arg(long)]
    pub status_json: Option<PathBuf>,

    /// Append per-frame section timings as CSV.
    #[arg(long)]
    pub profile_log: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    #[value(alias = "ansi", alias = "text")]
    Ascii,
    #[value(alias = "halfblock", alias = "half-block", alias = "pixels")]
    Pixel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Eco,
    #[default]
    Balanced,
    High,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::High, Quality::Balanced, Quality::Eco];

    pub fn lookup(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "eco" | "low" | "pi" => Some(Self::Eco),
            "balanced" | "medium" | "mid" => Some(Self::Balanced),
            "high" | "full" | "max" => Some(Self::High),
            _ => None,
        }
    }

    /// Lenient lookup for names coming from a control surface; unknown names map to balanced.
    pub fn from_name(name: &str) -> Self {
        Self::lookup(name).unwrap_or_default()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Eco => "eco",
            Self::Balanced => "balanced",
            Self::High => "high",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Eco => Self::Balanced,
            Self::Balanced => Self::High,
            Self::High => Self::Eco,
        }
    }
}

/// `--quality` as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum QualityPreset {
    #[default]
    Auto,
    #[value(alias = "low", alias = "pi")]
    Eco,
    #[value(alias = "medium", alias = "mid")]
    Balanced,
    #[value(alias = "full", alias = "max")]
    High,
}

impl QualityPreset {
    /// Resolves against `GLYPHWAVE_QUALITY` and the current machine.
    pub fn resolve(self) -> anyhow::Result<Quality> {
        let env = std::env::var(QUALITY_ENV).ok();
        self.resolve_with(env.as_deref(), Host::detect())
    }

    pub fn resolve_with(self, env: Option<&str>, host: Host) -> anyhow::Result<Quality> {
        match self {
            Self::Eco => Ok(Quality::Eco),
            Self::Balanced => Ok(Quality::Balanced),
            Self::High => Ok(Quality::High),
            Self::Auto => {
                let name = env.map(str::trim).unwrap_or_default();
                if name.is_empty() || name.eq_ignore_ascii_case("auto") {
                    return Ok(host.quality());
                }
                match Quality::lookup(name) {
                    Some(q) => Ok(q),
                    None => bail!("unknown quality preset {name:?} in {QUALITY_ENV}"),
                }
            }
        }
    }
}

/// The bits of the machine that decide the automatic quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Host {
    pub cores: usize,
    pub arm: bool,
}

impl Host {
    pub fn detect() -> Self {
        Self {
            cores: std::thread::available_parallelism().map_or(1, |n| n.get()),
            arm: cfg!(any(target_arch = "arm", target_arch = "aarch64")),
        }
    }

    /// Small ARM boards get eco; four cores or fewer elsewhere get balanced.
    pub fn quality(self) -> Quality {
        match (self.arm, self.cores <= 4) {
            (true, true) => Quality::Eco,
            (true, false) | (false, true) => Quality::Balanced,
            (false, false) => Quality::High,
        }
    }
}
