use crate::analyzer::Features;
use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorMode {
    #[default]
    Chromatic,
    Fire,
    Aurora,
    Mono,
}

impl ColorMode {
    pub const ALL: [ColorMode; 4] = [
        ColorMode::Chromatic,
        ColorMode::Fire,
        ColorMode::Aurora,
        ColorMode::Mono,
    ];

    /// Lenient lookup with aliases; anything unknown is chromatic.
    pub fn resolve(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "fire" => Self::Fire,
            "aurora" | "cool" => Self::Aurora,
            "mono" | "monochrome" | "bw" | "gray" => Self::Mono,
            _ => Self::Chromatic,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Chromatic => "chromatic",
            Self::Fire => "fire",
            Self::Aurora => "aurora",
            Self::Mono => "mono",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Chromatic => "CHROMATIC",
            Self::Fire => "FIRE",
            Self::Aurora => "AURORA",
            Self::Mono => "MONO",
        }
    }

    /// HSV for a cell from its combined pattern value (`[-1, 1]`) and final brightness.
    /// `activation` is `Some` when audio-reactive coloring is on.
    pub fn shade(
        self,
        combined: f32,
        brightness: f32,
        color_shift: f32,
        saturation: f32,
        audio: Option<(f32, &Features)>,
    ) -> (f32, f32, f32) {
        let base = clamp01((combined + 1.0) * 0.5);
        let shift = fract01(color_shift / TAU);

        let (h, mut s, mut v) = match self {
            Self::Fire => (
                clamp01(0.02 + base * 0.08 + shift * 0.1),
                clamp01(0.7 + brightness * 0.25),
                clamp01(0.35 + brightness * 0.8 + base * 0.2),
            ),
            Self::Aurora => (
                clamp01(0.45 + base * 0.25 + shift * 0.3),
                clamp01(0.45 + saturation * 0.45),
                clamp01(0.28 + brightness * 0.85 + base * 0.12),
            ),
            Self::Mono => (shift, 0.0, clamp01(brightness)),
            Self::Chromatic => {
                // Neon bands: red through cyan, then blue through pink.
                let hb = fract01(shift + base * 0.35);
                let h = if hb < 0.5 { hb * 0.6 } else { 0.5 + (hb - 0.5) * 0.7 };
                (
                    h,
                    clamp01(0.85 + saturation * 0.15),
                    clamp01(brightness * 0.95 + base * 0.15),
                )
            }
        };

        if let Some((activation, features)) = audio {
            let act = if features.is_drop {
                clamp01(activation + 0.2)
            } else {
                activation
            };
            s = clamp01(0.75 + act * 0.25);
            v = clamp01(v * act);
            if v < 0.01 {
                v = 0.0;
            }
        }
        (h, s, v)
    }
}

pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    if s <= 0.0 {
        return (v, v, v);
    }
    let h = fract01(h) * 6.0;
    let i = h.floor() as i32;
    let f = h - i as f32;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match i.rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// Nearest xterm-256 index in the 6x6x6 cube (grays excluded).
pub fn rgb_to_ansi256(r: f32, g: f32, b: f32) -> u8 {
    let level = |c: f32| (clamp01(c) * 5.999) as u8;
    16 + 36 * level(r) + 6 * level(g) + level(b)
}

pub fn hsv_to_ansi256(h: f32, s: f32, v: f32) -> u8 {
    let (r, g, b) = hsv_to_rgb(h, s, v);
    rgb_to_ansi256(r, g, b)
}

pub fn hsv_to_rgb8(h: f32, s: f32, v: f32) -> [u8; 3] {
    let (r, g, b) = hsv_to_rgb(h, s, v);
    [
        (clamp01(r) * 255.0) as u8,
        (clamp01(g) * 255.0) as u8,
        (clamp01(b) * 255.0) as u8,
    ]
}

/// Audio activation scalar in `[0, 1]`.
pub fn activation(features: &Features) -> f32 {
    let drop = if features.is_drop { 0.3 } else { 0.0 };
    clamp01(features.overall * 1.45 + features.beat_strength * 0.6 + drop)
}

pub fn fract01(x: f32) -> f32 {
    let f = x - x.floor();
    if f < 0.0 { f + 1.0 } else { f }
}

#[inline]
pub fn clamp01(v: f32) -> f32 {
    if v < 0.0 {
        0.0
    } else if v > 1.0 {
        1.0
    } else {
        v
    }
}
