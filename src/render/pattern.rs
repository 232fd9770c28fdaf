use crate::params::Parameters;
use crate::render::noise::hash2;

/// Named scalar fields evaluated per cell. Output is roughly `[-1, 1]` before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Pattern {
    #[default]
    Plasma,
    Dots,
    Flash,
    Grid,
    Spark,
    Pulse,
    Scatter,
    Beam,
    Ripple,
    Strobe,
    Particle,
    Laser,
    Waves,
    Orbit,
    Explosion,
}

impl Pattern {
    pub const ALL: [Pattern; 15] = [
        Pattern::Plasma,
        Pattern::Dots,
        Pattern::Flash,
        Pattern::Grid,
        Pattern::Spark,
        Pattern::Pulse,
        Pattern::Scatter,
        Pattern::Beam,
        Pattern::Ripple,
        Pattern::Strobe,
        Pattern::Particle,
        Pattern::Laser,
        Pattern::Waves,
        Pattern::Orbit,
        Pattern::Explosion,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Plasma => "plasma",
            Self::Dots => "dots",
            Self::Flash => "flash",
            Self::Grid => "grid",
            Self::Spark => "spark",
            Self::Pulse => "pulse",
            Self::Scatter => "scatter",
            Self::Beam => "beam",
            Self::Ripple => "ripple",
            Self::Strobe => "strobe",
            Self::Particle => "particle",
            Self::Laser => "laser",
            Self::Waves => "waves",
            Self::Orbit => "orbit",
            Self::Explosion => "explosion",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let key = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|p| p.name() == key)
    }

    /// Unknown or empty names resolve to the default pattern.
    pub fn resolve(name: &str) -> Self {
        Self::from_name(name).unwrap_or_default()
    }

    /// Weight of the fractal detail layer blended over this pattern.
    pub fn detail_mix(self) -> f32 {
        match self {
            Self::Plasma
            | Self::Spark
            | Self::Ripple
            | Self::Particle
            | Self::Waves
            | Self::Explosion => 0.1,
            _ => 0.0,
        }
    }

    pub fn eval(self, x: f32, y: f32, p: &Parameters, t: f32) -> f32 {
        let f = p.frequency;
        match self {
            Self::Plasma => {
                let a = (x * f + t).sin();
                let b = (y * f * 1.13 - t * 1.1).sin();
                let c = ((x + y) * f * 0.77 + t * 0.7).sin();
                let d = ((x * x + y * y).sqrt() * f - t * 1.3).sin();
                (a + b + c + d) * 0.25 * p.amplitude
            }
            Self::Dots => {
                let noise = hash2((x * 3.0).floor(), (y * 3.0).floor());
                let timing = (noise * 6.28 + t * f * 0.5).sin();
                (timing + p.beat_distortion * 3.0 - 0.8).max(0.0) * 5.0
            }
            Self::Flash => {
                let r = x.hypot(y);
                let pulse = (t * f * 2.0).sin() * 0.3;
                (((1.0 - r) + p.beat_distortion * 2.0 + pulse) * 2.0 - 1.0).max(0.0)
            }
            Self::Grid => {
                let gx = (x * f * 0.8 + t * 0.5).sin().abs();
                let gy = (y * f * 0.8 - t * 0.3).sin().abs();
                gx.max(gy).powi(10) * (1.0 + p.amplitude * 0.8)
            }
            Self::Spark => {
                let r = x.hypot(y);
                let rays = (y.atan2(x) * 5.0 + t * 2.0).sin().abs();
                rays / (1.0 + r * 2.0) * (0.5 + p.beat_distortion * 1.5)
            }
            Self::Pulse => {
                let ring = ((x.hypot(y) - t) * f * 2.0).sin().abs();
                ring.powi(5) * (1.0 + p.beat_distortion * 2.0)
            }
            Self::Scatter => {
                let cx = (x * 5.0 + t.sin() * 2.0).floor();
                let cy = (y * 5.0 + (t * 0.8).cos() * 2.0).floor();
                let noise = hash2(cx, cy);
                let threshold = 0.9 - p.amplitude * 0.3;
                if noise > threshold { (noise - threshold) * 10.0 } else { 0.0 }
            }
            Self::Beam => {
                let pos = (t * f * 0.3).sin() * 0.8;
                let beam = 1.0 / (1.0 + (x - pos).abs() * 10.0);
                beam.powi(3) * p.amplitude * 1.5
            }
            Self::Ripple => {
                let centers = [
                    ((t * 0.3).sin(), (t * 0.4).cos()),
                    ((t * 0.5 + 1.0).sin(), (t * 0.6 - 1.0).cos()),
                ];
                let sum: f32 = centers
                    .iter()
                    .map(|&(cx, cy)| {
                        let r = (x - cx).hypot(y - cy);
                        (r * f * 3.0 - t * 3.0).sin() / (1.0 + r)
                    })
                    .sum();
                sum * p.amplitude
            }
            Self::Strobe => {
                let strobe = ((t * f * 4.0 + p.beat_distortion * 6.28).sin() + 0.5).floor();
                strobe * (1.0 - x.hypot(y) * 0.5)
            }
            Self::Particle => {
                let speed = 0.3 + p.amplitude * 0.4;
                let mut acc = 0.0f32;
                for i in 0..8 {
                    let angle = (i as f32 / 8.0) * 6.28 + t;
                    let px = wrap_unit(angle.sin() * t * speed);
                    let py = wrap_unit(angle.cos() * t * speed);
                    acc += 1.0 / (1.0 + (x - px).hypot(y - py) * 20.0);
                }
                acc * 2.0
            }
            Self::Laser => {
                let angle = t * f * 0.5;
                let line = x * angle.sin() + y * angle.cos();
                1.0 / (1.0 + line.abs() * 50.0) * (0.5 + p.beat_distortion * 2.0)
            }
            Self::Waves => {
                let w1 = (x * f * 0.6 + t).sin();
                let w2 = (y * f * 0.6 - t * 0.7).sin();
                ((w1 + w2) * 0.5).abs().powi(3) * p.amplitude * 2.0
            }
            Self::Orbit => {
                let r = x.hypot(y);
                let orbit = (y.atan2(x) * 3.0 - t * 2.0 + r * 2.0).sin();
                let ring = 1.0 / (1.0 + (r - 0.5).abs() * 10.0);
                orbit * ring * p.amplitude * 2.0
            }
            Self::Explosion => {
                let r = x.hypot(y);
                let wave = (r * f * 2.0 - t * 3.0).sin();
                wave * (-r).exp() * (0.3 + p.beat_distortion * 3.0) * 2.0
            }
        }
    }
}

/// Wraps into `[-2, 2)` so particles re-enter from the opposite edge.
fn wrap_unit(v: f32) -> f32 {
    (v + 2.0).rem_euclid(4.0) - 2.0
}
