use crate::analyzer::Features;
use crate::config::Quality;
use crate::params::Parameters;
use crate::render::color::{self, ColorMode};
use crate::render::noise::NoiseProfile;
use crate::render::pattern::Pattern;

/// Per-frame constants derived once from `Parameters`, shared read-only by every worker.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    pub time: f32,
    pub zoom: f32,
    pub sin_rot: f32,
    pub cos_rot: f32,
    pub noise_scale: f32,
    pub warp_strength: f32,
    pub detail_weight: f32,
    pub amplitude: f32,
    pub inv_gamma: f32,
    pub inv_contrast: f32,
    pub brightness: f32,
    pub vignette: f32,
    pub vignette_soft: f32,
    pub glyph_sharpness: f32,
    pub swirl_strength: f32,
    pub quality: Quality,
    pub noise: NoiseProfile,
}

impl FrameContext {
    pub fn new(p: &Parameters, quality: Quality, detail_mix: f32) -> Self {
        let time = p.time;
        let mut zoom = 1.0 + p.beat_zoom * 0.35 * (time * 2.1).sin();
        let (sin_rot, cos_rot) = (time * 0.2).sin_cos();
        let mut warp_strength = p.noise_strength * 0.35;
        let mut detail_weight = clamp(detail_mix * p.noise_strength, 0.0, 1.0);
        let mut swirl_strength = p.distort_amplitude * (0.5 + p.beat_distortion * 0.5);

        match quality {
            Quality::Eco => {
                zoom = lerp(1.0, zoom, 0.5);
                detail_weight = 0.0;
                warp_strength = 0.0;
                swirl_strength = 0.0;
            }
            Quality::Balanced => {
                detail_weight *= 0.85;
                warp_strength *= 0.9;
                swirl_strength *= 0.95;
            }
            Quality::High => {}
        }

        Self {
            time,
            zoom,
            sin_rot,
            cos_rot,
            noise_scale: (p.noise_scale * 40.0).max(0.001),
            warp_strength,
            detail_weight,
            amplitude: clamp(p.amplitude, 0.0, 3.0),
            inv_gamma: 1.0 / p.gamma.max(0.1),
            inv_contrast: 1.0 / p.contrast.max(0.2),
            brightness: clamp(p.brightness, 0.0, 3.0),
            vignette: clamp(p.vignette, 0.0, 1.0),
            vignette_soft: clamp(p.vignette_softness, 0.0, 1.0),
            glyph_sharpness: p.glyph_sharpness.max(0.2),
            swirl_strength,
            quality,
            noise: NoiseProfile::for_quality(quality),
        }
    }

    fn swirl_gain(&self) -> f32 {
        match self.quality {
            Quality::Eco => 0.55,
            Quality::Balanced => 0.85,
            Quality::High => 1.0,
        }
    }

    fn warp_gain(&self) -> f32 {
        match self.quality {
            Quality::Eco => 0.35,
            Quality::Balanced => 0.7,
            Quality::High => 1.0,
        }
    }
}

/// Everything a cell needs besides its coordinates.
#[derive(Clone, Copy)]
pub struct Shader<'a> {
    pub ctx: FrameContext,
    pub params: &'a Parameters,
    pub features: &'a Features,
    pub pattern: Pattern,
    pub color_mode: ColorMode,
    /// `Some(activation)` when audio-reactive coloring is on.
    pub activation: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSample {
    /// Palette position in `[0, 1]`.
    pub glyph: f32,
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

impl Shader<'_> {
    /// Evaluates one cell at normalized, scale-adjusted coordinates `(vx, vy)`.
    pub fn sample(&self, vx: f32, vy: f32) -> CellSample {
        let ctx = &self.ctx;
        let t = ctx.time;

        let bx = vx * ctx.zoom;
        let by = vy * ctx.zoom;
        let rx = bx * ctx.cos_rot - by * ctx.sin_rot;
        let ry = bx * ctx.sin_rot + by * ctx.cos_rot;

        let mut radius = rx.hypot(ry);
        let mut angle = ry.atan2(rx);
        if ctx.swirl_strength != 0.0 {
            let s = ctx.swirl_strength * ctx.swirl_gain();
            angle += s * (-radius * 1.6).exp() * (t * 1.5 + radius * 2.3).sin();
            radius += s * 0.12 * (t * 1.15 + angle * 1.4).sin();
        }
        let (sin_a, cos_a) = angle.sin_cos();
        let mut dx = radius * cos_a;
        let mut dy = radius * sin_a;

        if ctx.warp_strength > 0.0 {
            let warp = ctx.noise.fractal(
                (vx + t * 0.15) / ctx.noise_scale,
                (vy - t * 0.12) / ctx.noise_scale,
            );
            let strength = ctx.warp_strength * ctx.warp_gain();
            dx += warp * strength;
            dy += warp * strength;
        }

        let mut combined = self.pattern.eval(dx, dy, self.params, t);
        if ctx.detail_weight > 0.0 {
            let detail = ctx.noise.fractal(
                (vx - t * 0.09) / ctx.noise_scale + 17.3,
                (vy + t * 0.07) / ctx.noise_scale - 5.1,
            );
            combined = lerp(combined, detail, ctx.detail_weight);
        }
        let combined = clamp(combined, -1.0, 1.0);

        let mut b = clamp01((combined * ctx.amplitude + 1.0) * 0.5);
        b = match ctx.quality {
            Quality::Eco => b * (0.7 + b * 0.3),
            _ => b.powf(ctx.inv_gamma).powf(ctx.inv_contrast),
        };
        b = clamp01(b * ctx.brightness);

        if let Some(act) = self.activation {
            b = clamp01(b * act);
        }

        if ctx.vignette > 0.0 {
            let dist = (vx.hypot(vy) * 2.0).min(1.0);
            let vig = clamp01(1.0 - ctx.vignette * dist.powf(1.2));
            b *= lerp(1.0, vig, 1.0 - ctx.vignette_soft);
        }
        let b = clamp01(b);

        let glyph = match ctx.quality {
            Quality::Eco => b,
            _ => b.powf(ctx.glyph_sharpness),
        };

        let (h, s, v) = self.color_mode.shade(
            combined,
            b,
            self.params.color_shift,
            self.params.saturation,
            self.activation.map(|a| (a, self.features)),
        );
        CellSample { glyph, h, s, v }
    }
}

fn clamp(v: f32, min: f32, max: f32) -> f32 {
    if v.is_nan() {
        return min;
    }
    v.max(min).min(max)
}

fn clamp01(v: f32) -> f32 {
    color::clamp01(v)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}
