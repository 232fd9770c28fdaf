use crate::config::Quality;

/// Octave count for fractal noise, owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseProfile {
    pub octaves: u32,
}

impl NoiseProfile {
    pub fn for_quality(q: Quality) -> Self {
        let octaves = match q {
            Quality::Eco => 1,
            Quality::Balanced => 2,
            Quality::High => 4,
        };
        Self { octaves }
    }

    /// Fractal value noise in `[-1, 1]`.
    pub fn fractal(self, x: f32, y: f32) -> f32 {
        let octaves = self.octaves.max(1);
        let mut amp = 0.5f32;
        let mut freq = 1.0f32;
        let mut total = 0.0f32;
        let mut sum_amp = 0.0f32;
        for _ in 0..octaves {
            total += value_noise(x * freq, y * freq) * amp;
            sum_amp += amp;
            amp *= 0.5;
            freq *= 2.0;
        }
        (total / sum_amp) * 2.0 - 1.0
    }
}

impl Default for NoiseProfile {
    fn default() -> Self {
        Self::for_quality(Quality::default())
    }
}

/// Bilinear, smoothstep-eased lattice noise in `[0, 1)`.
pub fn value_noise(x: f32, y: f32) -> f32 {
    let x0 = x.floor();
    let y0 = y.floor();
    let sx = smoothstep(x - x0);
    let sy = smoothstep(y - y0);

    let n00 = hash2(x0, y0);
    let n10 = hash2(x0 + 1.0, y0);
    let n01 = hash2(x0, y0 + 1.0);
    let n11 = hash2(x0 + 1.0, y0 + 1.0);

    let top = lerp(n00, n10, sx);
    let bottom = lerp(n01, n11, sx);
    lerp(top, bottom, sy)
}

/// Integer lattice hash (splitmix-style finalizer) mapped to `[0, 1)`.
pub fn hash2(x: f32, y: f32) -> f32 {
    let xi = x as i64;
    let yi = y as i64;
    let mut n = ((xi as u64) << 32) ^ (yi as u32 as u64);
    n = (n ^ (n >> 33)).wrapping_mul(0xff51_afd7_ed55_8ccd);
    n = (n ^ (n >> 33)).wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    n ^= n >> 33;
    (n & 0x00FF_FFFF) as f32 / 16_777_216.0
}

#[inline]
fn smoothstep(v: f32) -> f32 {
    v * v * (3.0 - 2.0 * v)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}
