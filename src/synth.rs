use crate::analyzer::Features;

/// Plausible-looking features without an audio device: three detuned sines plus jitter,
/// with occasional forced beats and rare drops.
pub struct SyntheticFeatures {
    rng: fastrand::Rng,
    phase_bass: f32,
    phase_mid: f32,
    phase_high: f32,
}

impl SyntheticFeatures {
    pub fn new() -> Self {
        Self::from_rng(fastrand::Rng::new())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(fastrand::Rng::with_seed(seed))
    }

    fn from_rng(rng: fastrand::Rng) -> Self {
        Self {
            rng,
            phase_bass: 0.0,
            phase_mid: 0.0,
            phase_high: 0.0,
        }
    }

    pub fn next(&mut self, dt: f32) -> Features {
        self.phase_bass += dt * 0.7;
        self.phase_mid += dt * 1.2;
        self.phase_high += dt * 2.1;

        let bass = clamp01(0.5 + 0.5 * self.phase_bass.sin() + self.rng.f32() * 0.1);
        let mid = clamp01(0.4 + 0.4 * (self.phase_mid + 0.5).sin() + self.rng.f32() * 0.1);
        let treble = clamp01(0.3 + 0.3 * (self.phase_high + 1.0).sin() + self.rng.f32() * 0.1);

        let mut beat = (self.phase_bass * 2.0).sin().max(0.0);
        if self.rng.f32() < 0.02 {
            beat = 1.0;
        }
        let is_drop = self.rng.f32() < 0.005;

        Features {
            bass,
            mid,
            treble,
            overall: (bass + mid + treble) / 3.0,
            beat_strength: clamp01(beat + self.rng.f32() * 0.1),
            is_drop,
        }
    }
}

impl Default for SyntheticFeatures {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}
