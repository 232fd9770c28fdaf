use crate::analyzer::Features;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

pub const DEFAULT_PATTERN: &str = "plasma";
pub const DEFAULT_COLOR_MODE: &str = "chromatic";

/// Animation state driven by audio features. Values may overshoot their nominal
/// ranges between ticks; the renderer clamps on consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub time: f32,
    pub frequency: f32,
    pub amplitude: f32,
    pub speed: f32,
    pub scale: f32,
    pub color_shift: f32,
    pub pattern: String,
    pub color_mode: String,
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub gamma: f32,
    pub vignette: f32,
    pub vignette_softness: f32,
    pub glyph_sharpness: f32,
    pub beat_sensitivity: f32,
    pub bass_influence: f32,
    pub mid_influence: f32,
    pub treble_influence: f32,
    pub beat_distortion: f32,
    pub beat_zoom: f32,
    pub distort_amplitude: f32,
    pub noise_strength: f32,
    pub noise_scale: f32,
    pub last_effect_time: f32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            time: 0.0,
            frequency: 6.0,
            amplitude: 0.4,
            speed: 0.05,
            scale: 1.0,
            color_shift: 0.0,
            pattern: DEFAULT_PATTERN.to_string(),
            color_mode: DEFAULT_COLOR_MODE.to_string(),
            brightness: 0.6,
            contrast: 0.8,
            saturation: 0.9,
            gamma: 1.0,
            vignette: 0.25,
            vignette_softness: 0.55,
            glyph_sharpness: 1.0,
            beat_sensitivity: 1.0,
            bass_influence: 0.6,
            mid_influence: 0.35,
            treble_influence: 0.25,
            beat_distortion: 0.8,
            beat_zoom: 0.0,
            distort_amplitude: 0.4,
            noise_strength: 0.1,
            noise_scale: 0.006,
            last_effect_time: -100.0,
        }
    }
}

/// Exponential relaxation toward a resting value: `rest + (v - rest) * base^(dt*60)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Relax {
    pub base: f32,
    pub rest: f32,
}

impl Relax {
    pub const fn new(base: f32, rest: f32) -> Self {
        Self { base, rest }
    }

    pub fn apply(self, value: f32, dt: f32) -> f32 {
        self.rest + (value - self.rest) * frame_decay(self.base, dt)
    }
}

/// Blend factors used while smoothing one field: `rise` when the target is above the
/// current value, `fall` otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoothing {
    pub rise: f32,
    pub fall: f32,
}

impl Smoothing {
    pub const fn even(factor: f32) -> Self {
        Self {
            rise: factor,
            fall: factor,
        }
    }

    pub fn step(self, current: f32, target: f32) -> f32 {
        let factor = if target > current { self.rise } else { self.fall };
        lerp(current, target, factor)
    }
}

/// The full constant set for parameter dynamics. Kept as data so tests can assert
/// against it instead of re-deriving tuned numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicsTuning {
    pub energy_weights: [f32; 3],
    pub energy_floor: f32,

    pub amplitude_gain: f32,
    pub amplitude: Smoothing,
    pub noise_base: f32,
    pub noise_bass_gain: f32,
    pub distort_base: f32,
    pub distort_bass_gain: f32,
    pub distort: Smoothing,
    pub noise_scale_base: f32,
    pub noise_scale_mid_gain: f32,
    pub noise_scale: Smoothing,
    pub frequency_base: f32,
    pub frequency: Smoothing,
    pub speed_base: f32,
    pub speed_energy_gain: f32,
    pub speed_treble_gain: f32,
    pub speed: Smoothing,
    pub color_bass_step: f32,
    pub color_treble_step: f32,
    pub gamma: Smoothing,
    pub vignette: Smoothing,
    pub glyph: Smoothing,
    pub contrast: Smoothing,
    pub brightness: Smoothing,
    pub saturation: Smoothing,
    pub transient_decay: f32,

    pub beat_threshold: f32,
    pub beat_distortion: f32,
    pub beat_zoom: f32,
    pub drop_distortion: f32,
    pub drop_zoom: f32,
    pub drop_distort_amplitude: f32,

    pub silence_brightness: Relax,
    pub silence_noise: Relax,
    pub silence_amplitude: Relax,
    pub silence_frequency: Relax,
    pub silence_contrast: Relax,
    pub silence_speed: Relax,
    pub silence_transient: Relax,
    pub silence_gamma: Relax,
    pub silence_saturation: Relax,
    pub silence_distort: Relax,
    pub silence_noise_scale: Relax,
    pub silence_glyph: Relax,
    pub silence_vignette: Relax,
}

impl Default for DynamicsTuning {
    fn default() -> Self {
        Self {
            energy_weights: [0.7, 0.2, 0.1],
            energy_floor: 0.05,

            amplitude_gain: 1.3,
            amplitude: Smoothing::even(0.5),
            noise_base: 0.3,
            noise_bass_gain: 0.7,
            distort_base: 0.35,
            distort_bass_gain: 0.6,
            distort: Smoothing::even(0.45),
            noise_scale_base: 0.004,
            noise_scale_mid_gain: 0.003,
            noise_scale: Smoothing::even(0.4),
            frequency_base: 8.0,
            frequency: Smoothing::even(0.5),
            speed_base: 0.08,
            speed_energy_gain: 0.9,
            speed_treble_gain: 2.5,
            speed: Smoothing::even(0.55),
            color_bass_step: 0.25,
            color_treble_step: 0.35,
            gamma: Smoothing::even(0.4),
            vignette: Smoothing::even(0.4),
            glyph: Smoothing::even(0.45),
            contrast: Smoothing::even(0.5),
            brightness: Smoothing { rise: 0.92, fall: 0.65 },
            saturation: Smoothing { rise: 0.92, fall: 0.65 },
            transient_decay: 0.9,

            beat_threshold: 0.16,
            beat_distortion: 1.0,
            beat_zoom: 0.8,
            drop_distortion: 1.5,
            drop_zoom: 1.2,
            drop_distort_amplitude: 1.0,

            silence_brightness: Relax::new(0.5, 0.0),
            silence_noise: Relax::new(0.6, 0.0),
            silence_amplitude: Relax::new(0.92, 0.4),
            silence_frequency: Relax::new(0.92, 6.0),
            silence_contrast: Relax::new(0.92, 0.8),
            silence_speed: Relax::new(0.88, 0.05),
            silence_transient: Relax::new(0.92, 0.0),
            silence_gamma: Relax::new(0.9, 1.0),
            silence_saturation: Relax::new(0.9, 0.8),
            silence_distort: Relax::new(0.8, 0.4),
            silence_noise_scale: Relax::new(0.7, 0.006),
            silence_glyph: Relax::new(0.85, 1.0),
            silence_vignette: Relax::new(0.75, 0.25),
        }
    }
}

/// Which transient reaction fired during the last `apply_features` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transient {
    None,
    Beat,
    Drop,
}

impl Parameters {
    pub fn apply_features(&mut self, features: Features, delta_time: f32) -> Transient {
        self.apply_features_tuned(features, delta_time, &DynamicsTuning::default())
    }

    /// Moves every dynamic field toward its audio-driven target. All-zero features take
    /// the silence path instead.
    pub fn apply_features_tuned(
        &mut self,
        features: Features,
        delta_time: f32,
        tune: &DynamicsTuning,
    ) -> Transient {
        let dt = if delta_time.is_finite() { delta_time.max(0.0) } else { 0.0 };
        let f = features.sanitized();
        if f.is_silent() {
            self.apply_silence_decay(dt, tune);
            return Transient::None;
        }

        let [wb, wm, wt] = tune.energy_weights;
        let energy = (f.bass * wb + f.mid * wm + f.treble * wt).max(tune.energy_floor);

        self.amplitude = tune.amplitude.step(
            self.amplitude,
            1.0 + f.bass * self.bass_influence * tune.amplitude_gain,
        );
        self.noise_strength = f.beat_strength * (tune.noise_base + f.bass * tune.noise_bass_gain);
        self.distort_amplitude = tune.distort.step(
            self.distort_amplitude,
            tune.distort_base + f.bass * tune.distort_bass_gain,
        );
        self.noise_scale = tune.noise_scale.step(
            self.noise_scale,
            tune.noise_scale_base + f.mid * tune.noise_scale_mid_gain,
        );
        self.frequency = tune.frequency.step(
            self.frequency,
            tune.frequency_base * (1.0 + f.mid * self.mid_influence * 2.0),
        );

        let base_speed = tune.speed_base + energy * tune.speed_energy_gain;
        let treble_boost = 1.0 + f.treble * self.treble_influence * tune.speed_treble_gain;
        self.speed = tune.speed.step(self.speed, base_speed * treble_boost);

        self.color_shift = (self.color_shift
            + f.bass * tune.color_bass_step
            + f.treble * tune.color_treble_step)
            .rem_euclid(TAU);

        self.gamma = tune.gamma.step(self.gamma, 0.9 + f.mid * 0.4);
        self.vignette = tune.vignette.step(self.vignette, 0.25 + f.treble * 0.2);
        self.glyph_sharpness = tune.glyph.step(self.glyph_sharpness, 0.9 + f.beat_strength * 0.4);
        self.contrast = tune
            .contrast
            .step(self.contrast, 0.6 + energy * 0.6 + f.treble * 0.8);

        let target_brightness =
            (0.4 + f.overall * 0.9 + f.treble * 0.5 + f.beat_strength * 0.4).clamp(0.0, 2.2);
        self.brightness = tune.brightness.step(self.brightness, target_brightness);

        let target_saturation = (0.7 + f.bass * 0.3 + f.beat_strength * 0.2).clamp(0.0, 1.5);
        self.saturation = tune.saturation.step(self.saturation, target_saturation);

        // Kicks linger but relax between events.
        let decay = frame_decay(tune.transient_decay, dt);
        self.beat_distortion *= decay;
        self.beat_zoom *= decay;

        if f.is_drop {
            self.last_effect_time = self.time;
            self.beat_distortion = tune.drop_distortion;
            self.beat_zoom = tune.drop_zoom;
            self.distort_amplitude = tune.drop_distort_amplitude;
            return Transient::Drop;
        }

        let threshold = tune.beat_threshold / self.beat_sensitivity.max(0.1);
        if f.beat_strength > threshold {
            self.last_effect_time = self.time;
            self.beat_distortion = tune.beat_distortion;
            self.beat_zoom = tune.beat_zoom;
            return Transient::Beat;
        }
        Transient::None
    }

    /// Advances the animation clock by `delta_time * speed`.
    pub fn update_time(&mut self, delta_time: f32) {
        if delta_time.is_finite() && delta_time > 0.0 && self.speed.is_finite() {
            self.time += delta_time * self.speed;
        }
    }

    fn apply_silence_decay(&mut self, dt: f32, tune: &DynamicsTuning) {
        self.brightness = tune.silence_brightness.apply(self.brightness, dt);
        self.noise_strength = tune.silence_noise.apply(self.noise_strength, dt);
        self.amplitude = tune.silence_amplitude.apply(self.amplitude, dt);
        self.frequency = tune.silence_frequency.apply(self.frequency, dt);
        self.contrast = tune.silence_contrast.apply(self.contrast, dt);
        self.speed = tune.silence_speed.apply(self.speed, dt);
        self.beat_distortion = tune.silence_transient.apply(self.beat_distortion, dt);
        self.beat_zoom = tune.silence_transient.apply(self.beat_zoom, dt);
        self.gamma = tune.silence_gamma.apply(self.gamma, dt);
        self.saturation = tune.silence_saturation.apply(self.saturation, dt);
        self.distort_amplitude = tune.silence_distort.apply(self.distort_amplitude, dt);
        self.noise_scale = tune.silence_noise_scale.apply(self.noise_scale, dt);
        self.glyph_sharpness = tune.silence_glyph.apply(self.glyph_sharpness, dt);
        self.vignette = tune.silence_vignette.apply(self.vignette, dt);
    }
}

/// `base^(dt*60)`: the per-tick factor at 60 fps, made frame-rate independent.
pub fn frame_decay(base: f32, dt: f32) -> f32 {
    base.powf(dt * 60.0)
}

pub fn lerp(current: f32, target: f32, factor: f32) -> f32 {
    current * (1.0 - factor) + target * factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relax_is_identity_at_zero_dt() {
        let r = Relax::new(0.5, 0.0);
        assert_eq!(r.apply(0.8, 0.0), 0.8);
        assert!((r.apply(0.8, 1.0 / 60.0) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn smoothing_uses_rise_and_fall() {
        let s = Smoothing { rise: 0.9, fall: 0.1 };
        assert!((s.step(0.0, 1.0) - 0.9).abs() < 1e-6);
        assert!((s.step(1.0, 0.0) - 0.9).abs() < 1e-6);
    }
}
