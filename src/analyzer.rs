use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::Arc;

pub const DEFAULT_SAMPLE_RATE: f32 = 44_100.0;
pub const DEFAULT_HISTORY_SIZE: usize = 60;

const MIN_WINDOW: usize = 256;
const MAX_WINDOW: usize = 2048;

const BASS_HZ: (f32, f32) = (20.0, 250.0);
const MID_HZ: (f32, f32) = (250.0, 2000.0);
const TREBLE_HZ: (f32, f32) = (2000.0, 8000.0);

const DYNAMICS_FLOOR: f32 = 0.01;
const DYNAMICS_EXPONENT: f32 = 0.7;
const DYNAMICS_KNEE: f32 = 0.85;

const VARIANCE_MIN_SAMPLES: usize = 10;

/// Perceptual features for one analysed block. Every energy is in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Features {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub overall: f32,
    pub beat_strength: f32,
    pub is_drop: bool,
}

impl Features {
    /// True for the all-zero value produced by silence or an empty block.
    pub fn is_silent(&self) -> bool {
        *self == Self::default()
    }

    /// Replaces non-finite values with 0 and clamps energies into `[0, 1]`.
    pub fn sanitized(self) -> Self {
        let fix = |v: f32| if v.is_finite() { clamp(v, 0.0, 1.0) } else { 0.0 };
        Self {
            bass: fix(self.bass),
            mid: fix(self.mid),
            treble: fix(self.treble),
            overall: fix(self.overall),
            beat_strength: fix(self.beat_strength),
            is_drop: self.is_drop,
        }
    }
}

/// Hand-tuned constants for envelopes, beat and drop heuristics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerTuning {
    pub attack: f32,
    pub bass_release: f32,
    pub mid_release: f32,
    pub treble_release: f32,
    pub beat_gain: f32,
    pub beat_latch: f32,
    pub pulse_decay: f32,
    pub pulse_weight: f32,
    pub drop_ratio: f32,
    pub drop_min_rise: f32,
    pub drop_cooldown_secs: f32,
    pub variance_weight: f32,
}

impl Default for AnalyzerTuning {
    fn default() -> Self {
        Self {
            attack: 0.94,
            bass_release: 0.75,
            mid_release: 0.78,
            treble_release: 0.8,
            beat_gain: 14.0,
            beat_latch: 0.12,
            pulse_decay: 0.88,
            pulse_weight: 0.7,
            drop_ratio: 2.0,
            drop_min_rise: 0.1,
            drop_cooldown_secs: 1.0,
            variance_weight: 0.65,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AnalyzerConfig {
    pub sample_rate: f32,
    pub history_size: usize,
    pub tuning: AnalyzerTuning,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            history_size: DEFAULT_HISTORY_SIZE,
            tuning: AnalyzerTuning::default(),
        }
    }
}

pub struct Analyzer {
    sample_rate: f32,
    tuning: AnalyzerTuning,

    bass_peak: f32,
    mid_peak: f32,
    treble_peak: f32,
    last_bass: f32,
    beat_pulse: f32,
    drop_cooldown: f32,

    bass_history: VecDeque<f32>,
    bass_capacity: usize,
    energy_history: VecDeque<f32>,
    energy_capacity: usize,

    planner: FftPlanner<f32>,
    fft: Option<Arc<dyn Fft<f32>>>,
    buffer: Vec<Complex<f32>>,
    window: Vec<f32>,
}

impl Analyzer {
    pub fn new(cfg: AnalyzerConfig) -> Self {
        let sample_rate = if cfg.sample_rate.is_finite() && cfg.sample_rate > 0.0 {
            cfg.sample_rate
        } else {
            DEFAULT_SAMPLE_RATE
        };
        let history_size = if cfg.history_size == 0 {
            DEFAULT_HISTORY_SIZE
        } else {
            cfg.history_size
        };
        let bass_capacity = (history_size / 2).max(24);

        Self {
            sample_rate,
            tuning: cfg.tuning,
            bass_peak: 0.0,
            mid_peak: 0.0,
            treble_peak: 0.0,
            last_bass: 0.0,
            beat_pulse: 0.0,
            drop_cooldown: 0.0,
            bass_history: VecDeque::with_capacity(bass_capacity),
            bass_capacity,
            energy_history: VecDeque::with_capacity(history_size),
            energy_capacity: history_size,
            planner: FftPlanner::new(),
            fft: None,
            buffer: Vec::new(),
            window: Vec::new(),
        }
    }

    pub fn with_sample_rate(sample_rate: f32) -> Self {
        Self::new(AnalyzerConfig {
            sample_rate,
            ..AnalyzerConfig::default()
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Current `(bass, mid, treble)` peak envelopes.
    pub fn peaks(&self) -> (f32, f32, f32) {
        (self.bass_peak, self.mid_peak, self.treble_peak)
    }

    pub fn drop_cooldown(&self) -> f32 {
        self.drop_cooldown
    }

    pub fn bass_history_len(&self) -> usize {
        self.bass_history.len()
    }

    pub fn energy_history_len(&self) -> usize {
        self.energy_history.len()
    }

    pub fn bass_history_capacity(&self) -> usize {
        self.bass_capacity
    }

    pub fn energy_history_capacity(&self) -> usize {
        self.energy_capacity
    }

    /// Analyse one block of mono samples. `delta_time` is the time in seconds since the
    /// previous call. An empty block returns zero features and leaves all state untouched.
    pub fn analyze(&mut self, samples: &[f32], delta_time: f32) -> Features {
        if samples.is_empty() {
            return Features::default();
        }
        let t = self.tuning;
        let dt = if delta_time.is_finite() { delta_time.max(0.0) } else { 0.0 };

        let size = next_pow2(samples.len().min(MAX_WINDOW)).max(MIN_WINDOW);
        self.ensure_workspace(size);

        for (i, (slot, w)) in self.buffer.iter_mut().zip(&self.window).enumerate() {
            let s = samples.get(i).copied().unwrap_or(0.0);
            let s = if s.is_finite() { s } else { 0.0 };
            *slot = Complex { re: s * w, im: 0.0 };
        }
        if let Some(fft) = &self.fft {
            fft.process(&mut self.buffer);
        }

        let resolution = self.sample_rate / size as f32;
        let bass = band_energy(&self.buffer, resolution, BASS_HZ);
        let mid = band_energy(&self.buffer, resolution, MID_HZ);
        let treble = band_energy(&self.buffer, resolution, TREBLE_HZ);

        self.bass_peak = envelope(self.bass_peak, bass, t.attack, t.bass_release);
        self.mid_peak = envelope(self.mid_peak, mid, t.attack, t.mid_release);
        self.treble_peak = envelope(self.treble_peak, treble, t.attack, t.treble_release);

        let bass_out = dynamics(bass, self.bass_peak);
        let mid_out = dynamics(mid, self.mid_peak);
        let treble_out = dynamics(treble, self.treble_peak);

        let overall = average(&[bass_out, mid_out, treble_out]);
        push_bounded(&mut self.energy_history, overall, self.energy_capacity);
        let variance = energy_variance(&self.energy_history);

        // Beat: instantaneous bass rise plus a latched pulse that lingers.
        let bass_diff = bass - self.last_bass;
        let mut beat_strength = clamp(bass_diff * t.beat_gain, 0.0, 1.0);
        if beat_strength > t.beat_latch {
            self.beat_pulse = 1.0;
        }
        self.beat_pulse *= t.pulse_decay;
        beat_strength = (beat_strength + self.beat_pulse * t.pulse_weight).min(1.0);

        push_bounded(&mut self.bass_history, bass, self.bass_capacity);

        let mut is_drop = false;
        if self.drop_cooldown <= 0.0 {
            let avg = mean(self.bass_history.iter().copied());
            if avg > 0.0 && bass > avg * t.drop_ratio && bass_diff > t.drop_min_rise {
                is_drop = true;
                self.drop_cooldown = t.drop_cooldown_secs;
            }
        } else {
            self.drop_cooldown -= dt;
        }

        self.last_bass = bass;

        let multiplier = 1.0 + variance * t.variance_weight;
        Features {
            bass: (bass_out * multiplier).min(1.0),
            mid: (mid_out * multiplier).min(1.0),
            treble: (treble_out * multiplier).min(1.0),
            overall: (overall * multiplier).min(1.0),
            beat_strength,
            is_drop,
        }
    }

    fn ensure_workspace(&mut self, size: usize) {
        if self.buffer.len() == size && self.fft.is_some() {
            return;
        }
        self.buffer = vec![Complex { re: 0.0, im: 0.0 }; size];
        self.window = hann_window(size);
        self.fft = Some(self.planner.plan_fft_forward(size));
    }
}

/// Smallest power of two that is `>= n`. `next_pow2(0) == 1`.
pub fn next_pow2(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

pub fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 * (1.0 - ((2.0 * PI * i as f32) / n as f32).cos()))
        .collect()
}

/// Mean bin magnitude between two frequencies, clamped to `[0, 1]`.
pub fn band_energy(spectrum: &[Complex<f32>], resolution: f32, band: (f32, f32)) -> f32 {
    if !(resolution.is_finite() && resolution > 0.0) {
        return 0.0;
    }
    let half = spectrum.len() / 2;
    let lo = (band.0 / resolution).floor() as usize;
    let hi = ((band.1 / resolution).ceil() as usize + 1).min(half);
    if lo >= hi {
        return 0.0;
    }
    let sum: f32 = spectrum[lo..hi].iter().map(|c| c.norm()).sum();
    clamp(sum / (hi - lo) as f32, 0.0, 1.0)
}

/// Asymmetric envelope follower: slow blend up toward louder input,
/// multiplicative release otherwise.
pub fn envelope(current: f32, input: f32, attack: f32, release: f32) -> f32 {
    if input > current {
        current * attack + input * (1.0 - attack)
    } else {
        current * release
    }
}

/// Peak-relative power-law expansion; values near the peak get an extra push.
pub fn dynamics(value: f32, peak: f32) -> f32 {
    if peak < DYNAMICS_FLOOR {
        return value;
    }
    let ratio = (value / peak).max(0.0);
    let mut expanded = ratio.powf(DYNAMICS_EXPONENT) * peak;
    if ratio > DYNAMICS_KNEE {
        expanded *= 1.0 + (ratio - DYNAMICS_KNEE) * 2.0;
    }
    expanded.min(1.0)
}

pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

pub fn average(values: &[f32]) -> f32 {
    mean(values.iter().copied())
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, n) = values.fold((0.0f32, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f32 }
}

/// Standard deviation of the history clamped to `[0, 1]`; 0 until enough samples exist.
fn energy_variance(history: &VecDeque<f32>) -> f32 {
    if history.len() < VARIANCE_MIN_SAMPLES {
        return 0.0;
    }
    let m = mean(history.iter().copied());
    let var = mean(history.iter().map(|v| (v - m) * (v - m)));
    var.sqrt().min(1.0)
}

fn push_bounded(ring: &mut VecDeque<f32>, value: f32, capacity: usize) {
    while ring.len() >= capacity.max(1) {
        ring.pop_front();
    }
    ring.push_back(value);
}

/// Suppresses features whose overall energy sits under `floor` and rescales the rest so the
/// floor maps to zero. Drops always pass through.
pub fn gate_features(features: Features, floor: f32) -> Features {
    if !(floor.is_finite() && floor > 0.0) {
        return features;
    }
    if features.overall < floor && !features.is_drop {
        return Features::default();
    }
    let span = (1.0 - floor).max(1e-3);
    let lift = |v: f32| clamp((v - floor) / span, 0.0, 1.0);
    Features {
        bass: lift(features.bass),
        mid: lift(features.mid),
        treble: lift(features.treble),
        overall: lift(features.overall),
        beat_strength: features.beat_strength,
        is_drop: features.is_drop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_energy_degenerate_range_is_zero() {
        let spectrum = vec![Complex { re: 1.0, im: 0.0 }; 4];
        // 20..250 Hz at 1 kHz resolution collapses to bin 0..min(2, 2): still valid.
        assert!(band_energy(&spectrum, 1000.0, (20.0, 250.0)) > 0.0);
        // Band entirely above Nyquist.
        assert_eq!(band_energy(&spectrum, 1000.0, (5000.0, 8000.0)), 0.0);
        assert_eq!(band_energy(&spectrum, 0.0, (20.0, 250.0)), 0.0);
    }

    #[test]
    fn variance_needs_ten_samples() {
        let mut ring = VecDeque::new();
        for i in 0..9 {
            push_bounded(&mut ring, (i % 2) as f32, 60);
        }
        assert_eq!(energy_variance(&ring), 0.0);
        push_bounded(&mut ring, 1.0, 60);
        assert!(energy_variance(&ring) > 0.4);
    }

    #[test]
    fn push_bounded_evicts_oldest() {
        let mut ring = VecDeque::new();
        for i in 0..5 {
            push_bounded(&mut ring, i as f32, 3);
        }
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn hann_window_tapers_edges() {
        let w = hann_window(256);
        assert_eq!(w[0], 0.0);
        assert!((w[128] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn gate_zeroes_quiet_features() {
        let quiet = Features {
            bass: 0.1,
            mid: 0.1,
            treble: 0.1,
            overall: 0.1,
            beat_strength: 0.3,
            is_drop: false,
        };
        assert!(gate_features(quiet, 0.2).is_silent());
        assert_eq!(gate_features(quiet, 0.0), quiet);

        let loud = Features { overall: 0.6, bass: 0.6, ..quiet };
        let gated = gate_features(loud, 0.2);
        assert!((gated.overall - 0.5).abs() < 1e-6);
        assert_eq!(gated.mid, 0.0);
    }
}
