use approx::{assert_abs_diff_eq, assert_relative_eq};
use glyphwave::analyzer::{
    Analyzer, AnalyzerConfig, Features, average, clamp, dynamics, envelope, gate_features,
    next_pow2,
};
use std::f32::consts::TAU;

const RATE: f32 = 44_100.0;
const BLOCK: usize = 2048;
const DT: f32 = 1.0 / 60.0;

/// A sine block at `freq` Hz.
fn sine(freq: f32, amp: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| amp * (TAU * freq * i as f32 / RATE).sin())
        .collect()
}

/// Seeded noise block in `[-amp, amp]`.
fn noise(rng: &mut fastrand::Rng, amp: f32, len: usize) -> Vec<f32> {
    (0..len).map(|_| (rng.f32() * 2.0 - 1.0) * amp).collect()
}

fn assert_in_range(f: &Features) {
    for (name, v) in [
        ("bass", f.bass),
        ("mid", f.mid),
        ("treble", f.treble),
        ("overall", f.overall),
        ("beat_strength", f.beat_strength),
    ] {
        assert!((0.0..=1.0).contains(&v), "{name} out of range: {v}");
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

#[test]
fn next_pow2_boundaries() {
    let table = [(0, 1), (1, 1), (2, 2), (3, 4), (5, 8), (16, 16), (31, 32), (257, 512)];
    for (n, want) in table {
        assert_eq!(next_pow2(n), want, "next_pow2({n})");
    }
}

#[test]
fn dynamics_passes_through_low_peaks() {
    assert_eq!(dynamics(0.5, 0.0), 0.5);
    assert_eq!(dynamics(0.73, 0.009), 0.73);
    assert_eq!(dynamics(-0.2, 0.005), -0.2);
}

#[test]
fn dynamics_boosts_near_peak() {
    // ratio 1: 1^0.7 * peak * (1 + 0.15 * 2)
    assert_relative_eq!(dynamics(0.5, 0.5), 0.65, epsilon = 1e-6);
    assert_eq!(dynamics(5.0, 0.9), 1.0);
    assert!(dynamics(0.1, 0.5) < 0.5);
}

#[test]
fn clamp_boundaries() {
    assert_eq!(clamp(2.0, 0.0, 1.0), 1.0);
    assert_eq!(clamp(-1.0, 0.0, 1.0), 0.0);
    assert_eq!(clamp(0.5, 0.0, 1.0), 0.5);
}

#[test]
fn average_of_values() {
    assert_abs_diff_eq!(average(&[0.2, 0.4, 0.6, 0.8]), 0.5, epsilon = 1e-6);
    assert_eq!(average(&[]), 0.0);
}

#[test]
fn envelope_never_rises_without_louder_input() {
    let mut env = 0.8;
    for input in [0.7, 0.0, 0.3, 0.2] {
        let next = envelope(env, input, 0.94, 0.75);
        assert!(next <= env && next >= 0.0);
        env = next;
    }
    let rising = envelope(env, 1.0, 0.94, 0.75);
    assert!(rising > env && rising < 1.0);
}

#[test]
fn gate_silences_quiet_blocks_but_keeps_drops() {
    let quiet = Features {
        bass: 0.15,
        overall: 0.1,
        beat_strength: 0.3,
        ..Features::default()
    };
    assert_eq!(gate_features(quiet, 0.2), Features::default());
    assert_eq!(gate_features(quiet, 0.0), quiet);

    let dropped = gate_features(Features { is_drop: true, ..quiet }, 0.2);
    assert!(dropped.is_drop);
    assert_eq!(dropped.bass, 0.0);
    assert_eq!(dropped.beat_strength, 0.3);
}

// ── Analyzer ────────────────────────────────────────────────────────────────

#[test]
fn empty_block_returns_zero_and_keeps_state() {
    let mut a = Analyzer::with_sample_rate(RATE);
    a.analyze(&sine(100.0, 0.5, BLOCK), DT);
    let peaks = a.peaks();
    let hist = (a.bass_history_len(), a.energy_history_len());

    assert_eq!(a.analyze(&[], DT), Features::default());
    assert_eq!(a.peaks(), peaks);
    assert_eq!((a.bass_history_len(), a.energy_history_len()), hist);
}

#[test]
fn bad_sample_rate_falls_back() {
    assert_eq!(Analyzer::with_sample_rate(0.0).sample_rate(), RATE);
    assert_eq!(Analyzer::with_sample_rate(f32::NAN).sample_rate(), RATE);
    assert_eq!(Analyzer::with_sample_rate(48_000.0).sample_rate(), 48_000.0);
}

#[test]
fn identical_inputs_give_identical_features() {
    let mut rng = fastrand::Rng::with_seed(11);
    let blocks: Vec<Vec<f32>> = (0..40)
        .map(|i| noise(&mut rng, 0.1 + (i % 7) as f32 * 0.1, 300 + i * 37))
        .collect();

    let mut a = Analyzer::with_sample_rate(RATE);
    let mut b = Analyzer::with_sample_rate(RATE);
    for block in &blocks {
        assert_eq!(a.analyze(block, DT), b.analyze(block, DT));
    }
}

#[test]
fn features_stay_in_unit_range() {
    let mut rng = fastrand::Rng::with_seed(5);
    let mut a = Analyzer::with_sample_rate(RATE);
    for i in 0..200 {
        let mut block = match i % 4 {
            0 => noise(&mut rng, 1.0, BLOCK),
            1 => sine(80.0, 1.0, 4096),
            2 => vec![0.0; 64],
            _ => sine(5000.0, 0.9, 1000),
        };
        if i % 9 == 0 {
            block[0] = f32::NAN;
        }
        let f = a.analyze(&block, DT);
        assert_in_range(&f);
    }
}

#[test]
fn bass_tone_lands_in_bass_band() {
    let mut a = Analyzer::with_sample_rate(RATE);
    let block = sine(100.0, 0.5, BLOCK);
    let mut f = Features::default();
    for _ in 0..10 {
        f = a.analyze(&block, DT);
    }
    assert!(f.bass > 0.5, "bass {}", f.bass);
    assert!(f.bass > f.treble * 4.0, "bass {} treble {}", f.bass, f.treble);
}

#[test]
fn peak_envelopes_decay_in_silence() {
    let mut a = Analyzer::with_sample_rate(RATE);
    for _ in 0..20 {
        a.analyze(&sine(100.0, 0.8, BLOCK), DT);
    }
    let mut prev = a.peaks();
    assert!(prev.0 > 0.0);
    let silence = vec![0.0; BLOCK];
    for _ in 0..30 {
        a.analyze(&silence, DT);
        let now = a.peaks();
        assert!(now.0 <= prev.0 && now.1 <= prev.1 && now.2 <= prev.2);
        assert!(now.0 >= 0.0 && now.1 >= 0.0 && now.2 >= 0.0);
        prev = now;
    }
}

#[test]
fn histories_are_bounded() {
    let mut a = Analyzer::new(AnalyzerConfig {
        sample_rate: RATE,
        history_size: 10,
        ..AnalyzerConfig::default()
    });
    assert_eq!(a.bass_history_capacity(), 24);
    assert_eq!(a.energy_history_capacity(), 10);
    let block = sine(200.0, 0.3, 512);
    for _ in 0..100 {
        a.analyze(&block, DT);
    }
    assert_eq!(a.bass_history_len(), 24);
    assert_eq!(a.energy_history_len(), 10);

    let big = Analyzer::new(AnalyzerConfig {
        sample_rate: RATE,
        history_size: 120,
        ..AnalyzerConfig::default()
    });
    assert_eq!(big.bass_history_capacity(), 60);

    let fallback = Analyzer::new(AnalyzerConfig {
        history_size: 0,
        ..AnalyzerConfig::default()
    });
    assert_eq!(fallback.energy_history_capacity(), 60);
}

#[test]
fn drop_fires_on_surge_then_cools_down() {
    let mut a = Analyzer::with_sample_rate(RATE);
    let quiet = sine(100.0, 0.001, BLOCK);
    let loud = sine(100.0, 0.8, BLOCK);
    let cooldown_ticks = (1.0 / DT).round() as usize;

    for _ in 0..30 {
        assert!(!a.analyze(&quiet, DT).is_drop);
    }
    assert!(a.analyze(&loud, DT).is_drop, "surge after a quiet stretch should drop");
    assert_eq!(a.drop_cooldown(), 1.0);

    // The same quiet-then-surge shape halfway through the cooldown is held back.
    let surge_at = cooldown_ticks / 2;
    for i in 0..cooldown_ticks - 1 {
        let block = if i == surge_at { &loud } else { &quiet };
        assert!(!a.analyze(block, DT).is_drop, "drop during cooldown at tick {i}");
    }

    // Once the cooldown has run out and the bass history has settled, it fires again.
    for i in 0..cooldown_ticks {
        assert!(!a.analyze(&quiet, DT).is_drop, "quiet tick {i} dropped");
    }
    assert!(a.drop_cooldown() <= 0.0);
    assert!(a.analyze(&loud, DT).is_drop, "surge after the cooldown should drop");
}
