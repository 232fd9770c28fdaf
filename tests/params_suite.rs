use approx::assert_relative_eq;
use glyphwave::analyzer::Features;
use glyphwave::params::{DynamicsTuning, Parameters, Transient};
use std::f32::consts::TAU;

const DT: f32 = 1.0 / 60.0;

fn loud() -> Features {
    Features {
        bass: 0.8,
        mid: 0.6,
        treble: 0.5,
        overall: 0.7,
        beat_strength: 0.9,
        is_drop: false,
    }
}

fn numeric_fields(p: &Parameters) -> [(&'static str, f32); 23] {
    [
        ("time", p.time),
        ("frequency", p.frequency),
        ("amplitude", p.amplitude),
        ("speed", p.speed),
        ("scale", p.scale),
        ("color_shift", p.color_shift),
        ("brightness", p.brightness),
        ("contrast", p.contrast),
        ("saturation", p.saturation),
        ("gamma", p.gamma),
        ("vignette", p.vignette),
        ("vignette_softness", p.vignette_softness),
        ("glyph_sharpness", p.glyph_sharpness),
        ("beat_sensitivity", p.beat_sensitivity),
        ("bass_influence", p.bass_influence),
        ("mid_influence", p.mid_influence),
        ("treble_influence", p.treble_influence),
        ("beat_distortion", p.beat_distortion),
        ("beat_zoom", p.beat_zoom),
        ("distort_amplitude", p.distort_amplitude),
        ("noise_strength", p.noise_strength),
        ("noise_scale", p.noise_scale),
        ("last_effect_time", p.last_effect_time),
    ]
}

#[test]
fn drop_kicks_transient_fields() {
    let mut p = Parameters::default();
    let f = Features {
        bass: 0.9,
        beat_strength: 0.9,
        is_drop: true,
        ..Features::default()
    };
    assert_eq!(p.apply_features(f, DT), Transient::Drop);
    assert_relative_eq!(p.beat_distortion, 1.5);
    assert_relative_eq!(p.beat_zoom, 1.2);
    assert_relative_eq!(p.distort_amplitude, 1.0);
    assert_eq!(p.last_effect_time, p.time);
}

#[test]
fn beat_threshold_scales_with_sensitivity() {
    let f = Features {
        bass: 0.3,
        overall: 0.2,
        beat_strength: 0.3,
        ..Features::default()
    };

    let mut p = Parameters {
        time: 4.0,
        ..Parameters::default()
    };
    assert_eq!(p.apply_features(f, DT), Transient::Beat);
    assert_relative_eq!(p.beat_distortion, 1.0);
    assert_relative_eq!(p.beat_zoom, 0.8);
    assert_eq!(p.last_effect_time, 4.0);

    // 0.16 / 0.5 = 0.32 > 0.3
    let mut dull = Parameters {
        beat_sensitivity: 0.5,
        ..Parameters::default()
    };
    assert_eq!(dull.apply_features(f, DT), Transient::None);
    assert_eq!(dull.last_effect_time, -100.0);
}

#[test]
fn brightness_snaps_up_and_eases_down() {
    let tune = DynamicsTuning::default();
    let mut p = Parameters::default();
    let before = p.brightness;
    let f = Features {
        overall: 0.5,
        bass: 0.5,
        ..Features::default()
    };
    p.apply_features(f, DT);
    let target = 0.4 + 0.5 * 0.9;
    assert_relative_eq!(
        p.brightness,
        before + (target - before) * tune.brightness.rise,
        epsilon = 1e-5
    );

    let high = p.brightness;
    let faint = Features {
        overall: 0.01,
        bass: 0.01,
        ..Features::default()
    };
    p.apply_features(faint, DT);
    let target = 0.4 + 0.01 * 0.9;
    assert_relative_eq!(
        p.brightness,
        high + (target - high) * tune.brightness.fall,
        epsilon = 1e-5
    );
}

#[test]
fn silence_relaxes_toward_rest() {
    let mut p = Parameters::default();
    for _ in 0..30 {
        p.apply_features(loud(), DT);
    }
    assert!(p.brightness > 0.5 && p.amplitude > 1.0 && p.noise_strength > 0.1);

    let (mut bright, mut amp, mut noise) = (p.brightness, p.amplitude, p.noise_strength);
    for tick in 0..120 {
        assert_eq!(p.apply_features(Features::default(), DT), Transient::None);
        assert!(p.brightness <= bright && p.amplitude <= amp && p.noise_strength <= noise);
        (bright, amp, noise) = (p.brightness, p.amplitude, p.noise_strength);
        if tick == 12 {
            assert!(p.brightness < 0.01, "brightness still {}", p.brightness);
        }
    }
    assert!(p.amplitude - 0.4 < 0.01);
    assert!(p.noise_strength < 1e-6);
    assert!(p.speed > 0.0, "animation keeps moving in silence");
}

#[test]
fn zero_dt_silence_is_a_no_op() {
    let mut p = Parameters::default();
    p.apply_features(loud(), DT);
    let before = p.clone();
    p.apply_features(Features::default(), 0.0);
    for ((name, a), (_, b)) in numeric_fields(&before).into_iter().zip(numeric_fields(&p)) {
        assert_relative_eq!(a, b, epsilon = 1e-6, max_relative = 1e-6);
        assert!(a.is_finite(), "{name}");
    }
}

#[test]
fn hostile_inputs_never_produce_nan() {
    let mut rng = fastrand::Rng::with_seed(99);
    let mut p = Parameters::default();
    let weird = [f32::NAN, f32::INFINITY, -3.0, 7.5, 0.0, 1.0];
    for i in 0..2000 {
        let pick = |rng: &mut fastrand::Rng| {
            if rng.u8(..10) == 0 {
                weird[rng.usize(..weird.len())]
            } else {
                rng.f32()
            }
        };
        let f = Features {
            bass: pick(&mut rng),
            mid: pick(&mut rng),
            treble: pick(&mut rng),
            overall: pick(&mut rng),
            beat_strength: pick(&mut rng),
            is_drop: rng.u8(..50) == 0,
        };
        let dt = match i % 11 {
            0 => 0.0,
            1 => -0.5,
            2 => f32::NAN,
            3 => 2.0,
            _ => DT,
        };
        if i % 5 == 0 {
            p.apply_features(Features::default(), dt);
        } else {
            p.apply_features(f, dt);
        }
        p.update_time(dt);
        for (name, v) in numeric_fields(&p) {
            assert!(v.is_finite(), "{name} became {v} at tick {i}");
        }
        assert!((0.0..TAU).contains(&p.color_shift));
    }
}

#[test]
fn update_time_advances_by_speed() {
    let mut p = Parameters {
        speed: 0.5,
        ..Parameters::default()
    };
    p.update_time(2.0);
    assert_relative_eq!(p.time, 1.0);
    p.update_time(-1.0);
    p.update_time(f32::NAN);
    assert_relative_eq!(p.time, 1.0);
}

#[test]
fn tuning_exposes_documented_constants() {
    let t = DynamicsTuning::default();
    assert_eq!(t.beat_threshold, 0.16);
    assert_eq!((t.brightness.rise, t.brightness.fall), (0.92, 0.65));
    assert_eq!((t.drop_distortion, t.drop_zoom, t.drop_distort_amplitude), (1.5, 1.2, 1.0));
    assert_eq!((t.beat_distortion, t.beat_zoom), (1.0, 0.8));
    assert_eq!(t.energy_weights, [0.7, 0.2, 0.1]);
}

#[test]
fn parameters_serialize_with_snake_case_names() {
    let json = serde_json::to_value(Parameters::default()).unwrap();
    assert_eq!(json["pattern"], "plasma");
    assert_eq!(json["color_mode"], "chromatic");
    assert!(json.get("last_effect_time").is_some());
    assert!(json.get("vignette_softness").is_some());
}
