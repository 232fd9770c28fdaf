use glyphwave::analyzer::Features;
use glyphwave::config::Quality;
use glyphwave::params::Parameters;
use glyphwave::render::color::ColorMode;
use glyphwave::render::palette::Palette;
use glyphwave::render::pattern::Pattern;
use glyphwave::render::{Frame, FrameRenderer, Output, PixelBuffer};

fn busy_features() -> Features {
    Features {
        bass: 0.7,
        mid: 0.5,
        treble: 0.4,
        overall: 0.6,
        beat_strength: 0.8,
        is_drop: false,
    }
}

/// Parameters a few seconds into a lively session so swirl, warp and detail are all active.
fn lively_params() -> Parameters {
    let mut p = Parameters::default();
    for _ in 0..90 {
        p.apply_features(busy_features(), 1.0 / 60.0);
        p.update_time(1.0 / 60.0);
    }
    p.time += 3.7;
    p
}

fn ascii(w: usize, h: usize, ansi: bool) -> FrameRenderer {
    FrameRenderer::new(w, h, Output::Ascii { ansi })
}

fn lines(frame: &Frame) -> &[String] {
    frame.lines().expect("ascii frame")
}

fn pixels(frame: &Frame) -> &PixelBuffer {
    frame.pixels().expect("pixel frame")
}

/// Glyphs of a line with the color escapes removed.
fn strip_ansi(line: &str) -> String {
    let mut out = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for e in chars.by_ref() {
                if e == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Color indices of every `ESC[38;5;Nm` escape in a line, in order.
fn color_codes(line: &str) -> Vec<u8> {
    line.split("\x1b[38;5;")
        .skip(1)
        .filter_map(|rest| rest.split('m').next()?.parse().ok())
        .collect()
}

// ── Grid shape ──────────────────────────────────────────────────────────────

#[test]
fn plain_frame_has_one_line_per_row() {
    let mut r = ascii(23, 11, false);
    let frame = r.render(&lively_params(), &busy_features(), 60.0);
    let lines = lines(&frame);
    assert_eq!(lines.len(), 11);
    for line in lines {
        assert_eq!(line.chars().count(), 23);
        assert!(!line.contains('\x1b'));
    }
}

#[test]
fn ansi_frame_has_one_glyph_per_cell() {
    let mut r = ascii(31, 9, true);
    let frame = r.render(&lively_params(), &busy_features(), 60.0);
    for line in lines(&frame) {
        assert_eq!(strip_ansi(line).chars().count(), 31);
        assert!(line.ends_with("\x1b[0m"));
        assert!(line.starts_with("\x1b[38;5;"));
    }
}

#[test]
fn ansi_color_is_only_emitted_on_change() {
    let mut r = ascii(40, 12, true);
    let frame = r.render(&lively_params(), &busy_features(), 60.0);
    for line in lines(&frame) {
        let codes = color_codes(line);
        assert!(!codes.is_empty());
        assert!(codes.windows(2).all(|w| w[0] != w[1]), "repeated color in {line:?}");
        assert!(codes.iter().all(|&c| (16..=231).contains(&c)));
    }
}

#[test]
fn zero_sized_grid_renders_empty_frame() {
    for (w, h) in [(0, 10), (10, 0), (0, 0)] {
        let mut r = ascii(w, h, true);
        assert!(r.render(&lively_params(), &busy_features(), 60.0).is_empty());
        let mut px = FrameRenderer::new(w, h, Output::Pixel);
        assert!(px.render(&lively_params(), &busy_features(), 60.0).is_empty());
    }
}

#[test]
fn resize_changes_the_grid() {
    let mut r = ascii(8, 4, false);
    r.render(&Parameters::default(), &busy_features(), 60.0);
    r.resize(5, 3);
    let frame = r.render(&Parameters::default(), &busy_features(), 60.0);
    assert_eq!(lines(&frame).len(), 3);
    assert!(lines(&frame).iter().all(|l| l.chars().count() == 5));
}

// ── Parallel scan ───────────────────────────────────────────────────────────

#[test]
fn parallel_render_matches_sequential() {
    let params = lively_params();
    let features = busy_features();
    for quality in Quality::ALL {
        for pattern in Pattern::ALL {
            let mut r = ascii(37, 29, true);
            r.configure("default", pattern.name(), "chromatic", true);
            r.set_quality(quality);
            let sequential = r.render_with_workers(&params, &features, 60.0, 1);
            let parallel = r.render_with_workers(&params, &features, 60.0, 4);
            assert_eq!(sequential, parallel, "{} at {}", pattern.name(), quality.label());
        }
    }
}

#[test]
fn parallel_pixels_match_sequential() {
    let params = lively_params();
    let mut r = FrameRenderer::new(33, 21, Output::Pixel);
    r.set_scale(0.5);
    let sequential = r.render_with_workers(&params, &busy_features(), 60.0, 1);
    let parallel = r.render_with_workers(&params, &busy_features(), 60.0, 4);
    assert_eq!(sequential, parallel);
}

#[test]
fn recycled_buffers_do_not_leak_into_next_frame() {
    let params = lively_params();
    let mut fresh = ascii(20, 10, true);
    let expected = fresh.render(&params, &busy_features(), 60.0);

    let mut reused = ascii(20, 10, true);
    let first = reused.render(&Parameters::default(), &Features::default(), 30.0);
    reused.recycle(first);
    assert_eq!(reused.render(&params, &busy_features(), 60.0), expected);
}

// ── Pixel backend ───────────────────────────────────────────────────────────

#[test]
fn pixel_buffer_is_two_pixels_per_cell_row() {
    let mut r = FrameRenderer::new(16, 7, Output::Pixel);
    let frame = r.render(&lively_params(), &busy_features(), 60.0);
    let px = pixels(&frame);
    assert_eq!((px.width, px.height), (16, 14));
    assert_eq!(px.rgba.len(), 16 * 14 * 4);
    assert!(px.rgba.chunks_exact(4).all(|p| p[3] == 255));
}

#[test]
fn downsampled_blocks_are_replicated() {
    let mut r = FrameRenderer::new(13, 6, Output::Pixel);
    r.set_scale(1.0 / 3.0);
    assert_eq!(r.downsample(), 3);
    let frame = r.render(&lively_params(), &busy_features(), 60.0);
    let px = pixels(&frame);
    let at = |x: usize, y: usize| &px.rgba[(y * px.width + x) * 4..(y * px.width + x) * 4 + 4];

    for y in 0..px.height {
        for x in 0..px.width {
            assert_eq!(at(x, y), at(x - x % 3, y - y % 3), "pixel ({x},{y})");
        }
    }
}

// ── Audio-reactive coloring ─────────────────────────────────────────────────

#[test]
fn silence_blacks_out_when_color_follows_audio() {
    let mut r = ascii(24, 8, false);
    let frame = r.render(&lively_params(), &Features::default(), 60.0);
    assert!(lines(&frame).iter().all(|l| l.chars().all(|c| c == ' ')));

    r.configure("default", "plasma", "chromatic", false);
    let frame = r.render(&lively_params(), &Features::default(), 60.0);
    assert!(lines(&frame).iter().any(|l| l.chars().any(|c| c != ' ')));
}

#[test]
fn glyphs_come_from_the_selected_palette() {
    let mut r = ascii(30, 12, false);
    r.configure("box", "ripple", "fire", false);
    let frame = r.render(&lively_params(), &busy_features(), 60.0);
    let ramp = Palette::Box.glyphs();
    for line in lines(&frame) {
        assert!(line.chars().all(|c| ramp.contains(&c)), "foreign glyph in {line:?}");
    }
}

// ── Configuration ───────────────────────────────────────────────────────────

#[test]
fn unknown_names_fall_back_to_defaults() {
    let mut r = ascii(4, 4, true);
    r.configure("box", "grid", "fire", true);
    r.configure("nope", "nope", "nope", true);
    assert_eq!(r.palette(), Palette::Default);
    assert_eq!(r.pattern(), Pattern::Plasma);
    assert_eq!(r.color_mode(), ColorMode::Chromatic);

    r.set_quality_name("full");
    assert_eq!(r.quality(), Quality::High);
    r.set_quality_name("turbo");
    assert_eq!(r.quality(), Quality::Balanced);
}

#[test]
fn status_summarizes_selection_and_levels() {
    let mut r = ascii(4, 4, true);
    r.configure("box", "grid", "fire", true);
    r.set_quality(Quality::High);
    let f = Features {
        bass: 0.5,
        mid: 0.25,
        treble: 0.75,
        beat_strength: 1.0,
        ..Features::default()
    };
    assert_eq!(
        r.status(&f, 59.94),
        "FIRE | palette=box pattern=grid quality=high col=AUDIO | bass 0.50 mid 0.25 treble 0.75 beat 1.00 fps 59.9"
    );

    r.configure("spark", "waves", "mono", false);
    r.set_quality(Quality::Eco);
    let frame = r.render(&Parameters::default(), &f, 30.0);
    assert!(frame.status.starts_with("MONO | palette=spark pattern=waves quality=eco | bass"));
}
