pub mod color;
pub mod noise;
pub mod palette;
pub mod pattern;
pub mod shader;

mod halfblock;
mod surface;

pub use halfblock::HalfBlockSurface;
pub use surface::{LineSurface, PresentError, Surface, status_lines};

use crate::analyzer::Features;
use crate::config::Quality;
use crate::params::Parameters;
use color::ColorMode;
use palette::Palette;
use parking_lot::Mutex;
use pattern::Pattern;
use shader::{FrameContext, Shader};
use std::fmt::Write as _;
use std::thread;

/// Rows per work item handed to a render worker.
pub const TILE_ROWS: usize = 8;
pub const MAX_WORKERS: usize = 4;
pub const MAX_DOWNSAMPLE: usize = 8;

const ANSI_RESET: &str = "\x1b[0m";

/// What a render produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// One printable line per row, optionally with xterm-256 foreground escapes.
    Ascii { ansi: bool },
    /// An RGBA buffer two pixels tall per cell row, presented with half blocks.
    Pixel,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FrameBody {
    #[default]
    Empty,
    Lines(Vec<String>),
    Pixels(PixelBuffer),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub body: FrameBody,
    pub status: String,
}

impl Frame {
    pub fn is_empty(&self) -> bool {
        matches!(self.body, FrameBody::Empty)
    }

    pub fn lines(&self) -> Option<&[String]> {
        match &self.body {
            FrameBody::Lines(lines) => Some(lines),
            _ => None,
        }
    }

    pub fn pixels(&self) -> Option<&PixelBuffer> {
        match &self.body {
            FrameBody::Pixels(px) => Some(px),
            _ => None,
        }
    }
}

/// Procedural frame renderer. Configuration calls must not overlap a `render` call;
/// callers on other threads go through the control state instead.
pub struct FrameRenderer {
    width: usize,
    height: usize,
    output: Output,
    palette: Palette,
    glyphs: Vec<char>,
    pattern: Pattern,
    color_mode: ColorMode,
    quality: Quality,
    color_on_audio: bool,
    scale: f32,
    downsample: usize,
    workers: usize,
    x_coords: Vec<f32>,
    y_coords: Vec<f32>,
    spare_lines: Vec<String>,
    spare_pixels: Vec<u8>,
}

impl FrameRenderer {
    pub fn new(width: usize, height: usize, output: Output) -> Self {
        let palette = Palette::default();
        Self {
            width,
            height,
            output,
            palette,
            glyphs: palette.glyphs(),
            pattern: Pattern::default(),
            color_mode: ColorMode::default(),
            quality: Quality::default(),
            color_on_audio: true,
            scale: 1.0,
            downsample: 1,
            workers: default_workers(),
            x_coords: Vec::new(),
            y_coords: Vec::new(),
            spare_lines: Vec::new(),
            spare_pixels: Vec::new(),
        }
    }

    /// Selects palette, pattern and color mode by name. Unknown names fall back to defaults.
    pub fn configure(
        &mut self,
        palette: &str,
        pattern: &str,
        color_mode: &str,
        color_on_audio: bool,
    ) {
        self.palette = Palette::resolve(palette);
        self.glyphs = self.palette.glyphs();
        self.pattern = Pattern::resolve(pattern);
        self.color_mode = ColorMode::resolve(color_mode);
        self.color_on_audio = color_on_audio;
        tracing::debug!(
            palette = self.palette.name(),
            pattern = self.pattern.name(),
            color_mode = self.color_mode.name(),
            color_on_audio,
            "renderer configured"
        );
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.quality = quality;
    }

    pub fn set_quality_name(&mut self, name: &str) {
        self.set_quality(Quality::from_name(name));
    }

    /// Pixel output renders at `round(1/scale)` coarser blocks when `scale < 1`.
    pub fn set_scale(&mut self, scale: f32) {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        self.scale = scale;
        self.downsample = match self.output {
            Output::Pixel if scale < 1.0 => {
                ((1.0 / scale).round() as usize).clamp(1, MAX_DOWNSAMPLE)
            }
            _ => 1,
        };
    }

    pub fn set_workers(&mut self, workers: usize) {
        self.workers = workers.clamp(1, MAX_WORKERS);
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.x_coords.clear();
            self.y_coords.clear();
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn output(&self) -> Output {
        self.output
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn downsample(&self) -> usize {
        self.downsample
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Hands a presented frame's buffers back for reuse by the next render.
    pub fn recycle(&mut self, frame: Frame) {
        match frame.body {
            FrameBody::Lines(lines) => self.spare_lines = lines,
            FrameBody::Pixels(px) => self.spare_pixels = px.rgba,
            FrameBody::Empty => {}
        }
    }

    pub fn render(&mut self, params: &Parameters, features: &Features, fps: f32) -> Frame {
        let workers = self.workers;
        self.render_with_workers(params, features, fps, workers)
    }

    /// Same as `render` with an explicit worker count; `1` runs the plain sequential loop.
    pub fn render_with_workers(
        &mut self,
        params: &Parameters,
        features: &Features,
        fps: f32,
        workers: usize,
    ) -> Frame {
        if self.width == 0 || self.height == 0 {
            return Frame::default();
        }

        let activation = self.color_on_audio.then(|| color::activation(features));
        let shader = Shader {
            ctx: FrameContext::new(params, self.quality, self.pattern.detail_mix()),
            params,
            features,
            pattern: self.pattern,
            color_mode: self.color_mode,
            activation,
        };
        let scale = if params.scale.is_finite() && params.scale > 0.0 {
            params.scale
        } else {
            1.0
        };

        let body = match self.output {
            Output::Ascii { ansi } => {
                FrameBody::Lines(self.render_lines(&shader, scale, ansi, workers))
            }
            Output::Pixel => FrameBody::Pixels(self.render_pixels(&shader, scale, workers)),
        };

        Frame {
            body,
            status: self.status(features, fps),
        }
    }

    fn render_lines(
        &mut self,
        shader: &Shader<'_>,
        scale: f32,
        ansi: bool,
        workers: usize,
    ) -> Vec<String> {
        let (w, h) = (self.width, self.height);
        self.ensure_coords(w, h);

        let mut lines = std::mem::take(&mut self.spare_lines);
        lines.resize_with(h, String::new);
        lines.truncate(h);

        let xs = &self.x_coords;
        let ys = &self.y_coords;
        let glyphs = &self.glyphs;

        scan_rows(&mut lines, workers, |y, line: &mut String| {
            line.clear();
            let vy = ys[y] * scale;
            let mut last_color = None;
            for &x in xs.iter() {
                let cell = shader.sample(x * scale, vy);
                if ansi {
                    let c = color::hsv_to_ansi256(cell.h, cell.s, cell.v);
                    if last_color != Some(c) {
                        let _ = write!(line, "\x1b[38;5;{c}m");
                        last_color = Some(c);
                    }
                }
                line.push(glyph_for(cell.glyph, glyphs));
            }
            if ansi {
                line.push_str(ANSI_RESET);
            }
        });
        lines
    }

    fn render_pixels(&mut self, shader: &Shader<'_>, scale: f32, workers: usize) -> PixelBuffer {
        let pw = self.width;
        let ph = self.height * 2;
        self.ensure_coords(pw, ph);

        let d = self.downsample.clamp(1, MAX_DOWNSAMPLE);
        let stride = pw * 4;
        let mut rgba = std::mem::take(&mut self.spare_pixels);
        rgba.clear();
        rgba.resize(stride * ph, 0);

        let xs = &self.x_coords;
        let ys = &self.y_coords;
        let mut bands: Vec<&mut [u8]> = rgba.chunks_mut(stride * d).collect();

        scan_rows(&mut bands, workers, |by, band: &mut &mut [u8]| {
            let rows = band.len() / stride;
            let cy = (by * d + d / 2).min(ph - 1);
            let vy = ys[cy] * scale;
            let mut bx = 0;
            while bx < pw {
                let cx = (bx + d / 2).min(pw - 1);
                let cell = shader.sample(xs[cx] * scale, vy);
                let [r, g, b] = color::hsv_to_rgb8(cell.h, cell.s, cell.v);
                let span = d.min(pw - bx);
                for row in 0..rows {
                    let start = row * stride + bx * 4;
                    for px in band[start..start + span * 4].chunks_exact_mut(4) {
                        px.copy_from_slice(&[r, g, b, 255]);
                    }
                }
                bx += d;
            }
        });

        PixelBuffer {
            width: pw,
            height: ph,
            rgba,
        }
    }

    fn ensure_coords(&mut self, width: usize, height: usize) {
        if self.x_coords.len() != width {
            self.x_coords = axis_coords(width);
        }
        if self.y_coords.len() != height {
            self.y_coords = axis_coords(height);
        }
    }

    /// One-line summary: mode, selection, band levels and fps.
    pub fn status(&self, features: &Features, fps: f32) -> String {
        let mut s = String::with_capacity(128);
        let _ = write!(
            s,
            "{} | palette={} pattern={} quality={}",
            self.color_mode.label(),
            self.palette.name(),
            self.pattern.name(),
            self.quality.label()
        );
        if self.color_on_audio {
            s.push_str(" col=AUDIO");
        }
        let _ = write!(
            s,
            " | bass {:.2} mid {:.2} treble {:.2} beat {:.2} fps {:.1}",
            features.bass, features.mid, features.treble, features.beat_strength, fps
        );
        s
    }
}

/// Fork-join scan over rows. Rows are grouped into tiles of `TILE_ROWS` and pulled from a
/// shared queue by up to `workers` scoped threads; each row is written only by the worker
/// that took its tile.
pub fn scan_rows<T, F>(rows: &mut [T], workers: usize, render_row: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync,
{
    if rows.is_empty() {
        return;
    }
    let tile_rows = TILE_ROWS.min(rows.len());
    let tiles = rows.len().div_ceil(tile_rows);
    let workers = workers.clamp(1, MAX_WORKERS).min(tiles);

    if workers == 1 {
        for (y, row) in rows.iter_mut().enumerate() {
            render_row(y, row);
        }
        return;
    }

    let queue = Mutex::new(rows.chunks_mut(tile_rows).enumerate());
    let render_row = &render_row;
    thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| {
                loop {
                    let next = queue.lock().next();
                    let Some((tile, chunk)) = next else {
                        break;
                    };
                    for (i, row) in chunk.iter_mut().enumerate() {
                        render_row(tile * tile_rows + i, row);
                    }
                }
            });
        }
    });
}

/// Half the available cores, between 1 and `MAX_WORKERS`.
pub fn default_workers() -> usize {
    let cpus = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    (cpus / 2).clamp(1, MAX_WORKERS)
}

/// Cell centres mapped to `[-0.5, 0.5)`; a single cell sits at 0.
fn axis_coords(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![0.0; n];
    }
    let step = 1.0 / n as f32;
    (0..n).map(|i| i as f32 * step - 0.5).collect()
}

fn glyph_for(value: f32, glyphs: &[char]) -> char {
    let Some(last) = glyphs.len().checked_sub(1) else {
        return ' ';
    };
    let idx = (value * last as f32 + 0.5) as usize;
    glyphs[idx.min(last)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_coords_are_centered() {
        assert_eq!(axis_coords(1), vec![0.0]);
        assert_eq!(axis_coords(4), vec![-0.5, -0.25, 0.0, 0.25]);
        assert!(axis_coords(0).is_empty());
    }

    #[test]
    fn glyph_rounds_to_nearest() {
        let g = ['a', 'b', 'c'];
        assert_eq!(glyph_for(0.0, &g), 'a');
        assert_eq!(glyph_for(0.26, &g), 'b');
        assert_eq!(glyph_for(1.0, &g), 'c');
        assert_eq!(glyph_for(7.0, &g), 'c');
        assert_eq!(glyph_for(f32::NAN, &g), 'a');
        assert_eq!(glyph_for(0.5, &[]), ' ');
    }

    #[test]
    fn scan_visits_every_row_once() {
        for workers in 1..=4 {
            let mut rows = vec![0usize; 37];
            scan_rows(&mut rows, workers, |y, v| *v += y + 1);
            assert!(rows.iter().enumerate().all(|(y, v)| *v == y + 1));
        }
    }

    #[test]
    fn downsample_only_applies_to_pixels() {
        let mut px = FrameRenderer::new(8, 4, Output::Pixel);
        px.set_scale(0.25);
        assert_eq!(px.downsample(), 4);
        px.set_scale(0.01);
        assert_eq!(px.downsample(), MAX_DOWNSAMPLE);
        px.set_scale(2.0);
        assert_eq!(px.downsample(), 1);

        let mut text = FrameRenderer::new(8, 4, Output::Ascii { ansi: true });
        text.set_scale(0.25);
        assert_eq!(text.downsample(), 1);
    }
}
