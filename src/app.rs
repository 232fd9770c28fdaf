use crate::analyzer::{self, Analyzer, AnalyzerConfig, Features};
use crate::audio::{AudioCapture, SampleHistory};
use crate::config::{Backend, Config, Quality};
use crate::control::{ControlState, Selection};
use crate::logging;
use crate::params::{Parameters, Transient};
use crate::profile::FrameProfiler;
use crate::render::color::ColorMode;
use crate::render::palette::Palette;
use crate::render::pattern::Pattern;
use crate::render::{
    FrameRenderer, HalfBlockSurface, LineSurface, Output, PresentError, Surface, status_lines,
};
use crate::synth::SyntheticFeatures;
use crate::terminal::{self, TerminalGuard};
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::fmt::Write as _;
use std::fs;
use std::io::{BufWriter, stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const MIN_ANALYSIS_WINDOW: usize = 256;
pub const MAX_ANALYSIS_WINDOW: usize = 2048;
const FALLBACK_BUFFER_SIZE: usize = 4096;
const RANDOM_PICK_TRIES: usize = 4;

pub fn run(cfg: Config) -> anyhow::Result<()> {
    logging::init(cfg.log_file.as_deref())?;
    let quality = cfg.quality.resolve()?;
    info!(
        backend = ?cfg.backend,
        quality = quality.label(),
        requested_quality = ?cfg.quality,
        palette = %cfg.palette,
        pattern = %cfg.pattern,
        color_mode = %cfg.color_mode,
        fps = cfg.fps,
        "starting"
    );

    let mut source = FeatureSource::open(&cfg);
    let mut profiler = FrameProfiler::open(cfg.profile_log.as_deref());
    if profiler.is_enabled() {
        info!(path = ?cfg.profile_log, "frame profiling on");
    }

    let params = Parameters {
        pattern: Pattern::resolve(&cfg.pattern).name().to_string(),
        color_mode: ColorMode::resolve(&cfg.color_mode).name().to_string(),
        scale: cfg.scale,
        ..Parameters::default()
    };
    let control = Arc::new(ControlState::new(params));

    let _term = TerminalGuard::enter()?;
    let mut out = BufWriter::new(stdout());

    let mut term_size = terminal::size();
    let (w, h) = grid_size(&cfg, term_size);
    let output = match cfg.backend {
        Backend::Ascii => Output::Ascii { ansi: !cfg.no_color },
        Backend::Pixel => Output::Pixel,
    };
    let mut renderer = FrameRenderer::new(w, h, output);
    renderer.configure(&cfg.palette, &cfg.pattern, &cfg.color_mode, cfg.color_on_audio);
    renderer.set_quality(quality);
    renderer.set_scale(cfg.scale);
    control.set_active(active_selection(&renderer));

    let mut surface: Box<dyn Surface> = match output {
        Output::Ascii { .. } => Box::new(LineSurface::new()),
        Output::Pixel => Box::new(HalfBlockSurface::new(true)),
    };
    info!(
        width = w,
        height = h,
        surface = surface.name(),
        workers = renderer.workers(),
        "renderer ready"
    );

    let fps_target = cfg.fps.max(1) as f32;
    let frame_budget = Duration::from_secs_f32(1.0 / fps_target);
    let stride = u64::from(cfg.stride.max(1));
    let mut rng = fastrand::Rng::new();
    let mut fps = FpsCounter::new();
    let mut show_status = cfg.status;
    let mut last_tick = Instant::now();
    let mut last_randomize = last_tick;
    let mut tick: u64 = 0;

    while !control.should_stop() {
        let now = Instant::now();
        let mut randomize_now = false;
        profiler.begin_frame_at(now);

        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    match handle_key(k.code, k.modifiers) {
                        KeyAction::Quit => control.request_stop(),
                        KeyAction::Randomize => randomize_now = true,
                        KeyAction::CycleQuality => control.request_selection(Selection {
                            quality: Some(renderer.quality().next().label().to_string()),
                            ..Selection::default()
                        }),
                        KeyAction::ToggleStatus => {
                            show_status = !show_status;
                            surface.invalidate();
                        }
                        KeyAction::None => {}
                    }
                }
                Event::Resize(c, r) => term_size = (c, r),
                _ => {}
            }
        }
        if control.should_stop() {
            break;
        }

        // Resize events are not delivered by every terminal.
        let sz = terminal::size();
        if sz != term_size {
            term_size = sz;
        }
        let grid = grid_size(&cfg, term_size);
        if grid != renderer.dimensions() {
            debug!(width = grid.0, height = grid.1, "resize");
            renderer.resize(grid.0, grid.1);
            surface.invalidate();
            TerminalGuard::clear(&mut out)?;
        }

        let dt = frame_dt(now.duration_since(last_tick).as_secs_f32(), fps_target);
        last_tick = now;

        let features = source.next(dt, cfg.noise_floor, &mut profiler);
        control.set_features(features);
        let transient = control.update_params(|p| {
            let t = p.apply_features(features, dt);
            p.update_time(dt);
            t
        });
        profiler.mark("params");
        if transient == Transient::Drop {
            debug!(bass = features.bass, "drop");
        }

        if cfg.auto_randomize
            && now.duration_since(last_randomize).as_secs_f32() >= cfg.randomize_interval.max(0.5)
        {
            randomize_now = true;
        }
        if randomize_now {
            last_randomize = now;
            control.request_selection(random_selection(&renderer, &mut rng));
        }
        if let Some(sel) = control.take_selection() {
            apply_selection(&mut renderer, &control, sel, cfg.color_on_audio);
        }

        tick += 1;
        if tick % stride == 0 {
            let params = control.params();
            let mut frame = renderer.render(&params, &features, fps.fps());
            profiler.mark("render");
            let mut status = std::mem::take(&mut frame.status);
            if let Some(name) = source.device_name() {
                let _ = write!(status, " | mic={name}");
            }
            let lines = if show_status {
                status_lines(&status, renderer.dimensions().0)
            } else {
                Vec::new()
            };
            match surface.present(&frame, &lines, &mut out) {
                Ok(()) => {}
                Err(PresentError::Closed) => {
                    info!("display closed");
                    control.request_stop();
                }
                Err(err) => return Err(err).context("present frame"),
            }
            profiler.mark("present");
            renderer.recycle(frame);
        }
        profiler.end_frame();

        fps.tick();
        control.set_fps(fps.fps());

        let elapsed = now.elapsed();
        if elapsed < frame_budget {
            std::thread::sleep(frame_budget - elapsed);
        }
    }

    info!(ticks = tick, fps = fps.fps(), "stopping");
    profiler.finish();
    if let Some(path) = &cfg.status_json {
        let json = control.snapshot_json().context("serialize snapshot")?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    }
    Ok(())
}

/// Where features come from each tick: the analyzer over live capture, or the generator.
enum FeatureSource {
    Live {
        capture: AudioCapture,
        history: Arc<SampleHistory>,
        analyzer: Analyzer,
        window: usize,
        samples: Vec<f32>,
    },
    Synthetic(SyntheticFeatures),
}

impl FeatureSource {
    fn open(cfg: &Config) -> Self {
        if cfg.no_audio {
            info!("audio disabled, using synthetic features");
            return Self::Synthetic(SyntheticFeatures::new());
        }
        match AudioCapture::start(cfg.device.as_deref(), cfg.buffer_size) {
            Ok(capture) => {
                let analyzer = Analyzer::new(AnalyzerConfig {
                    sample_rate: capture.sample_rate() as f32,
                    history_size: cfg.history_size,
                    ..AnalyzerConfig::default()
                });
                Self::Live {
                    history: capture.history(),
                    capture,
                    analyzer,
                    window: select_analysis_window(cfg.buffer_size),
                    samples: Vec::with_capacity(cfg.buffer_size),
                }
            }
            Err(err) => {
                warn!(
                    error = %format!("{err:#}"),
                    "audio capture unavailable, using synthetic features"
                );
                Self::Synthetic(SyntheticFeatures::new())
            }
        }
    }

    fn next(&mut self, dt: f32, noise_floor: f32, profiler: &mut FrameProfiler) -> Features {
        match self {
            Self::Live {
                history,
                analyzer,
                window,
                samples,
                ..
            } => {
                history.samples_into(samples);
                profiler.mark("capture");
                let start = samples.len().saturating_sub(*window);
                let features = analyzer.analyze(&samples[start..], dt);
                profiler.mark("analyze");
                analyzer::gate_features(features, noise_floor)
            }
            Self::Synthetic(generator) => generator.next(dt),
        }
    }

    fn device_name(&self) -> Option<&str> {
        match self {
            Self::Live { capture, .. } => Some(capture.device_name()),
            Self::Synthetic(_) => None,
        }
    }
}

/// FFT window for a history of `buffer_size` samples.
pub fn select_analysis_window(buffer_size: usize) -> usize {
    let buffer_size = if buffer_size == 0 {
        FALLBACK_BUFFER_SIZE
    } else {
        buffer_size
    };
    (buffer_size / 4).clamp(MIN_ANALYSIS_WINDOW, MAX_ANALYSIS_WINDOW)
}

/// Uniform pick that tries a few times to land on something other than `current`.
pub fn pick_random<T: Copy + PartialEq>(options: &[T], current: T, rng: &mut fastrand::Rng) -> T {
    match options.len() {
        0 => current,
        1 => options[0],
        n => {
            let mut choice = options[rng.usize(..n)];
            for _ in 1..RANDOM_PICK_TRIES {
                if choice != current {
                    break;
                }
                choice = options[rng.usize(..n)];
            }
            choice
        }
    }
}

fn random_selection(renderer: &FrameRenderer, rng: &mut fastrand::Rng) -> Selection {
    let palette = pick_random(&Palette::ALL, renderer.palette(), rng);
    let pattern = pick_random(&Pattern::ALL, renderer.pattern(), rng);
    let color_mode = pick_random(&ColorMode::ALL, renderer.color_mode(), rng);
    Selection {
        palette: Some(palette.name().to_string()),
        pattern: Some(pattern.name().to_string()),
        color_mode: Some(color_mode.name().to_string()),
        quality: None,
    }
}

fn active_selection(renderer: &FrameRenderer) -> Selection {
    Selection {
        palette: Some(renderer.palette().name().to_string()),
        pattern: Some(renderer.pattern().name().to_string()),
        color_mode: Some(renderer.color_mode().name().to_string()),
        quality: Some(renderer.quality().label().to_string()),
    }
}

/// Applies a pending selection between renders and mirrors it into the shared state.
fn apply_selection(
    renderer: &mut FrameRenderer,
    control: &ControlState,
    sel: Selection,
    color_on_audio: bool,
) {
    let palette = sel.palette.as_deref().unwrap_or(renderer.palette().name());
    let pattern = sel.pattern.as_deref().unwrap_or(renderer.pattern().name());
    let color_mode = sel.color_mode.as_deref().unwrap_or(renderer.color_mode().name());
    renderer.configure(palette, pattern, color_mode, color_on_audio);
    if let Some(q) = sel.quality.as_deref() {
        renderer.set_quality(Quality::from_name(q));
    }

    let active = active_selection(renderer);
    control.update_params(|p| {
        p.pattern = renderer.pattern().name().to_string();
        p.color_mode = renderer.color_mode().name().to_string();
    });
    info!(
        palette = renderer.palette().name(),
        pattern = renderer.pattern().name(),
        color_mode = renderer.color_mode().name(),
        quality = renderer.quality().label(),
        "selection applied"
    );
    control.set_active(active);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Quit,
    Randomize,
    CycleQuality,
    ToggleStatus,
}

pub fn handle_key(code: KeyCode, modifiers: KeyModifiers) -> KeyAction {
    let ctrl_c = matches!(code, KeyCode::Char('c') | KeyCode::Char('C'));
    if ctrl_c && modifiers.contains(KeyModifiers::CONTROL) {
        return KeyAction::Quit;
    }
    match code {
        KeyCode::Esc | KeyCode::Char('q') => KeyAction::Quit,
        KeyCode::Char('r') | KeyCode::Char('R') => KeyAction::Randomize,
        KeyCode::Char('Q') => KeyAction::CycleQuality,
        KeyCode::Char('s') | KeyCode::Char('S') => KeyAction::ToggleStatus,
        _ => KeyAction::None,
    }
}

/// Seconds since the last tick; non-positive or non-finite gaps count as one frame.
pub fn frame_dt(elapsed: f32, fps: f32) -> f32 {
    if elapsed.is_finite() && elapsed > 0.0 {
        elapsed
    } else {
        1.0 / fps.max(1.0)
    }
}

/// Cell grid: explicit `--width`/`--height` win, otherwise the terminal size.
fn grid_size(cfg: &Config, term: (u16, u16)) -> (usize, usize) {
    let w = cfg.width.unwrap_or(term.0);
    let h = cfg.height.unwrap_or(term.1);
    (usize::from(w), usize::from(h))
}

pub struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(last: Instant) -> Self {
        Self {
            last,
            frames: 0,
            fps: 0.0,
        }
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Counts a frame; the rate is refreshed every half second.
    pub fn tick_at(&mut self, now: Instant) {
        self.frames += 1;
        let dt = now.duration_since(self.last).as_secs_f32();
        if dt >= 0.5 {
            self.fps = self.frames as f32 / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}
