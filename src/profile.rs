use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::warn;

const HEADER: &str = "timestamp,section,delta_ms";

/// CSV timings for each tick: one row per section since the previous mark, plus a
/// `frame_total` row. A disabled profiler ignores every mark.
pub struct FrameProfiler<W: Write = BufWriter<File>> {
    sink: Option<W>,
    start: Instant,
    last: Instant,
}

impl FrameProfiler {
    /// Appends to `path`. A file that cannot be opened leaves profiling off.
    pub fn open(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::disabled();
        };
        let file = OpenOptions::new().create(true).append(true).open(path);
        match file.and_then(|f| FrameProfiler::new(BufWriter::new(f))) {
            Ok(p) => p,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "profiler disabled");
                Self::disabled()
            }
        }
    }
}

impl<W: Write> FrameProfiler<W> {
    pub fn new(mut sink: W) -> io::Result<Self> {
        writeln!(sink, "{HEADER}")?;
        let now = Instant::now();
        Ok(Self {
            sink: Some(sink),
            start: now,
            last: now,
        })
    }

    pub fn disabled() -> Self {
        let now = Instant::now();
        Self {
            sink: None,
            start: now,
            last: now,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn begin_frame(&mut self) {
        self.begin_frame_at(Instant::now());
    }

    pub fn mark(&mut self, section: &str) {
        self.mark_at(section, Instant::now());
    }

    pub fn end_frame(&mut self) {
        self.end_frame_at(Instant::now());
    }

    pub fn begin_frame_at(&mut self, now: Instant) {
        if self.sink.is_none() {
            return;
        }
        self.start = now;
        self.last = now;
        self.row("frame_start", 0.0);
    }

    pub fn mark_at(&mut self, section: &str, now: Instant) {
        if self.sink.is_none() {
            return;
        }
        let delta = millis(now.saturating_duration_since(self.last).as_secs_f64());
        self.last = now;
        self.row(section, delta);
    }

    pub fn end_frame_at(&mut self, now: Instant) {
        if self.sink.is_none() {
            return;
        }
        let total = millis(now.saturating_duration_since(self.start).as_secs_f64());
        self.last = now;
        self.row("frame_total", total);
    }

    /// Flushes and hands back the writer.
    pub fn finish(mut self) -> Option<W> {
        let mut sink = self.sink.take()?;
        if let Err(err) = sink.flush() {
            warn!(error = %err, "profiler flush failed");
        }
        Some(sink)
    }

    fn row(&mut self, section: &str, delta_ms: f64) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let res = writeln!(sink, "{},{section},{delta_ms:.3}", timestamp());
        if let Err(err) = res {
            warn!(error = %err, "profiler write failed, disabling");
            self.sink = None;
        }
    }
}

fn millis(secs: f64) -> f64 {
    secs * 1000.0
}

/// Wall-clock seconds since the epoch with microsecond precision.
fn timestamp() -> String {
    let since = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", since.as_secs(), since.subsec_micros())
}
