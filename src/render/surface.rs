use crate::render::Frame;
use std::io::{self, Write};

#[derive(Debug, thiserror::Error)]
pub enum PresentError {
    /// The display went away (closed pipe or terminal). Treated as a quit request.
    #[error("display surface closed")]
    Closed,
    #[error("failed to present frame: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for PresentError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::BrokenPipe | io::ErrorKind::WriteZero | io::ErrorKind::UnexpectedEof => {
                Self::Closed
            }
            _ => Self::Io(err),
        }
    }
}

impl PresentError {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Something that can put a rendered frame on screen.
pub trait Surface {
    fn name(&self) -> &'static str;

    /// Draws `frame` with `status` lines overlaid on the bottom rows.
    fn present(
        &mut self,
        frame: &Frame,
        status: &[String],
        out: &mut dyn Write,
    ) -> Result<(), PresentError>;

    /// Forget cached screen state so the next present repaints everything.
    fn invalidate(&mut self) {}
}

/// Text surface that rewrites only rows that changed since the previous present.
#[derive(Debug, Default)]
pub struct LineSurface {
    prev: Vec<String>,
}

impl LineSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Surface for LineSurface {
    fn name(&self) -> &'static str {
        "ascii"
    }

    fn present(
        &mut self,
        frame: &Frame,
        status: &[String],
        out: &mut dyn Write,
    ) -> Result<(), PresentError> {
        let Some(lines) = frame.lines() else {
            return Ok(());
        };

        let rows = lines.len();
        let overlay_from = rows.saturating_sub(status.len());
        let mut wrote = false;

        for (row, line) in lines.iter().enumerate() {
            let text = if row >= overlay_from {
                status[row - overlay_from].as_str()
            } else {
                line.as_str()
            };
            if self.prev.get(row).is_some_and(|p| p == text) {
                continue;
            }
            write!(out, "\x1b[{};1H{}\x1b[K", row + 1, text)?;
            match self.prev.get_mut(row) {
                Some(p) => {
                    p.clear();
                    p.push_str(text);
                }
                None => self.prev.push(text.to_string()),
            }
            wrote = true;
        }

        // Rows left over from a taller previous frame.
        for row in rows..self.prev.len() {
            write!(out, "\x1b[{};1H\x1b[2K", row + 1)?;
            wrote = true;
        }
        self.prev.truncate(rows);

        if wrote {
            out.write_all(b"\x1b[0m")?;
            out.flush()?;
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.prev.clear();
    }
}

/// Splits a `" | "`-separated status string into lines at most `width` characters wide.
pub fn status_lines(status: &str, width: usize) -> Vec<String> {
    if width == 0 || status.trim().is_empty() {
        return Vec::new();
    }
    let mut lines = Vec::new();
    let mut cur = String::new();
    let mut cur_len = 0usize;
    for segment in status.split(" | ") {
        let seg: String = segment.chars().take(width).collect();
        let seg_len = seg.chars().count();
        if cur_len > 0 && cur_len + 3 + seg_len > width {
            lines.push(std::mem::take(&mut cur));
            cur_len = 0;
        }
        if cur_len > 0 {
            cur.push_str(" | ");
            cur_len += 3;
        }
        cur.push_str(&seg);
        cur_len += seg_len;
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}
