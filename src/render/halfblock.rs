use crate::render::{Frame, PresentError, Surface};
use std::io::Write;

const HALF_BLOCK: char = '\u{2580}';

/// Presents RGBA frames as `▀` cells: top pixel in the foreground, bottom in the background.
pub struct HalfBlockSurface {
    sync_updates: bool,
    last_fg: Option<[u8; 3]>,
    last_bg: Option<[u8; 3]>,
}

impl HalfBlockSurface {
    pub fn new(sync_updates: bool) -> Self {
        Self {
            sync_updates,
            last_fg: None,
            last_bg: None,
        }
    }
}

impl Surface for HalfBlockSurface {
    fn name(&self) -> &'static str {
        "halfblock"
    }

    fn present(
        &mut self,
        frame: &Frame,
        status: &[String],
        out: &mut dyn Write,
    ) -> Result<(), PresentError> {
        let Some(px) = frame.pixels() else {
            return Ok(());
        };
        let (w, h) = (px.width, px.height);
        let rows = h / 2;
        if w == 0 || rows == 0 || px.rgba.len() < w * h * 4 {
            return Ok(());
        }
        let overlay_from = rows.saturating_sub(status.len());

        if self.sync_updates {
            out.write_all(b"\x1b[?2026h")?;
        }
        out.write_all(b"\x1b[H\x1b[0m")?;
        // Full-width rows would wrap on some terminals with DECAWM on.
        out.write_all(b"\x1b[?7l")?;
        self.last_fg = None;
        self.last_bg = None;

        let rgb = |x: usize, y: usize| {
            let i = (y * w + x) * 4;
            [px.rgba[i], px.rgba[i + 1], px.rgba[i + 2]]
        };

        for row in 0..overlay_from {
            for x in 0..w {
                let top = rgb(x, row * 2);
                let bottom = rgb(x, row * 2 + 1);
                if self.last_fg != Some(top) {
                    write!(out, "\x1b[38;2;{};{};{}m", top[0], top[1], top[2])?;
                    self.last_fg = Some(top);
                }
                if self.last_bg != Some(bottom) {
                    write!(out, "\x1b[48;2;{};{};{}m", bottom[0], bottom[1], bottom[2])?;
                    self.last_bg = Some(bottom);
                }
                write!(out, "{HALF_BLOCK}")?;
            }
            // A line feed after the bottom row would scroll the screen.
            if row + 1 < overlay_from {
                out.write_all(b"\r\n")?;
            }
        }

        for (i, line) in status.iter().take(rows).enumerate() {
            write!(out, "\x1b[{};1H\x1b[0m\x1b[2K", overlay_from + i + 1)?;
            let text: String = line.chars().take(w).collect();
            out.write_all(text.as_bytes())?;
        }

        out.write_all(b"\x1b[0m\x1b[?7h")?;
        if self.sync_updates {
            out.write_all(b"\x1b[?2026l")?;
        }
        out.flush()?;
        Ok(())
    }

    fn invalidate(&mut self) {
        self.last_fg = None;
        self.last_bg = None;
    }
}
