use anyhow::Result;
use clap::Parser;
use std::io::{self, Write};

fn main() -> Result<()> {
    let cfg = glyphwave::config::Config::parse();
    if cfg.list_devices {
        let mut out = io::stdout();
        writeln!(out, "Input devices:")?;
        for name in glyphwave::audio::input_device_names()? {
            writeln!(out, "  - {name}")?;
        }
        return Ok(());
    }

    glyphwave::app::run(cfg)
}
