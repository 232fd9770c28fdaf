use anyhow::{Context, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};
use parking_lot::Mutex;
use ringbuf::traits::{Consumer as _, Producer as _, Split as _};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::Arc;
use tracing::{info, warn};

/// Mono samples from the capture callback, kept as a fixed-size rolling window.
///
/// The callback side only ever pushes into a lock-free SPSC queue; the queue is drained
/// into the window whenever someone asks for samples.
pub struct SampleHistory {
    inner: Mutex<Window>,
}

struct Window {
    queue: HeapCons<f32>,
    ring: Vec<f32>,
    write: usize,
    filled: usize,
}

impl SampleHistory {
    /// Returns the history and the producer half for the audio callback.
    pub fn new(capacity: usize) -> (Self, HeapProd<f32>) {
        let capacity = capacity.max(1);
        let (prod, queue) = HeapRb::<f32>::new(capacity.saturating_mul(4)).split();
        let history = Self {
            inner: Mutex::new(Window {
                queue,
                ring: vec![0.0; capacity],
                write: 0,
                filled: 0,
            }),
        };
        (history, prod)
    }

    /// Replaces `out` with the held samples, oldest first.
    pub fn samples_into(&self, out: &mut Vec<f32>) {
        let mut w = self.inner.lock();
        w.drain();
        out.clear();
        let cap = w.ring.len();
        let start = (w.write + cap - w.filled) % cap;
        let (head, tail) = (start, (start + w.filled).min(cap));
        out.extend_from_slice(&w.ring[head..tail]);
        let wrapped = w.filled - (tail - head);
        out.extend_from_slice(&w.ring[..wrapped]);
    }
}

impl Window {
    fn drain(&mut self) {
        let cap = self.ring.len();
        while let Some(s) = self.queue.try_pop() {
            self.ring[self.write] = s;
            self.write = (self.write + 1) % cap;
            self.filled = (self.filled + 1).min(cap);
        }
    }
}

/// Live input stream feeding a `SampleHistory`. Dropping it stops capture.
pub struct AudioCapture {
    _stream: cpal::Stream,
    history: Arc<SampleHistory>,
    sample_rate: u32,
    device_name: String,
}

impl AudioCapture {
    pub fn start(device_query: Option<&str>, history_len: usize) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = select_input_device(&host, device_query)?;
        let device_name = device.name().unwrap_or_else(|_| "<unknown>".to_string());
        let supported = device
            .default_input_config()
            .context("get default input config")?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.clone().into();

        let (history, mut prod) = SampleHistory::new(history_len);
        let history = Arc::new(history);

        let err_fn = |err| warn!(error = %err, "audio stream error");

        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
        };

        stream.play().context("start input stream")?;
        info!(device = %device_name, sample_rate, channels, "audio capture started");

        Ok(Self {
            _stream: stream,
            history,
            sample_rate,
            device_name,
        })
    }

    pub fn history(&self) -> Arc<SampleHistory> {
        Arc::clone(&self.history)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

pub fn input_device_names() -> anyhow::Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("enumerate input devices")?;
    Ok(devices
        .map(|d| d.name().unwrap_or_else(|_| "<unknown>".to_string()))
        .collect())
}

/// First device whose name contains `query` (case-insensitive), else the host default.
fn select_input_device(host: &cpal::Host, query: Option<&str>) -> anyhow::Result<cpal::Device> {
    if let Some(want) = query.map(str::to_lowercase).filter(|q| !q.is_empty()) {
        let found = host
            .input_devices()
            .context("enumerate input devices")?
            .find(|d| d.name().is_ok_and(|n| n.to_lowercase().contains(&want)));
        match found {
            Some(dev) => return Ok(dev),
            None => warn!(query = %want, "no input device matched, using default"),
        }
    }

    host.default_input_device()
        .ok_or_else(|| anyhow!("no default input device found"))
}

/// Down-mixes interleaved frames to mono. Samples that do not fit are dropped.
fn push_interleaved<T: Sample<Float = f32> + Copy>(
    data: &[T],
    channels: usize,
    prod: &mut HeapProd<f32>,
) {
    let channels = channels.max(1);
    for frame in data.chunks(channels) {
        let acc: f32 = frame.iter().map(|s| s.to_float_sample()).sum();
        let _ = prod.try_push(acc / frame.len() as f32);
    }
}
