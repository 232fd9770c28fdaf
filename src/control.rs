use crate::analyzer::Features;
use crate::params::Parameters;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Renderer selection by name. `None` leaves that part unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub palette: Option<String>,
    pub pattern: Option<String>,
    pub color_mode: Option<String>,
    pub quality: Option<String>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.palette.is_none()
            && self.pattern.is_none()
            && self.color_mode.is_none()
            && self.quality.is_none()
    }

    /// Fields set in `newer` win.
    fn merge(&mut self, newer: Selection) {
        if newer.palette.is_some() {
            self.palette = newer.palette;
        }
        if newer.pattern.is_some() {
            self.pattern = newer.pattern;
        }
        if newer.color_mode.is_some() {
            self.color_mode = newer.color_mode;
        }
        if newer.quality.is_some() {
            self.quality = newer.quality;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub params: Parameters,
    pub features: Features,
    pub fps: f32,
    pub active: Selection,
}

/// State shared between the tick loop and anything else that wants to observe or steer it.
///
/// The tick loop is the only writer of parameters during a tick and applies pending
/// selections between renders.
pub struct ControlState {
    params: RwLock<Parameters>,
    features: RwLock<Features>,
    fps_bits: AtomicU32,
    active: RwLock<Selection>,
    pending: Mutex<Option<Selection>>,
    stop: AtomicBool,
}

impl ControlState {
    pub fn new(params: Parameters) -> Self {
        Self {
            params: RwLock::new(params),
            features: RwLock::new(Features::default()),
            fps_bits: AtomicU32::new(0),
            active: RwLock::new(Selection::default()),
            pending: Mutex::new(None),
            stop: AtomicBool::new(false),
        }
    }

    pub fn params(&self) -> Parameters {
        self.params.read().clone()
    }

    pub fn set_params(&self, params: Parameters) {
        *self.params.write() = params;
    }

    /// Runs `f` under the write lock and returns its result.
    pub fn update_params<R>(&self, f: impl FnOnce(&mut Parameters) -> R) -> R {
        f(&mut self.params.write())
    }

    pub fn features(&self) -> Features {
        *self.features.read()
    }

    pub fn set_features(&self, features: Features) {
        *self.features.write() = features;
    }

    pub fn fps(&self) -> f32 {
        f32::from_bits(self.fps_bits.load(Ordering::Relaxed))
    }

    pub fn set_fps(&self, fps: f32) {
        self.fps_bits.store(fps.to_bits(), Ordering::Relaxed);
    }

    pub fn active(&self) -> Selection {
        self.active.read().clone()
    }

    pub fn set_active(&self, selection: Selection) {
        *self.active.write() = selection;
    }

    /// Queues a reconfiguration; repeated requests before the next tick are merged.
    pub fn request_selection(&self, selection: Selection) {
        if selection.is_empty() {
            return;
        }
        let mut pending = self.pending.lock();
        match pending.as_mut() {
            Some(cur) => cur.merge(selection),
            None => *pending = Some(selection),
        }
    }

    pub fn take_selection(&self) -> Option<Selection> {
        self.pending.lock().take()
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> Snapshot {
        let params = self.params.read();
        let features = self.features.read();
        Snapshot {
            params: params.clone(),
            features: *features,
            fps: self.fps(),
            active: self.active.read().clone(),
        }
    }

    pub fn snapshot_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new(Parameters::default())
    }
}
