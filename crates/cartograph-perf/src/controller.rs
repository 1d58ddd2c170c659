//! Frame timing, moving-average frame time and the hysteretic LOD loop.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, trace};

/// Number of frames averaged with a simple running mean before switching to
/// the exponential moving average.
pub const FRAME_AVERAGE_WARMUP: u64 = 30;

/// Weight kept from the previous average on each EMA step.
const EMA_KEEP: f64 = 0.95;
/// Weight given to the newest frame on each EMA step.
const EMA_BLEND: f64 = 0.05;

/// The FPS snapshot and LOD adjustment run at most once per this interval.
const ADJUST_INTERVAL: Duration = Duration::from_secs(1);

const NANOS_PER_MS: f64 = 1e6;

/// Tuning for the adaptive LOD loop.
#[derive(Clone, Debug, PartialEq)]
pub struct LodSettings {
    /// Highest (coarsest) LOD value.
    pub max_lod: u8,
    /// Run the feedback loop on every FPS tick.
    pub adaptive: bool,
    /// Average frame time above which LOD is raised (~30 fps).
    pub slow_frame_ms: f64,
    /// Average frame time below which LOD is lowered (~60 fps).
    pub fast_frame_ms: f64,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            max_lod: 4,
            adaptive: true,
            slow_frame_ms: 33.0,
            fast_frame_ms: 16.0,
        }
    }
}

/// Read-only diagnostics for overlays and debug dumps.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PerfStats {
    pub fps: u32,
    pub avg_frame_ms: f64,
    pub lod: u8,
    pub max_lod: u8,
    pub frame_count: u64,
    pub adaptive: bool,
}

/// Times frames and owns the process-wide LOD value for one map session.
///
/// Bracket every frame with [`start_frame`](Self::start_frame) and
/// [`end_frame`](Self::end_frame). Tests and replay tools can feed synthetic
/// durations through [`record_frame`](Self::record_frame) instead.
pub struct PerformanceController {
    settings: LodSettings,
    lod: u8,
    frame_start: Option<Instant>,
    /// Smoothed frame duration in nanoseconds.
    avg_frame_time_ns: f64,
    frame_count: u64,
    fps_counter: u32,
    current_fps: u32,
    last_fps_update: Instant,
}

impl PerformanceController {
    /// Create a controller whose first FPS window starts now.
    pub fn new(settings: LodSettings) -> Self {
        Self::starting_at(settings, Instant::now())
    }

    /// Create a controller whose first FPS window starts at `now`.
    pub fn starting_at(settings: LodSettings, now: Instant) -> Self {
        Self {
            settings,
            lod: 0,
            frame_start: None,
            avg_frame_time_ns: 0.0,
            frame_count: 0,
            fps_counter: 0,
            current_fps: 0,
            last_fps_update: now,
        }
    }

    /// Mark the beginning of a frame.
    pub fn start_frame(&mut self) {
        self.frame_start = Some(Instant::now());
    }

    /// Mark the end of a frame started with [`start_frame`](Self::start_frame).
    ///
    /// Without a matching `start_frame` this does nothing.
    pub fn end_frame(&mut self) {
        let now = Instant::now();
        if let Some(start) = self.frame_start.take() {
            self.record_frame(now.duration_since(start), now);
        }
    }

    /// Fold one frame duration into the average and run the once-per-second
    /// FPS snapshot and LOD adjustment when `now` has crossed the interval.
    pub fn record_frame(&mut self, elapsed: Duration, now: Instant) {
        let elapsed_ns = elapsed.as_nanos() as f64;
        self.frame_count += 1;

        if self.frame_count <= FRAME_AVERAGE_WARMUP {
            self.avg_frame_time_ns +=
                (elapsed_ns - self.avg_frame_time_ns) / self.frame_count as f64;
        } else {
            self.avg_frame_time_ns = self.avg_frame_time_ns * EMA_KEEP + elapsed_ns * EMA_BLEND;
        }

        self.fps_counter += 1;
        if now.saturating_duration_since(self.last_fps_update) >= ADJUST_INTERVAL {
            self.current_fps = self.fps_counter;
            self.fps_counter = 0;
            self.last_fps_update = now;
            trace!(
                fps = self.current_fps,
                avg_ms = self.avg_frame_time_ns / NANOS_PER_MS,
                "fps tick"
            );

            if self.settings.adaptive {
                self.adjust_lod();
            }
        }
    }

    /// One step of the feedback loop. Moves the LOD by at most one level and
    /// returns the signed change.
    ///
    /// Between the fast and slow thresholds nothing happens, which keeps the
    /// value from oscillating.
    pub fn adjust_lod(&mut self) -> i8 {
        let frame_time_ms = self.avg_frame_time_ns / NANOS_PER_MS;

        let max_lod = self.settings.max_lod;
        let change = if frame_time_ms > self.settings.slow_frame_ms && self.lod < max_lod {
            self.lod += 1;
            1
        } else if frame_time_ms < self.settings.fast_frame_ms && self.lod > 0 {
            self.lod -= 1;
            -1
        } else {
            0
        };

        if change != 0 {
            debug!(lod = self.lod, frame_time_ms, "LOD adjusted");
        }
        change
    }

    /// Return LOD to 0 and forget all timing history.
    pub fn reset(&mut self) {
        self.lod = 0;
        self.frame_start = None;
        self.avg_frame_time_ns = 0.0;
        self.frame_count = 0;
        self.fps_counter = 0;
        self.current_fps = 0;
        self.last_fps_update = Instant::now();
    }

    /// Turn the feedback loop on or off. The current LOD is kept.
    pub fn set_adaptive(&mut self, adaptive: bool) {
        self.settings.adaptive = adaptive;
    }

    pub fn current_lod(&self) -> u8 {
        self.lod
    }

    pub fn max_lod(&self) -> u8 {
        self.settings.max_lod
    }

    /// Frames counted in the last completed one-second window.
    pub fn current_fps(&self) -> u32 {
        self.current_fps
    }

    /// The smoothed frame duration.
    pub fn average_frame_time(&self) -> Duration {
        Duration::from_nanos(self.avg_frame_time_ns as u64)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn settings(&self) -> &LodSettings {
        &self.settings
    }

    /// Snapshot for diagnostics overlays.
    pub fn stats(&self) -> PerfStats {
        PerfStats {
            fps: self.current_fps,
            avg_frame_ms: self.avg_frame_time_ns / NANOS_PER_MS,
            lod: self.lod,
            max_lod: self.settings.max_lod,
            frame_count: self.frame_count,
            adaptive: self.settings.adaptive,
        }
    }
}

impl Default for PerformanceController {
    fn default() -> Self {
        Self::new(LodSettings::default())
    }
}
