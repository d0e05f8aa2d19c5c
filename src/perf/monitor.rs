use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::PerformanceConfig;
use crate::transform::{FitMode, Size};

/// Capacity of the per-frame sample ring buffer.
pub const SAMPLE_CAPACITY: usize = 100;

/// Sliding window used for the frame-rate estimate.
const FPS_WINDOW: Duration = Duration::from_secs(1);

/// One processed frame's worth of measurements.
#[derive(Debug, Clone, Copy)]
pub struct PerformanceSample {
    pub timestamp: Instant,
    /// Full frame processing time in milliseconds.
    pub processing_ms: f64,
    /// Coordinate transform portion in milliseconds.
    pub transform_ms: f64,
    /// Estimated working-set bytes for the transform path.
    pub memory_bytes: u64,
    /// Round-trip accuracy ratio reported for this frame.
    pub accuracy: f32,
    pub rotation: f32,
    pub fit_mode: FitMode,
}

/// Alerts currently raised after debouncing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveAlerts {
    pub low_fps: bool,
    pub high_latency: bool,
    pub memory_pressure: bool,
    pub low_accuracy: bool,
}

impl ActiveAlerts {
    pub fn any(&self) -> bool {
        self.low_fps || self.high_latency || self.memory_pressure || self.low_accuracy
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BreachCounters {
    low_fps: u32,
    high_latency: u32,
    memory_pressure: u32,
    low_accuracy: u32,
}

/// Collects per-frame latency/memory/accuracy samples on the processing
/// thread and raises debounced alerts.
///
/// An alert fires only after `consecutive_breaches` breaching samples in a
/// row and clears as soon as one sample is back within bounds. The FPS
/// breach is not evaluated until a full window of frames has been observed.
pub struct PerformanceMonitor {
    config: PerformanceConfig,
    samples: VecDeque<PerformanceSample>,
    frame_times: VecDeque<Instant>,
    first_sample_at: Option<Instant>,
    breaches: BreachCounters,
    alerts: ActiveAlerts,
}

impl PerformanceMonitor {
    pub fn new(config: PerformanceConfig) -> Self {
        Self {
            config,
            samples: VecDeque::with_capacity(SAMPLE_CAPACITY),
            frame_times: VecDeque::new(),
            first_sample_at: None,
            breaches: BreachCounters::default(),
            alerts: ActiveAlerts::default(),
        }
    }

    /// Record one processed frame.
    ///
    /// `processing_start` marks the start of the full frame pipeline,
    /// `transform_start`/`transform_end` bracket the coordinate transform.
    pub fn record_frame_sample(
        &mut self,
        source: Size,
        processing_start: Instant,
        transform_start: Instant,
        transform_end: Instant,
        rotation: f32,
        fit_mode: FitMode,
        accuracy: f32,
    ) {
        let now = Instant::now();
        let first = *self.first_sample_at.get_or_insert(now);

        let processing_ms = transform_end
            .saturating_duration_since(processing_start)
            .as_secs_f64()
            * 1000.0;
        let transform_ms = transform_end
            .saturating_duration_since(transform_start)
            .as_secs_f64()
            * 1000.0;
        let memory_bytes = estimate_memory(source, self.samples.len());

        self.samples.push_back(PerformanceSample {
            timestamp: now,
            processing_ms,
            transform_ms,
            memory_bytes,
            accuracy,
            rotation,
            fit_mode,
        });
        while self.samples.len() > SAMPLE_CAPACITY {
            self.samples.pop_front();
        }

        self.frame_times.push_back(now);
        while let Some(&front) = self.frame_times.front() {
            if now.duration_since(front) > FPS_WINDOW {
                self.frame_times.pop_front();
            } else {
                break;
            }
        }

        // FPS判定はウィンドウが埋まってから
        let fps_ready = now.duration_since(first) >= FPS_WINDOW;
        let fps = self.current_fps();
        let debounce = self.config.consecutive_breaches;

        step_breach(
            fps_ready && fps < self.config.min_fps,
            &mut self.breaches.low_fps,
            &mut self.alerts.low_fps,
            debounce,
        );
        step_breach(
            transform_ms > self.config.max_transform_ms,
            &mut self.breaches.high_latency,
            &mut self.alerts.high_latency,
            debounce,
        );
        step_breach(
            memory_bytes as f64 > self.config.max_memory_mb * 1024.0 * 1024.0,
            &mut self.breaches.memory_pressure,
            &mut self.alerts.memory_pressure,
            debounce,
        );
        step_breach(
            accuracy < self.config.min_accuracy,
            &mut self.breaches.low_accuracy,
            &mut self.alerts.low_accuracy,
            debounce,
        );
    }

    /// Frames observed within the last second.
    pub fn current_fps(&self) -> f32 {
        self.frame_times.len() as f32
    }

    pub fn active_alerts(&self) -> ActiveAlerts {
        self.alerts
    }

    pub fn samples(&self) -> &VecDeque<PerformanceSample> {
        &self.samples
    }

    pub fn latest_sample(&self) -> Option<&PerformanceSample> {
        self.samples.back()
    }

    /// Human-readable diagnostic summary. Free-form, not machine-parsed.
    pub fn diagnostic_report(&self) -> String {
        let n = self.samples.len();
        let (avg_processing, avg_transform, avg_accuracy, memory) = if n > 0 {
            let p: f64 = self.samples.iter().map(|s| s.processing_ms).sum();
            let t: f64 = self.samples.iter().map(|s| s.transform_ms).sum();
            let a: f32 = self.samples.iter().map(|s| s.accuracy).sum();
            let m = self.samples.back().map(|s| s.memory_bytes).unwrap_or(0);
            (p / n as f64, t / n as f64, a / n as f32, m)
        } else {
            (0.0, 0.0, 0.0, 0)
        };

        let mut report = String::new();
        report.push_str("=== Overlay Transform Diagnostics ===\n");
        report.push_str(&format!("Samples: {}\n", n));
        report.push_str(&format!("FPS (1s window): {:.1}\n", self.current_fps()));
        report.push_str(&format!(
            "Processing: {:.3}ms avg | Transform: {:.3}ms avg\n",
            avg_processing, avg_transform
        ));
        report.push_str(&format!(
            "Memory estimate: {:.2}MB\n",
            memory as f64 / (1024.0 * 1024.0)
        ));
        report.push_str(&format!("Accuracy: {:.3} avg\n", avg_accuracy));
        report.push_str(&format!(
            "Alerts: fps={} latency={} memory={} accuracy={}\n",
            self.alerts.low_fps,
            self.alerts.high_latency,
            self.alerts.memory_pressure,
            self.alerts.low_accuracy
        ));
        report
    }
}

fn step_breach(breaching: bool, counter: &mut u32, alert: &mut bool, debounce: u32) {
    if breaching {
        *counter += 1;
        if *counter >= debounce {
            *alert = true;
        }
    } else {
        *counter = 0;
        *alert = false;
    }
}

/// Rough footprint estimate for the transform path: the sample ring plus
/// one RGBA frame at the current source resolution.
fn estimate_memory(source: Size, sample_count: usize) -> u64 {
    let frame = if source.is_valid() {
        (source.width as u64) * (source.height as u64) * 4
    } else {
        0
    };
    let ring = (sample_count as u64 + 1) * std::mem::size_of::<PerformanceSample>() as u64;
    frame + ring
}
