use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::transform::{
    calculate_transformation, generate_test_points, invert_matrix, validate_round_trip, FitMode,
    MirrorMode, Size, TransformConfig,
};

/// Rotations exercised by the accuracy and benchmark matrices.
pub const STANDARD_ROTATIONS: [f32; 4] = [0.0, 90.0, 180.0, 270.0];

/// Target per-transform latency in milliseconds, used for scoring.
const TARGET_TRANSFORM_MS: f64 = 5.0;

/// Memory budget per benchmark run used for scoring, in bytes.
const MEMORY_SCORE_BUDGET: f64 = 1024.0 * 1024.0;

/// Aggregate latency statistics over one benchmark run.
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkResult {
    pub iterations: usize,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// Fraction of iterations that produced a valid transform state.
    pub success_rate: f64,
    /// Estimated allocation growth across the run.
    pub memory_delta_bytes: u64,
}

/// Round-trip accuracy for one rotation × fit-mode combination.
#[derive(Debug, Clone, Copy)]
pub struct AccuracyResult {
    pub rotation: f32,
    pub fit_mode: FitMode,
    pub max_error: f32,
    pub mean_error: f32,
    pub accuracy_ratio: f32,
    pub passed: bool,
}

/// Accuracy results over the full rotation × fit-mode matrix.
#[derive(Debug, Clone)]
pub struct AccuracyReport {
    pub results: Vec<AccuracyResult>,
    pub overall_accuracy: f32,
    pub all_passed: bool,
}

/// Combined outcome of a full benchmark sweep.
#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub benchmarks: Vec<(String, BenchmarkResult)>,
    pub accuracy_reports: Vec<(String, AccuracyReport)>,
    /// Average of latency, success-rate and memory scores, in [0, 1].
    pub performance_score: f64,
    /// Average round-trip accuracy across all matrices, in [0, 1].
    pub accuracy_score: f64,
    /// True when the cancel flag stopped the sweep early.
    pub interrupted: bool,
}

/// Offline benchmark harness around the transform orchestrator.
///
/// Every operation here is explicitly invoked and blocks for its duration.
/// None of it runs on the per-frame path. Long sweeps poll a shared cancel
/// flag between iterations so a caller can stop them cooperatively.
pub struct TransformBenchmark {
    tolerance_px: f32,
    cancel: Arc<AtomicBool>,
}

impl TransformBenchmark {
    pub fn new(tolerance_px: f32) -> Self {
        Self {
            tolerance_px,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag; set to true to stop a running sweep at the next
    /// iteration boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Time `calculate_transformation` over `iterations` runs of one
    /// configuration.
    pub fn benchmark_transformation(
        &self,
        source: Size,
        target: Size,
        rotation: f32,
        fit_mode: FitMode,
        iterations: usize,
    ) -> BenchmarkResult {
        let config = TransformConfig {
            source,
            target,
            sensor_orientation: rotation,
            display_rotation: 0.0,
            front_facing: false,
            fit_mode,
            mirror_mode: MirrorMode::None,
        };

        let mut latencies = Vec::with_capacity(iterations);
        let mut successes = 0usize;
        for _ in 0..iterations {
            if self.cancelled() {
                break;
            }
            let t0 = Instant::now();
            let state = calculate_transformation(&config);
            latencies.push(t0.elapsed().as_secs_f64() * 1000.0);
            if state.is_valid {
                successes += 1;
            }
        }

        let memory_delta_bytes =
            (latencies.capacity() * std::mem::size_of::<f64>()) as u64;
        summarize(latencies, successes, memory_delta_bytes)
    }

    /// Round-trip accuracy over every rotation × fit-mode combination.
    pub fn test_accuracy(&self, source: Size, target: Size, density: usize) -> AccuracyReport {
        let points = generate_test_points(source, density);
        let mut results = Vec::with_capacity(STANDARD_ROTATIONS.len() * FitMode::ALL.len());

        for &rotation in &STANDARD_ROTATIONS {
            for fit_mode in FitMode::ALL {
                if self.cancelled() {
                    break;
                }
                let config = TransformConfig {
                    source,
                    target,
                    sensor_orientation: rotation,
                    display_rotation: 0.0,
                    front_facing: false,
                    fit_mode,
                    mirror_mode: MirrorMode::None,
                };
                let state = calculate_transformation(&config);
                if !state.is_valid {
                    results.push(AccuracyResult {
                        rotation,
                        fit_mode,
                        max_error: f32::INFINITY,
                        mean_error: f32::INFINITY,
                        accuracy_ratio: 0.0,
                        passed: false,
                    });
                    continue;
                }
                let (inverse, ok) = invert_matrix(&state.matrix);
                if !ok {
                    results.push(AccuracyResult {
                        rotation,
                        fit_mode,
                        max_error: f32::INFINITY,
                        mean_error: f32::INFINITY,
                        accuracy_ratio: 0.0,
                        passed: false,
                    });
                    continue;
                }
                let report =
                    validate_round_trip(&state.matrix, &inverse, &points, self.tolerance_px);
                results.push(AccuracyResult {
                    rotation,
                    fit_mode,
                    max_error: report.max_error,
                    mean_error: report.mean_error,
                    accuracy_ratio: report.accuracy_ratio,
                    passed: report.passed,
                });
            }
        }

        let overall_accuracy = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.accuracy_ratio).sum::<f32>() / results.len() as f32
        };
        let all_passed = !results.is_empty() && results.iter().all(|r| r.passed);
        AccuracyReport {
            results,
            overall_accuracy,
            all_passed,
        }
    }

    /// Cross-product sweep over representative resolutions, rotations and
    /// fit modes, reduced to one performance score and one accuracy score.
    pub fn run_full_suite(&self, iterations: usize, density: usize) -> SuiteReport {
        let sources = [
            Size::new(640.0, 480.0),
            Size::new(1280.0, 720.0),
            Size::new(1920.0, 1080.0),
        ];
        let target = Size::new(1080.0, 1920.0);

        let mut benchmarks = Vec::new();
        let mut accuracy_reports = Vec::new();
        let mut perf_scores = Vec::new();

        'outer: for source in sources {
            for &rotation in &STANDARD_ROTATIONS {
                for fit_mode in FitMode::ALL {
                    if self.cancelled() {
                        break 'outer;
                    }
                    let label = format!(
                        "{}x{} rot={} {}",
                        source.width, source.height, rotation,
                        fit_mode.label()
                    );
                    let result =
                        self.benchmark_transformation(source, target, rotation, fit_mode, iterations);
                    perf_scores.push(performance_score(&result));
                    benchmarks.push((label, result));
                }
            }
            let label = format!("{}x{}", source.width, source.height);
            accuracy_reports.push((label, self.test_accuracy(source, target, density)));
        }

        let performance_score = if perf_scores.is_empty() {
            0.0
        } else {
            perf_scores.iter().sum::<f64>() / perf_scores.len() as f64
        };
        let accuracy_score = if accuracy_reports.is_empty() {
            0.0
        } else {
            accuracy_reports
                .iter()
                .map(|(_, r)| r.overall_accuracy as f64)
                .sum::<f64>()
                / accuracy_reports.len() as f64
        };

        SuiteReport {
            benchmarks,
            accuracy_reports,
            performance_score,
            accuracy_score,
            interrupted: self.cancelled(),
        }
    }
}

/// Average of normalized latency, success-rate and memory scores.
fn performance_score(result: &BenchmarkResult) -> f64 {
    let latency_score = (1.0 - result.mean_ms / TARGET_TRANSFORM_MS).clamp(0.0, 1.0);
    let memory_score =
        (1.0 - result.memory_delta_bytes as f64 / MEMORY_SCORE_BUDGET).clamp(0.0, 1.0);
    (latency_score + result.success_rate + memory_score) / 3.0
}

fn summarize(mut latencies: Vec<f64>, successes: usize, memory_delta_bytes: u64) -> BenchmarkResult {
    let iterations = latencies.len();
    if iterations == 0 {
        return BenchmarkResult {
            iterations: 0,
            mean_ms: 0.0,
            median_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
            success_rate: 0.0,
            memory_delta_bytes,
        };
    }

    latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mean_ms = latencies.iter().sum::<f64>() / iterations as f64;

    BenchmarkResult {
        iterations,
        mean_ms,
        median_ms: percentile(&latencies, 50.0),
        p95_ms: percentile(&latencies, 95.0),
        p99_ms: percentile(&latencies, 99.0),
        min_ms: latencies[0],
        max_ms: latencies[iterations - 1],
        success_rate: successes as f64 / iterations as f64,
        memory_delta_bytes,
    }
}

/// Nearest-rank percentile over a sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_known_values() {
        let sorted: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 100.0), 100.0);
        assert_eq!(percentile(&sorted, 50.0), 51.0);
        assert_eq!(percentile(&sorted, 95.0), 95.0);
    }

    #[test]
    fn test_summarize_basic() {
        let result = summarize(vec![1.0, 2.0, 3.0, 4.0], 3, 32);
        assert_eq!(result.iterations, 4);
        assert!((result.mean_ms - 2.5).abs() < 1e-9);
        assert_eq!(result.min_ms, 1.0);
        assert_eq!(result.max_ms, 4.0);
        assert_eq!(result.success_rate, 0.75);
        assert_eq!(result.memory_delta_bytes, 32);
    }

    #[test]
    fn test_benchmark_valid_config_succeeds() {
        let bench = TransformBenchmark::new(2.0);
        let result = bench.benchmark_transformation(
            Size::new(640.0, 480.0),
            Size::new(1080.0, 1920.0),
            90.0,
            FitMode::CenterCrop,
            20,
        );
        assert_eq!(result.iterations, 20);
        assert_eq!(result.success_rate, 1.0);
        assert!(result.min_ms <= result.p95_ms);
        assert!(result.p95_ms <= result.max_ms);
    }

    #[test]
    fn test_benchmark_degenerate_config_fails_without_panicking() {
        let bench = TransformBenchmark::new(2.0);
        let result = bench.benchmark_transformation(
            Size::new(640.0, 480.0),
            Size::new(0.0, 0.0),
            0.0,
            FitMode::Fill,
            10,
        );
        assert_eq!(result.success_rate, 0.0);
    }

    #[test]
    fn test_accuracy_matrix_passes() {
        let bench = TransformBenchmark::new(2.0);
        let report = bench.test_accuracy(Size::new(640.0, 480.0), Size::new(1080.0, 1920.0), 5);
        assert_eq!(report.results.len(), 12);
        assert!(report.all_passed, "overall={}", report.overall_accuracy);
        assert!(report.overall_accuracy > 0.99);
    }

    #[test]
    fn test_cancel_stops_benchmark() {
        let bench = TransformBenchmark::new(2.0);
        bench.cancel_flag().store(true, Ordering::Relaxed);
        let result = bench.benchmark_transformation(
            Size::new(640.0, 480.0),
            Size::new(1080.0, 1920.0),
            0.0,
            FitMode::Fill,
            1000,
        );
        assert_eq!(result.iterations, 0);
        let suite = bench.run_full_suite(10, 3);
        assert!(suite.interrupted);
        assert!(suite.benchmarks.is_empty());
    }

    #[test]
    fn test_full_suite_scores_in_range() {
        let bench = TransformBenchmark::new(2.0);
        let suite = bench.run_full_suite(5, 3);
        assert!(!suite.interrupted);
        // 3解像度 × 4回転 × 3モード
        assert_eq!(suite.benchmarks.len(), 36);
        assert_eq!(suite.accuracy_reports.len(), 3);
        assert!(suite.performance_score >= 0.0 && suite.performance_score <= 1.0);
        assert!(suite.accuracy_score >= 0.0 && suite.accuracy_score <= 1.0);
        assert!(suite.accuracy_score > 0.99);
    }
}
