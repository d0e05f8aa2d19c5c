use anyhow::Result;
use std::time::Instant;

use pose_overlay::config::Config;
use pose_overlay::perf::{TransformBenchmark, STANDARD_ROTATIONS};
use pose_overlay::transform::{FitMode, Size};

const CONFIG_PATH: &str = "pose-overlay.toml";
const ITERATIONS: usize = 1000;

fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);

    println!("Pose Overlay - Transform Benchmark ({})", env!("GIT_VERSION"));
    println!(
        "Tolerance: {:.1}px | Grid density: {} | Iterations: {}",
        config.validation.tolerance_px, config.validation.sample_density, ITERATIONS
    );
    println!();

    let bench = TransformBenchmark::new(config.validation.tolerance_px);

    let source = Size::new(1920.0, 1080.0);
    let target = Size::new(1080.0, 1920.0);
    println!("Single-configuration matrix ({}x{} -> {}x{}):",
        source.width, source.height, target.width, target.height);
    for &rotation in &STANDARD_ROTATIONS {
        for fit_mode in FitMode::ALL {
            let result = bench.benchmark_transformation(source, target, rotation, fit_mode, ITERATIONS);
            println!(
                "  rot={:<3} {:<13} mean {:.4}ms  median {:.4}ms  p95 {:.4}ms  p99 {:.4}ms  success {:.1}%",
                rotation,
                fit_mode.label(),
                result.mean_ms,
                result.median_ms,
                result.p95_ms,
                result.p99_ms,
                result.success_rate * 100.0
            );
        }
    }
    println!();

    println!("Full suite...");
    let start = Instant::now();
    let suite = bench.run_full_suite(ITERATIONS, config.validation.sample_density);
    let elapsed = start.elapsed().as_secs_f64();

    println!("Finished in {:.1}s ({} benchmark runs)", elapsed, suite.benchmarks.len());
    println!("Performance score: {:.3}", suite.performance_score);
    println!("Accuracy score:    {:.3}", suite.accuracy_score);

    Ok(())
}
