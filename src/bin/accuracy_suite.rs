use anyhow::Result;

use pose_overlay::config::Config;
use pose_overlay::perf::TransformBenchmark;
use pose_overlay::transform::Size;

const CONFIG_PATH: &str = "pose-overlay.toml";

fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);

    println!("Pose Overlay - Accuracy Suite ({})", env!("GIT_VERSION"));
    println!(
        "Tolerance: {:.1}px | Grid density: {}",
        config.validation.tolerance_px, config.validation.sample_density
    );
    println!();

    let bench = TransformBenchmark::new(config.validation.tolerance_px);
    let target = Size::new(1080.0, 1920.0);
    let sources = [
        Size::new(640.0, 480.0),
        Size::new(1280.0, 720.0),
        Size::new(1920.0, 1080.0),
    ];

    let mut all_passed = true;
    for source in sources {
        let report = bench.test_accuracy(source, target, config.validation.sample_density);
        println!(
            "{}x{} -> {}x{}  (overall {:.4})",
            source.width, source.height, target.width, target.height, report.overall_accuracy
        );
        for r in &report.results {
            println!(
                "  rot={:<3} {:<13} max {:.5}px  mean {:.5}px  ratio {:.1}%  {}",
                r.rotation,
                r.fit_mode.label(),
                r.max_error,
                r.mean_error,
                r.accuracy_ratio * 100.0,
                if r.passed { "PASS" } else { "FAIL" }
            );
        }
        println!();
        all_passed &= report.all_passed;
    }

    if !all_passed {
        anyhow::bail!("accuracy suite failed");
    }
    println!("All combinations passed");
    Ok(())
}
