pub mod benchmark;
pub mod monitor;

pub use benchmark::{
    AccuracyReport, AccuracyResult, BenchmarkResult, SuiteReport, TransformBenchmark,
    STANDARD_ROTATIONS,
};
pub use monitor::{ActiveAlerts, PerformanceMonitor, PerformanceSample, SAMPLE_CAPACITY};
