use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::transform::{FitMode, MirrorMode};

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverlayConfig {
    /// フィットモード (fill / center_crop / center_inside)
    #[serde(default = "default_fit_mode")]
    pub fit_mode: FitMode,
    /// ミラーモード (none / horizontal / vertical / auto)
    #[serde(default = "default_mirror_mode")]
    pub mirror_mode: MirrorMode,
    /// ランドマーク可視判定の信頼度閾値
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f32,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PerformanceConfig {
    /// アラート対象の最低FPS
    #[serde(default = "default_min_fps")]
    pub min_fps: f32,
    /// 変換1回あたりの許容時間（ミリ秒）
    #[serde(default = "default_max_transform_ms")]
    pub max_transform_ms: f64,
    /// メモリ使用量の上限（MB）
    #[serde(default = "default_max_memory_mb")]
    pub max_memory_mb: f64,
    /// 往復精度の下限
    #[serde(default = "default_min_accuracy")]
    pub min_accuracy: f32,
    /// アラート発火に必要な連続違反サンプル数
    #[serde(default = "default_consecutive_breaches")]
    pub consecutive_breaches: u32,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ValidationConfig {
    /// 往復誤差の許容値（ピクセル）
    #[serde(default = "default_tolerance_px")]
    pub tolerance_px: f32,
    /// テスト点格子の密度（density×density）
    #[serde(default = "default_sample_density")]
    pub sample_density: usize,
}

fn default_fit_mode() -> FitMode {
    FitMode::CenterCrop
}
fn default_mirror_mode() -> MirrorMode {
    MirrorMode::Auto
}
fn default_visibility_threshold() -> f32 {
    0.3
}
fn default_min_fps() -> f32 {
    24.0
}
fn default_max_transform_ms() -> f64 {
    5.0
}
fn default_max_memory_mb() -> f64 {
    256.0
}
fn default_min_accuracy() -> f32 {
    0.95
}
fn default_consecutive_breaches() -> u32 {
    5
}
fn default_tolerance_px() -> f32 {
    2.0
}
fn default_sample_density() -> usize {
    10
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            fit_mode: default_fit_mode(),
            mirror_mode: default_mirror_mode(),
            visibility_threshold: default_visibility_threshold(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            min_fps: default_min_fps(),
            max_transform_ms: default_max_transform_ms(),
            max_memory_mb: default_max_memory_mb(),
            min_accuracy: default_min_accuracy(),
            consecutive_breaches: default_consecutive_breaches(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            tolerance_px: default_tolerance_px(),
            sample_density: default_sample_density(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 読み込みに失敗した場合はデフォルト設定を返す
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.overlay.fit_mode, FitMode::CenterCrop);
        assert_eq!(config.overlay.mirror_mode, MirrorMode::Auto);
        assert_eq!(config.performance.consecutive_breaches, 5);
        assert_eq!(config.validation.tolerance_px, 2.0);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml = r#"
            [overlay]
            fit_mode = "center_inside"
            mirror_mode = "none"

            [validation]
            tolerance_px = 1.5
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.overlay.fit_mode, FitMode::CenterInside);
        assert_eq!(config.overlay.mirror_mode, MirrorMode::None);
        // 指定しなかった値はデフォルト
        assert_eq!(config.overlay.visibility_threshold, 0.3);
        assert_eq!(config.validation.tolerance_px, 1.5);
        assert_eq!(config.validation.sample_density, 10);
        assert_eq!(config.performance.min_fps, 24.0);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("nonexistent-pose-overlay.toml");
        assert_eq!(config.overlay.fit_mode, FitMode::CenterCrop);
    }
}
