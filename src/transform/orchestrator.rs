use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::affine::Affine2;
use super::fit::{self, FitMode, Region, Size};
use super::rotation::{self, normalize_angle};

/// 往復精度の合格に必要な割合
pub const MIN_ACCURACY_RATIO: f32 = 0.95;

/// ミラーリングの方針
///
/// Autoは前面カメラのときだけ水平反転する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorMode {
    None,
    Horizontal,
    Vertical,
    Auto,
}

impl MirrorMode {
    pub fn mirrors_horizontally(&self, front_facing: bool) -> bool {
        match self {
            MirrorMode::Horizontal => true,
            MirrorMode::Auto => front_facing,
            _ => false,
        }
    }

    pub fn mirrors_vertically(&self) -> bool {
        matches!(self, MirrorMode::Vertical)
    }
}

/// 変換の入力一式
///
/// ビューサイズ・ソースサイズ・回転・フィットモードのいずれかが
/// 変わったときに作り直す（フレームごとには作らない）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformConfig {
    pub source: Size,
    pub target: Size,
    /// センサー向き（度、通常は0/90/180/270）
    pub sensor_orientation: f32,
    /// ディスプレイ回転（度）
    pub display_rotation: f32,
    pub front_facing: bool,
    pub fit_mode: FitMode,
    pub mirror_mode: MirrorMode,
}

/// 計算済みの変換状態
///
/// フィールドは構築後に変更しない。入力が変わったら丸ごと作り直す。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformState {
    /// ソースピクセル → ビューピクセルの合成行列
    pub matrix: Affine2,
    pub rotation_degrees: f32,
    pub effective_rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub translate_x: f32,
    pub translate_y: f32,
    /// CenterCropのときだけ意味を持つ（実際に描画されるソース領域）
    pub crop_rect: Option<Region>,
    pub is_valid: bool,
}

impl TransformState {
    /// 単位行列の無効状態
    pub fn invalid() -> Self {
        Self {
            matrix: Affine2::identity(),
            rotation_degrees: 0.0,
            effective_rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
            crop_rect: None,
            is_valid: false,
        }
    }
}

/// 変換パイプラインで分類されるエラー
///
/// フレーム境界を越えて伝播させない。呼び出し側は無効状態へ
/// フォールバックし、発生をカウンタに記録する。
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum TransformError {
    #[error("invalid dimensions: view={view_w}x{view_h}, image={image_w}x{image_h}")]
    Configuration {
        view_w: f32,
        view_h: f32,
        image_w: f32,
        image_h: f32,
    },
    #[error("transform matrix is not invertible")]
    MatrixInversion,
    #[error("rotation {0} degrees is not a multiple of 90")]
    NonStandardRotation(f32),
}

/// センサー向きと表示回転から実効回転を求める
///
/// 前面: (sensor + display) % 360
/// 背面: (sensor − display + 360) % 360
pub fn effective_rotation(sensor_orientation: f32, display_rotation: f32, front_facing: bool) -> f32 {
    if front_facing {
        normalize_angle(sensor_orientation + display_rotation)
    } else {
        normalize_angle(sensor_orientation - display_rotation)
    }
}

/// 設定の事前検証
///
/// NonStandardRotationは一般回転でも処理できるため警告扱い。
pub fn check_config(config: &TransformConfig) -> Result<(), TransformError> {
    if !config.source.is_valid() || !config.target.is_valid() {
        return Err(TransformError::Configuration {
            view_w: config.target.width,
            view_h: config.target.height,
            image_w: config.source.width,
            image_h: config.source.height,
        });
    }
    let eff = effective_rotation(
        config.sensor_orientation,
        config.display_rotation,
        config.front_facing,
    );
    if !rotation::is_standard_rotation(eff) {
        return Err(TransformError::NonStandardRotation(eff));
    }
    Ok(())
}

/// TransformConfigからTransformStateを構築する
///
/// 合成順序: ソース中心を原点へ移動 → 実効回転 → ミラー → スケール
/// → ターゲット位置へ移動。ミラーをスケールの前に置くことで、
/// アスペクト比に関わらずミラー軸とスケール軸が揃う。
///
/// 内部で失敗した場合は単位行列の無効状態を返す（エラーは返さない）。
pub fn calculate_transformation(config: &TransformConfig) -> TransformState {
    if !config.source.is_valid() || !config.target.is_valid() {
        return TransformState::invalid();
    }
    let Some(so) = fit::resolve(config.target, config.source, config.fit_mode) else {
        return TransformState::invalid();
    };
    if !(so.scale_x > 0.0 && so.scale_y > 0.0)
        || !so.scale_x.is_finite()
        || !so.scale_y.is_finite()
    {
        return TransformState::invalid();
    }

    let eff = effective_rotation(
        config.sensor_orientation,
        config.display_rotation,
        config.front_facing,
    );

    let cx = config.source.width / 2.0;
    let cy = config.source.height / 2.0;
    let translate_x = so.offset_x + so.scale_x * cx;
    let translate_y = so.offset_y + so.scale_y * cy;

    let mut m = Affine2::translation(translate_x, translate_y) * Affine2::scale(so.scale_x, so.scale_y);
    if config.mirror_mode.mirrors_horizontally(config.front_facing) {
        m = m * Affine2::mirror_horizontal();
    }
    if config.mirror_mode.mirrors_vertically() {
        m = m * Affine2::mirror_vertical();
    }
    let m = m * Affine2::rotation_deg(eff) * Affine2::translation(-cx, -cy);

    if !m.is_finite() {
        return TransformState::invalid();
    }

    let crop_rect = match config.fit_mode {
        FitMode::CenterCrop => fit::visible_source_region(config.target, config.source, config.fit_mode),
        _ => None,
    };

    TransformState {
        matrix: m,
        rotation_degrees: normalize_angle(config.display_rotation),
        effective_rotation: eff,
        scale_x: so.scale_x,
        scale_y: so.scale_y,
        translate_x,
        translate_y,
        crop_rect,
        is_valid: true,
    }
}

/// 行列を1点に適用
pub fn transform_point(m: &Affine2, x: f32, y: f32) -> (f32, f32) {
    m.apply(x, y)
}

/// フラットなxy交互配列をまとめて変換
pub fn transform_points(m: &Affine2, points: &[f32]) -> Vec<f32> {
    m.apply_flat(points)
}

/// 逆行列。特異な場合は単位行列とfalseを返す
pub fn invert_matrix(m: &Affine2) -> (Affine2, bool) {
    match m.invert() {
        Some(inv) => (inv, true),
        None => (Affine2::identity(), false),
    }
}

/// 往復精度の検証結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundTripReport {
    pub max_error: f32,
    pub mean_error: f32,
    /// 許容値内に収まった点の割合
    pub accuracy_ratio: f32,
    pub passed: bool,
}

/// forward → inverseの往復誤差を測る
///
/// 合格条件: max_error ≤ tolerance かつ accuracy_ratio ≥ 0.95
pub fn validate_round_trip(
    forward: &Affine2,
    inverse: &Affine2,
    points: &[(f32, f32)],
    tolerance_px: f32,
) -> RoundTripReport {
    if points.is_empty() {
        return RoundTripReport {
            max_error: 0.0,
            mean_error: 0.0,
            accuracy_ratio: 1.0,
            passed: true,
        };
    }

    let mut max_error = 0.0f32;
    let mut sum = 0.0f64;
    let mut exceeded = 0usize;
    for &(x, y) in points {
        let (fx, fy) = forward.apply(x, y);
        let (bx, by) = inverse.apply(fx, fy);
        let err = ((bx - x) * (bx - x) + (by - y) * (by - y)).sqrt();
        if !err.is_finite() {
            exceeded += 1;
            max_error = f32::INFINITY;
            continue;
        }
        max_error = max_error.max(err);
        sum += err as f64;
        if err > tolerance_px {
            exceeded += 1;
        }
    }

    let accuracy_ratio = 1.0 - exceeded as f32 / points.len() as f32;
    RoundTripReport {
        max_error,
        mean_error: (sum / points.len() as f64) as f32,
        accuracy_ratio,
        passed: max_error <= tolerance_px && accuracy_ratio >= MIN_ACCURACY_RATIO,
    }
}

/// 検証・ベンチ共用の決定的なテスト点集合（ソースピクセル座標）
///
/// 四隅、中心、density×densityの内部格子。
pub fn generate_test_points(source: Size, density: usize) -> Vec<(f32, f32)> {
    let w = source.width;
    let h = source.height;
    let mut points = vec![
        (0.0, 0.0),
        (w, 0.0),
        (0.0, h),
        (w, h),
        (w / 2.0, h / 2.0),
    ];
    for iy in 0..density {
        for ix in 0..density {
            let fx = (ix as f32 + 1.0) / (density as f32 + 1.0);
            let fy = (iy as f32 + 1.0) / (density as f32 + 1.0);
            points.push((w * fx, h * fy));
        }
    }
    points
}
