use crate::transform::affine::Affine2;
use crate::transform::fit::{self, FitMode, Region, ScaleOffset, Size};
use crate::transform::rotation::{normalize_angle, rotation_about_center};

const ANGLE_EPS: f32 = 1e-3;

/// マッパーのキャッシュ済み変換状態
///
/// フィールドは構築後に変更しない。設定が変わるたびに丸ごと計算し直し、
/// Arcの差し替えで公開する。読み手は古い状態か新しい状態のどちらかを
/// 完全な形で観測する。
#[derive(Debug, Clone, PartialEq)]
pub struct MapperState {
    pub view: Size,
    pub image: Size,
    pub fit_mode: FitMode,
    /// 実効回転（度、[0,360)に正規化済み）
    pub rotation: f32,
    pub front_facing: bool,
    pub scale: ScaleOffset,
    pub rotation_matrix: Affine2,
    pub rotation_inverse: Affine2,
    /// ビューに表示されるソース領域（正規化座標）
    pub visible: Region,
    /// 回転行列が特異で単位行列にフォールバックしたか
    pub inversion_fallback: bool,
    pub is_valid: bool,
}

impl MapperState {
    /// 無効状態。変換は恒等（クランプのみ）として振る舞う。
    pub fn invalid(
        view: Size,
        image: Size,
        fit_mode: FitMode,
        rotation: f32,
        front_facing: bool,
    ) -> Self {
        Self {
            view,
            image,
            fit_mode,
            rotation: normalize_angle(rotation),
            front_facing,
            scale: ScaleOffset {
                scale_x: 1.0,
                scale_y: 1.0,
                offset_x: 0.0,
                offset_y: 0.0,
            },
            rotation_matrix: Affine2::identity(),
            rotation_inverse: Affine2::identity(),
            visible: Region::full(),
            inversion_fallback: false,
            is_valid: false,
        }
    }

    /// 入力一式から状態を計算する
    pub fn compute(
        view: Size,
        image: Size,
        fit_mode: FitMode,
        rotation_deg: f32,
        front_facing: bool,
    ) -> Self {
        let rotation = normalize_angle(rotation_deg);
        if !view.is_valid() || !image.is_valid() {
            return Self::invalid(view, image, fit_mode, rotation, front_facing);
        }
        let Some(scale) = fit::resolve(view, image, fit_mode) else {
            return Self::invalid(view, image, fit_mode, rotation, front_facing);
        };
        if !(scale.scale_x > 0.0 && scale.scale_y > 0.0)
            || !scale.scale_x.is_finite()
            || !scale.scale_y.is_finite()
        {
            return Self::invalid(view, image, fit_mode, rotation, front_facing);
        }

        let has_rotation = rotation > ANGLE_EPS && 360.0 - rotation > ANGLE_EPS;
        let (rotation_matrix, rotation_inverse, inversion_fallback) = if has_rotation {
            let m = rotation_about_center(rotation, view);
            match m.invert() {
                Some(inv) => (m, inv, false),
                None => (Affine2::identity(), Affine2::identity(), true),
            }
        } else {
            (Affine2::identity(), Affine2::identity(), false)
        };

        let visible = if has_rotation && !inversion_fallback {
            Self::visible_from_corners(view, image, &scale, &rotation_inverse)
        } else {
            fit::visible_source_region(view, image, fit_mode).unwrap_or_else(Region::full)
        };

        Self {
            view,
            image,
            fit_mode,
            rotation,
            front_facing,
            scale,
            rotation_matrix,
            rotation_inverse,
            visible,
            inversion_fallback,
            is_valid: true,
        }
    }

    /// ビューの四隅を逆変換して可視領域のバウンディングボックスを求める
    fn visible_from_corners(
        view: Size,
        image: Size,
        scale: &ScaleOffset,
        rotation_inverse: &Affine2,
    ) -> Region {
        let corners = [
            (0.0, 0.0),
            (view.width, 0.0),
            (0.0, view.height),
            (view.width, view.height),
        ];
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for &(px, py) in &corners {
            let (ux, uy) = rotation_inverse.apply(px, py);
            let x = (ux - scale.offset_x) / scale.scale_x / image.width;
            let y = (uy - scale.offset_y) / scale.scale_y / image.height;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let x0 = min_x.clamp(0.0, 1.0);
        let y0 = min_y.clamp(0.0, 1.0);
        let x1 = max_x.clamp(0.0, 1.0);
        let y1 = max_y.clamp(0.0, 1.0);
        Region {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    pub fn has_rotation(&self) -> bool {
        self.rotation > ANGLE_EPS && 360.0 - self.rotation > ANGLE_EPS
    }

    /// 正規化座標 → ビューピクセル（クランプなし）
    ///
    /// 入力は[0,1]にクランプ済みであること。
    pub fn forward(&self, x: f32, y: f32) -> (f32, f32) {
        let x = if self.front_facing { 1.0 - x } else { x };
        let px = self.scale.offset_x + self.scale.scale_x * (x * self.image.width);
        let py = self.scale.offset_y + self.scale.scale_y * (y * self.image.height);
        if self.has_rotation() {
            self.rotation_matrix.apply(px, py)
        } else {
            (px, py)
        }
    }

    /// ビューピクセル → 正規化座標（[0,1]にクランプ）
    ///
    /// forwardの代数的逆変換。ミラーも元に戻す。
    pub fn inverse(&self, px: f32, py: f32) -> (f32, f32) {
        let (px, py) = if self.has_rotation() {
            self.rotation_inverse.apply(px, py)
        } else {
            (px, py)
        };
        let x = (px - self.scale.offset_x) / self.scale.scale_x / self.image.width;
        let y = (py - self.scale.offset_y) / self.scale.scale_y / self.image.height;
        let x = if self.front_facing { 1.0 - x } else { x };
        (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0))
    }

    /// ビュー境界へのクランプ
    pub fn clamp_to_view(&self, px: f32, py: f32) -> (f32, f32) {
        (
            px.clamp(0.0, self.view.width),
            py.clamp(0.0, self.view.height),
        )
    }
}
