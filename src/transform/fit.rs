use serde::{Deserialize, Serialize};

/// 2Dサイズ（ピクセル）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn from_u32(width: u32, height: u32) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
        }
    }

    /// 幅・高さがともに正の有限値か
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}

/// アスペクト比の調整ポリシー
///
/// - Fill: 軸ごとに独立スケール（引き伸ばし）
/// - CenterCrop: 短辺を合わせてはみ出す側を切る
/// - CenterInside: 長辺を合わせてレターボックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    Fill,
    CenterCrop,
    CenterInside,
}

impl FitMode {
    pub const ALL: [FitMode; 3] = [FitMode::Fill, FitMode::CenterCrop, FitMode::CenterInside];

    pub fn label(&self) -> &'static str {
        match self {
            FitMode::Fill => "fill",
            FitMode::CenterCrop => "center_crop",
            FitMode::CenterInside => "center_inside",
        }
    }
}

/// ソースピクセル → ビューピクセルのスケールとオフセット
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleOffset {
    pub scale_x: f32,
    pub scale_y: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

/// 正規化矩形（0.0〜1.0）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Region {
    pub fn full() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.x <= 0.0 && self.y <= 0.0 && self.width >= 1.0 && self.height >= 1.0
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }
}

/// フィットモードに応じたスケール・オフセットを計算
///
/// - CenterCrop: scale = max(viewW/srcW, viewH/srcH)、はみ出す軸は負のオフセット
/// - CenterInside: scale = min(...)、オフセットは0以上（レターボックス）
/// - Fill: 軸ごとに独立スケール、オフセット0
///
/// どちらかのサイズが不正（0以下・非有限）ならNone。
pub fn resolve(view: Size, source: Size, mode: FitMode) -> Option<ScaleOffset> {
    if !view.is_valid() || !source.is_valid() {
        return None;
    }

    let rx = view.width / source.width;
    let ry = view.height / source.height;

    let so = match mode {
        FitMode::Fill => ScaleOffset {
            scale_x: rx,
            scale_y: ry,
            offset_x: 0.0,
            offset_y: 0.0,
        },
        FitMode::CenterCrop | FitMode::CenterInside => {
            let s = if mode == FitMode::CenterCrop {
                rx.max(ry)
            } else {
                rx.min(ry)
            };
            ScaleOffset {
                scale_x: s,
                scale_y: s,
                offset_x: (view.width - source.width * s) / 2.0,
                offset_y: (view.height - source.height * s) / 2.0,
            }
        }
    };
    Some(so)
}

/// ビューに実際に表示されるソース領域（正規化座標）
///
/// resolveのスケール・オフセットをビュー矩形へ逆適用し、[0,1]にクランプする。
pub fn visible_source_region(view: Size, source: Size, mode: FitMode) -> Option<Region> {
    let so = resolve(view, source, mode)?;

    let x0 = ((0.0 - so.offset_x) / so.scale_x / source.width).clamp(0.0, 1.0);
    let y0 = ((0.0 - so.offset_y) / so.scale_y / source.height).clamp(0.0, 1.0);
    let x1 = ((view.width - so.offset_x) / so.scale_x / source.width).clamp(0.0, 1.0);
    let y1 = ((view.height - so.offset_y) / so.scale_y / source.height).clamp(0.0, 1.0);

    Some(Region {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_fill_independent_axes() {
        let so = resolve(
            Size::new(1080.0, 1920.0),
            Size::new(640.0, 480.0),
            FitMode::Fill,
        )
        .unwrap();
        assert!(approx_eq(so.scale_x, 1080.0 / 640.0, 1e-6));
        assert!(approx_eq(so.scale_y, 1920.0 / 480.0, 1e-6));
        // アスペクト比が異なるのでスケールも異なる
        assert!(so.scale_x != so.scale_y);
        assert_eq!(so.offset_x, 0.0);
        assert_eq!(so.offset_y, 0.0);
    }

    #[test]
    fn test_center_crop_max_scale() {
        let so = resolve(
            Size::new(1080.0, 1920.0),
            Size::new(640.0, 480.0),
            FitMode::CenterCrop,
        )
        .unwrap();
        // max(1080/640, 1920/480) = 4.0
        assert!(approx_eq(so.scale_x, 4.0, 1e-6));
        assert!(approx_eq(so.scale_y, 4.0, 1e-6));
        // 横方向がはみ出す: (1080 - 640*4) / 2 = -740
        assert!(approx_eq(so.offset_x, -740.0, 1e-3));
        assert!(approx_eq(so.offset_y, 0.0, 1e-3));
    }

    #[test]
    fn test_center_inside_min_scale() {
        let so = resolve(
            Size::new(1080.0, 1920.0),
            Size::new(640.0, 480.0),
            FitMode::CenterInside,
        )
        .unwrap();
        // min(1080/640, 1920/480) = 1.6875
        assert!(approx_eq(so.scale_x, 1.6875, 1e-6));
        assert!(approx_eq(so.scale_y, 1.6875, 1e-6));
        // レターボックス: オフセットは0以上
        assert!(so.offset_x >= 0.0);
        assert!(so.offset_y >= 0.0);
        assert!(approx_eq(so.offset_y, (1920.0 - 480.0 * 1.6875) / 2.0, 1e-3));
    }

    #[test]
    fn test_resolve_degenerate_sizes() {
        let view = Size::new(1080.0, 1920.0);
        assert!(resolve(Size::new(0.0, 0.0), Size::new(640.0, 480.0), FitMode::Fill).is_none());
        assert!(resolve(view, Size::new(0.0, 480.0), FitMode::CenterCrop).is_none());
        assert!(resolve(view, Size::new(640.0, -1.0), FitMode::CenterInside).is_none());
        assert!(resolve(view, Size::new(f32::NAN, 480.0), FitMode::Fill).is_none());
    }

    #[test]
    fn test_resolve_idempotent() {
        let view = Size::new(1280.0, 720.0);
        let source = Size::new(1920.0, 1080.0);
        let a = resolve(view, source, FitMode::CenterCrop).unwrap();
        let b = resolve(view, source, FitMode::CenterCrop).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_visible_region_center_crop() {
        let region = visible_source_region(
            Size::new(1080.0, 1920.0),
            Size::new(640.0, 480.0),
            FitMode::CenterCrop,
        )
        .unwrap();
        // 横方向だけ切れる: x0 = 740/4/640
        assert!(approx_eq(region.x, 740.0 / 4.0 / 640.0, 1e-4));
        assert!(approx_eq(region.width, 1080.0 / 4.0 / 640.0, 1e-4));
        assert!(approx_eq(region.y, 0.0, 1e-4));
        assert!(approx_eq(region.height, 1.0, 1e-4));
        // 左右対称に切れる
        assert!(approx_eq(region.x, 1.0 - region.right(), 1e-4));
    }

    #[test]
    fn test_visible_region_full_for_inside_and_fill() {
        let view = Size::new(1080.0, 1920.0);
        let source = Size::new(640.0, 480.0);
        let inside = visible_source_region(view, source, FitMode::CenterInside).unwrap();
        assert!(inside.is_full());
        let fill = visible_source_region(view, source, FitMode::Fill).unwrap();
        assert!(fill.is_full());
    }

    #[test]
    fn test_region_contains() {
        let r = Region {
            x: 0.25,
            y: 0.0,
            width: 0.5,
            height: 1.0,
        };
        assert!(r.contains(0.5, 0.5));
        assert!(r.contains(0.25, 0.0));
        assert!(!r.contains(0.1, 0.5));
        assert!(!r.contains(0.8, 0.5));
    }
}
