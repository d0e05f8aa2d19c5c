use super::affine::Affine2;
use super::fit::Size;

/// 回転角の比較許容値（度）
const ANGLE_EPS: f32 = 1e-3;

/// 角度を [0, 360) に正規化
pub fn normalize_angle(deg: f32) -> f32 {
    let r = deg % 360.0;
    if r < 0.0 {
        r + 360.0
    } else {
        r
    }
}

/// 最短経路の回転差分（度、[-180, 180]）
///
/// 例: rotation_delta(0, 270) == -90
pub fn rotation_delta(from: f32, to: f32) -> f32 {
    let d = normalize_angle(to - from);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// センサー回転とデバイス回転から表示回転を求める
pub fn display_rotation(sensor_rotation: f32, device_rotation: f32) -> f32 {
    normalize_angle(sensor_rotation - device_rotation)
}

/// 90度の倍数か
pub fn is_standard_rotation(deg: f32) -> bool {
    let r = normalize_angle(deg) % 90.0;
    r < ANGLE_EPS || 90.0 - r < ANGLE_EPS
}

fn is_quarter_turn(normalized: f32) -> bool {
    (normalized - 90.0).abs() < ANGLE_EPS || (normalized - 270.0).abs() < ANGLE_EPS
}

/// ビュー中心まわりの回転行列を構築
///
/// 90度・270度では回転後のコンテンツのアスペクト比が入れ替わるため、
/// 回転前フレームの中心を原点へ移してから回転し、回転後フレーム
/// （幅と高さを入れ替えたもの）の中心へ戻す:
/// M = T(回転後中心) · R(θ) · T(−回転前中心)
pub fn rotation_about_center(deg: f32, view: Size) -> Affine2 {
    let a = normalize_angle(deg);
    let (post_w, post_h) = if is_quarter_turn(a) {
        (view.height, view.width)
    } else {
        (view.width, view.height)
    };
    Affine2::translation(post_w / 2.0, post_h / 2.0)
        * Affine2::rotation_deg(a)
        * Affine2::translation(-view.width / 2.0, -view.height / 2.0)
}

/// 回転変換のキャッシュ
///
/// 同じ角度・ビューサイズに対するset_rotationは再計算しない。
#[derive(Debug, Clone)]
pub struct RotationEngine {
    angle: f32,
    view: Size,
    matrix: Affine2,
    inverse: Affine2,
}

impl RotationEngine {
    pub fn new(view: Size) -> Self {
        Self {
            angle: 0.0,
            view,
            matrix: Affine2::identity(),
            inverse: Affine2::identity(),
        }
    }

    /// 角度を正規化して回転行列を構築・キャッシュする
    pub fn set_rotation(&mut self, angle_deg: f32, view: Size) {
        let angle = normalize_angle(angle_deg);
        if (angle - self.angle).abs() < ANGLE_EPS && view == self.view {
            return;
        }
        self.angle = angle;
        self.view = view;
        if angle < ANGLE_EPS || 360.0 - angle < ANGLE_EPS {
            self.matrix = Affine2::identity();
            self.inverse = Affine2::identity();
            return;
        }
        self.matrix = rotation_about_center(angle, view);
        // 回転と平行移動の合成は常に可逆
        self.inverse = self.matrix.invert().unwrap_or_else(Affine2::identity);
    }

    pub fn rotate_point(&self, x: f32, y: f32) -> (f32, f32) {
        self.matrix.apply(x, y)
    }

    /// フラットなxy交互配列をまとめて回転。単一点の繰り返しと同じ結果になる。
    pub fn rotate_points(&self, points: &[f32]) -> Vec<f32> {
        self.matrix.apply_flat(points)
    }

    pub fn unrotate_point(&self, x: f32, y: f32) -> (f32, f32) {
        self.inverse.apply(x, y)
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn matrix(&self) -> &Affine2 {
        &self.matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_normalize_angle() {
        assert_eq!(normalize_angle(0.0), 0.0);
        assert_eq!(normalize_angle(360.0), 0.0);
        assert_eq!(normalize_angle(-90.0), 270.0);
        assert_eq!(normalize_angle(450.0), 90.0);
        assert_eq!(normalize_angle(-720.0), 0.0);
    }

    #[test]
    fn test_rotation_delta() {
        assert_eq!(rotation_delta(0.0, 270.0), -90.0);
        assert_eq!(rotation_delta(10.0, 350.0), -20.0);
        assert_eq!(rotation_delta(350.0, 10.0), 20.0);
        assert_eq!(rotation_delta(0.0, 180.0), 180.0);
        assert_eq!(rotation_delta(90.0, 90.0), 0.0);
    }

    #[test]
    fn test_display_rotation() {
        assert_eq!(display_rotation(90.0, 0.0), 90.0);
        assert_eq!(display_rotation(90.0, 270.0), 180.0);
        assert_eq!(display_rotation(0.0, 90.0), 270.0);
    }

    #[test]
    fn test_is_standard_rotation() {
        assert!(is_standard_rotation(0.0));
        assert!(is_standard_rotation(90.0));
        assert!(is_standard_rotation(-90.0));
        assert!(is_standard_rotation(450.0));
        assert!(!is_standard_rotation(45.0));
        assert!(!is_standard_rotation(91.0));
    }

    #[test]
    fn test_rotation_about_center_square_view() {
        // 正方形なら単純なビュー中心回転と一致する
        let view = Size::new(100.0, 100.0);
        let m = rotation_about_center(90.0, view);
        let (x, y) = m.apply(50.0, 50.0);
        assert!(approx_eq(x, 50.0, 1e-4));
        assert!(approx_eq(y, 50.0, 1e-4));
        let (x, y) = m.apply(100.0, 50.0);
        assert!(approx_eq(x, 50.0, 1e-4));
        assert!(approx_eq(y, 100.0, 1e-4));
    }

    #[test]
    fn test_rotation_about_center_portrait_90() {
        // 1080x1920の中心は回転後フレーム(1920x1080)の中心へ移る
        let view = Size::new(1080.0, 1920.0);
        let m = rotation_about_center(90.0, view);
        let (x, y) = m.apply(540.0, 960.0);
        assert!(approx_eq(x, 960.0, 1e-3));
        assert!(approx_eq(y, 540.0, 1e-3));
    }

    #[test]
    fn test_rotation_about_center_180_keeps_center() {
        let view = Size::new(1080.0, 1920.0);
        let m = rotation_about_center(180.0, view);
        let (x, y) = m.apply(540.0, 960.0);
        assert!(approx_eq(x, 540.0, 1e-3));
        assert!(approx_eq(y, 960.0, 1e-3));
        // 中心以外は点対称
        let (x, y) = m.apply(0.0, 0.0);
        assert!(approx_eq(x, 1080.0, 1e-3));
        assert!(approx_eq(y, 1920.0, 1e-3));
    }

    #[test]
    fn test_rotation_round_trip() {
        let view = Size::new(1080.0, 1920.0);
        for angle in [90.0, 180.0, 270.0] {
            let m = rotation_about_center(angle, view);
            let inv = m.invert().unwrap();
            for &(x, y) in &[(0.0, 0.0), (540.0, 960.0), (1080.0, 1920.0), (123.0, 456.0)] {
                let (px, py) = m.apply(x, y);
                let (bx, by) = inv.apply(px, py);
                assert!(approx_eq(bx, x, 1e-2), "angle={} x={} got={}", angle, x, bx);
                assert!(approx_eq(by, y, 1e-2), "angle={} y={} got={}", angle, y, by);
            }
        }
    }

    #[test]
    fn test_engine_batch_matches_scalar() {
        let mut engine = RotationEngine::new(Size::new(640.0, 480.0));
        engine.set_rotation(270.0, Size::new(640.0, 480.0));
        let points = [0.0, 0.0, 320.0, 240.0, 640.0, 480.0, 17.0, 301.0];
        let batch = engine.rotate_points(&points);
        for i in 0..points.len() / 2 {
            let (x, y) = engine.rotate_point(points[2 * i], points[2 * i + 1]);
            assert!(approx_eq(batch[2 * i], x, 1e-5));
            assert!(approx_eq(batch[2 * i + 1], y, 1e-5));
        }
    }

    #[test]
    fn test_engine_zero_rotation_is_identity() {
        let mut engine = RotationEngine::new(Size::new(640.0, 480.0));
        engine.set_rotation(360.0, Size::new(640.0, 480.0));
        assert_eq!(engine.rotate_point(12.0, 34.0), (12.0, 34.0));
    }

    #[test]
    fn test_engine_unrotate_inverts() {
        let mut engine = RotationEngine::new(Size::new(1080.0, 1920.0));
        engine.set_rotation(90.0, Size::new(1080.0, 1920.0));
        let (px, py) = engine.rotate_point(100.0, 200.0);
        let (x, y) = engine.unrotate_point(px, py);
        assert!(approx_eq(x, 100.0, 1e-2));
        assert!(approx_eq(y, 200.0, 1e-2));
    }
}
