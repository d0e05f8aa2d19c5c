use nalgebra::{Matrix3, Vector3};

/// 2D同次アフィン変換（3x3行列）
///
/// 座標は列ベクトル [x, y, 1]^T として右から掛ける。
/// 合成は行列積: (a * b).apply(p) == a.apply(b.apply(p))
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2 {
    m: Matrix3<f32>,
}

impl Affine2 {
    /// 単位変換
    pub fn identity() -> Self {
        Self {
            m: Matrix3::identity(),
        }
    }

    pub fn from_matrix(m: Matrix3<f32>) -> Self {
        Self { m }
    }

    /// 平行移動
    pub fn translation(tx: f32, ty: f32) -> Self {
        Self {
            m: Matrix3::new(1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0),
        }
    }

    /// 軸ごとのスケール
    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            m: Matrix3::new(sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0),
        }
    }

    /// 原点まわりの回転（度）
    pub fn rotation_deg(deg: f32) -> Self {
        let (s, c) = deg.to_radians().sin_cos();
        Self {
            m: Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0),
        }
    }

    /// X軸の反転（水平ミラー）
    pub fn mirror_horizontal() -> Self {
        Self::scale(-1.0, 1.0)
    }

    /// Y軸の反転（垂直ミラー）
    pub fn mirror_vertical() -> Self {
        Self::scale(1.0, -1.0)
    }

    /// 1点に適用
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let v = self.m * Vector3::new(x, y, 1.0);
        (v.x, v.y)
    }

    /// フラットなxy交互配列に適用
    ///
    /// 行列成分を取り出し、要素ごとの行列積を作らずループ内で直接計算する。
    pub fn apply_flat(&self, points: &[f32]) -> Vec<f32> {
        let a = self.m[(0, 0)];
        let b = self.m[(0, 1)];
        let tx = self.m[(0, 2)];
        let c = self.m[(1, 0)];
        let d = self.m[(1, 1)];
        let ty = self.m[(1, 2)];

        let mut out = Vec::with_capacity(points.len());
        for chunk in points.chunks_exact(2) {
            let (x, y) = (chunk[0], chunk[1]);
            out.push(a * x + b * y + tx);
            out.push(c * x + d * y + ty);
        }
        out
    }

    /// 逆変換。特異行列（行列式がほぼ0）ならNone
    pub fn invert(&self) -> Option<Self> {
        if self.m.determinant().abs() < 1e-8 {
            return None;
        }
        self.m.try_inverse().map(|m| Self { m })
    }

    pub fn determinant(&self) -> f32 {
        self.m.determinant()
    }

    /// 全成分が有限か
    pub fn is_finite(&self) -> bool {
        self.m.iter().all(|v| v.is_finite())
    }

    pub fn matrix(&self) -> &Matrix3<f32> {
        &self.m
    }
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Affine2 {
    type Output = Affine2;

    fn mul(self, rhs: Affine2) -> Affine2 {
        Affine2 { m: self.m * rhs.m }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_identity_apply() {
        let m = Affine2::identity();
        assert_eq!(m.apply(3.0, 4.0), (3.0, 4.0));
    }

    #[test]
    fn test_translation() {
        let m = Affine2::translation(10.0, -5.0);
        assert_eq!(m.apply(1.0, 2.0), (11.0, -3.0));
    }

    #[test]
    fn test_scale() {
        let m = Affine2::scale(2.0, 3.0);
        assert_eq!(m.apply(4.0, 5.0), (8.0, 15.0));
    }

    #[test]
    fn test_rotation_90() {
        let m = Affine2::rotation_deg(90.0);
        let (x, y) = m.apply(1.0, 0.0);
        // (1,0) -> (0,1)
        assert!(approx_eq(x, 0.0, 1e-6));
        assert!(approx_eq(y, 1.0, 1e-6));
    }

    #[test]
    fn test_mirror_horizontal() {
        let m = Affine2::mirror_horizontal();
        assert_eq!(m.apply(2.0, 3.0), (-2.0, 3.0));
    }

    #[test]
    fn test_compose_order() {
        // (a * b).apply(p) == a.apply(b.apply(p))
        let a = Affine2::translation(5.0, 0.0);
        let b = Affine2::scale(2.0, 2.0);
        let composed = a * b;
        let (x1, y1) = composed.apply(3.0, 4.0);
        let (bx, by) = b.apply(3.0, 4.0);
        let (x2, y2) = a.apply(bx, by);
        assert!(approx_eq(x1, x2, 1e-6));
        assert!(approx_eq(y1, y2, 1e-6));
        // スケール → 平行移動の順
        assert_eq!((x1, y1), (11.0, 8.0));
    }

    #[test]
    fn test_invert_round_trip() {
        let m = Affine2::translation(100.0, 50.0)
            * Affine2::rotation_deg(90.0)
            * Affine2::scale(2.0, 4.0);
        let inv = m.invert().unwrap();
        let (px, py) = m.apply(7.0, 11.0);
        let (x, y) = inv.apply(px, py);
        assert!(approx_eq(x, 7.0, 1e-4));
        assert!(approx_eq(y, 11.0, 1e-4));
    }

    #[test]
    fn test_invert_singular() {
        // スケール0は逆変換を持たない
        let m = Affine2::scale(0.0, 1.0);
        assert!(m.invert().is_none());
    }

    #[test]
    fn test_apply_flat_matches_scalar() {
        let m = Affine2::translation(3.0, -2.0) * Affine2::rotation_deg(45.0);
        let points = [0.0, 0.0, 1.0, 2.0, -3.5, 4.25, 100.0, 200.0];
        let out = m.apply_flat(&points);
        assert_eq!(out.len(), points.len());
        for i in 0..points.len() / 2 {
            let (x, y) = m.apply(points[2 * i], points[2 * i + 1]);
            assert!(approx_eq(out[2 * i], x, 1e-5));
            assert!(approx_eq(out[2 * i + 1], y, 1e-5));
        }
    }

    #[test]
    fn test_is_finite() {
        assert!(Affine2::identity().is_finite());
        let bad = Affine2::scale(f32::NAN, 1.0);
        assert!(!bad.is_finite());
    }
}
