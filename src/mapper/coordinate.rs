use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::landmark::Landmark;
use crate::transform::fit::{FitMode, Region, Size};
use crate::transform::rotation::is_standard_rotation;

use super::state::MapperState;

/// テレメトリの累積値
#[derive(Debug, Default, Clone, Copy)]
struct Telemetry {
    error_sum: f64,
    error_samples: u64,
    inversion_failures: u64,
    non_standard_rotations: u64,
}

/// 実行時メトリクスのスナップショット
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapperMetrics {
    pub transform_count: u64,
    /// 往復誤差の平均（ソースピクセル単位）
    pub average_round_trip_error: f32,
    pub inversion_failures: u64,
    pub non_standard_rotations: u64,
}

/// 正規化ランドマーク座標とビューピクセルを相互変換するホットパス
///
/// 状態は単一ライター・複数リーダー: 更新はArcを丸ごと差し替え、
/// 読み取り側はロックをArcのクローンだけに留めて変換はロック外で行う。
/// 変換関数は公開済み状態に対して純粋なので、複数スレッドから同時に
/// 呼び出せる。
pub struct CoordinateMapper {
    state: Mutex<Arc<MapperState>>,
    transform_count: AtomicU64,
    telemetry: Mutex<Telemetry>,
}

impl CoordinateMapper {
    pub fn new(
        view: Size,
        image: Size,
        fit_mode: FitMode,
        rotation_deg: f32,
        front_facing: bool,
    ) -> Self {
        let state = MapperState::compute(view, image, fit_mode, rotation_deg, front_facing);
        let mapper = Self {
            state: Mutex::new(Arc::new(MapperState::invalid(
                view,
                image,
                fit_mode,
                rotation_deg,
                front_facing,
            ))),
            transform_count: AtomicU64::new(0),
            telemetry: Mutex::new(Telemetry::default()),
        };
        mapper.publish(state);
        mapper
    }

    /// 現在の状態のスナップショットを取得
    pub fn snapshot(&self) -> Arc<MapperState> {
        self.state.lock().unwrap().clone()
    }

    /// 新しい状態を原子的に公開し、状態由来のカウンタを更新する
    fn publish(&self, next: MapperState) {
        let inversion_fallback = next.inversion_fallback;
        let non_standard = !is_standard_rotation(next.rotation);
        *self.state.lock().unwrap() = Arc::new(next);

        if inversion_fallback || non_standard {
            let mut t = self.telemetry.lock().unwrap();
            if inversion_fallback {
                t.inversion_failures += 1;
            }
            if non_standard {
                t.non_standard_rotations += 1;
            }
        }
    }

    fn rebuild(&self, f: impl FnOnce(&MapperState) -> MapperState) {
        let current = self.snapshot();
        self.publish(f(current.as_ref()));
    }

    pub fn update_view_dimensions(&self, view: Size) {
        self.rebuild(|s| {
            MapperState::compute(view, s.image, s.fit_mode, s.rotation, s.front_facing)
        });
    }

    pub fn update_image_dimensions(&self, image: Size) {
        self.rebuild(|s| {
            MapperState::compute(s.view, image, s.fit_mode, s.rotation, s.front_facing)
        });
    }

    pub fn update_aspect_ratio(&self, fit_mode: FitMode) {
        self.rebuild(|s| {
            MapperState::compute(s.view, s.image, fit_mode, s.rotation, s.front_facing)
        });
    }

    pub fn update_rotation(&self, rotation_deg: f32, front_facing: bool) {
        self.rebuild(|s| {
            MapperState::compute(s.view, s.image, s.fit_mode, rotation_deg, front_facing)
        });
    }

    /// 正規化座標をビューピクセルへ変換
    ///
    /// 入力を[0,1]へ、出力をビュー境界へクランプする。
    /// 状態が無効ならクランプした入力をそのまま返す。
    pub fn normalized_to_pixel(&self, x: f32, y: f32) -> (f32, f32) {
        let state = self.snapshot();
        self.transform_count.fetch_add(1, Ordering::Relaxed);
        let cx = x.clamp(0.0, 1.0);
        let cy = y.clamp(0.0, 1.0);
        if !state.is_valid {
            return (cx, cy);
        }
        let (px, py) = state.forward(cx, cy);
        let err = round_trip_error(&state, cx, cy, px, py);
        self.record_error(err);
        state.clamp_to_view(px, py)
    }

    /// ビューピクセルを正規化座標へ変換（forwardの逆、[0,1]クランプ）
    pub fn pixel_to_normalized(&self, px: f32, py: f32) -> (f32, f32) {
        let state = self.snapshot();
        self.transform_count.fetch_add(1, Ordering::Relaxed);
        if !state.is_valid {
            return (px.clamp(0.0, 1.0), py.clamp(0.0, 1.0));
        }
        state.inverse(px, py)
    }

    /// フラットなxy交互配列のバッチ変換
    ///
    /// 状態の取得は一度だけ。スケール・ミラーを配列全体へ適用してから
    /// 回転行列を一括適用する。結果は単一点変換の繰り返しと
    /// 浮動小数点イプシロンの範囲で一致する。
    pub fn batch_normalized_to_pixel(&self, points: &[f32]) -> Vec<f32> {
        let state = self.snapshot();
        let count = (points.len() / 2) as u64;
        self.transform_count.fetch_add(count, Ordering::Relaxed);

        let mut out = Vec::with_capacity(points.len());
        if !state.is_valid {
            for chunk in points.chunks_exact(2) {
                out.push(chunk[0].clamp(0.0, 1.0));
                out.push(chunk[1].clamp(0.0, 1.0));
            }
            return out;
        }

        // スケール・オフセット・ミラー
        let mut staged = Vec::with_capacity(points.len());
        let mut clamped = Vec::with_capacity(points.len());
        for chunk in points.chunks_exact(2) {
            let cx = chunk[0].clamp(0.0, 1.0);
            let cy = chunk[1].clamp(0.0, 1.0);
            clamped.push(cx);
            clamped.push(cy);
            let mx = if state.front_facing { 1.0 - cx } else { cx };
            staged.push(state.scale.offset_x + state.scale.scale_x * (mx * state.image.width));
            staged.push(state.scale.offset_y + state.scale.scale_y * (cy * state.image.height));
        }

        // 回転は配列全体へ一括適用
        let rotated = if state.has_rotation() {
            state.rotation_matrix.apply_flat(&staged)
        } else {
            staged
        };

        let mut error_sum = 0.0f64;
        let mut error_samples = 0u64;
        for (i, chunk) in rotated.chunks_exact(2).enumerate() {
            let err = round_trip_error(&state, clamped[2 * i], clamped[2 * i + 1], chunk[0], chunk[1]);
            if let Some(e) = err {
                error_sum += e as f64;
                error_samples += 1;
            }
            let (px, py) = state.clamp_to_view(chunk[0], chunk[1]);
            out.push(px);
            out.push(py);
        }

        if error_samples > 0 {
            let mut t = self.telemetry.lock().unwrap();
            t.error_sum += error_sum;
            t.error_samples += error_samples;
        }
        out
    }

    /// ランドマーク配列をビューピクセルへ投影
    pub fn project_landmarks(&self, landmarks: &[Landmark]) -> Vec<(f32, f32)> {
        let mut flat = Vec::with_capacity(landmarks.len() * 2);
        for lm in landmarks {
            flat.push(lm.x);
            flat.push(lm.y);
        }
        self.batch_normalized_to_pixel(&flat)
            .chunks_exact(2)
            .map(|c| (c[0], c[1]))
            .collect()
    }

    /// 正規化座標がビューに表示される領域内か
    pub fn is_point_visible(&self, x: f32, y: f32) -> bool {
        let state = self.snapshot();
        state.visible.contains(x.clamp(0.0, 1.0), y.clamp(0.0, 1.0))
    }

    /// ビューに表示されるソース領域（正規化座標）
    pub fn visible_region(&self) -> Region {
        self.snapshot().visible
    }

    /// 実行時メトリクス
    pub fn performance_metrics(&self) -> MapperMetrics {
        let t = *self.telemetry.lock().unwrap();
        let average = if t.error_samples > 0 {
            (t.error_sum / t.error_samples as f64) as f32
        } else {
            0.0
        };
        MapperMetrics {
            transform_count: self.transform_count.load(Ordering::Relaxed),
            average_round_trip_error: average,
            inversion_failures: t.inversion_failures,
            non_standard_rotations: t.non_standard_rotations,
        }
    }

    fn record_error(&self, err: Option<f32>) {
        if let Some(e) = err {
            let mut t = self.telemetry.lock().unwrap();
            t.error_sum += e as f64;
            t.error_samples += 1;
        }
    }
}

/// ピクセル結果から正規化座標を再導出して入力と比較する
///
/// クランプ前のピクセル値を使う（クランプはクロップで切れた点の
/// 誤差を往復誤差として数えてしまう）。誤差はソースピクセル単位。
fn round_trip_error(state: &MapperState, x: f32, y: f32, px: f32, py: f32) -> Option<f32> {
    let (bx, by) = state.inverse(px, py);
    let dx = (bx - x) * state.image.width;
    let dy = (by - y) * state.image.height;
    let err = (dx * dx + dy * dy).sqrt();
    err.is_finite().then_some(err)
}
