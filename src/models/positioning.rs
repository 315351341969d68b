use std::f64::consts::TAU;

use rand::Rng;

use crate::models::{
    common::Vec3,
    traits::{IWorldQuery, NavigateOptions},
};

/// ナビゲーションに渡す移動意図（永続化しない一時値）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveIntent {
    pub destination: Vec3,
    pub end_radius: f64,
    pub timeout_ms: u64,
}

impl MoveIntent {
    pub fn options(&self) -> NavigateOptions {
        NavigateOptions {
            end_radius: self.end_radius,
            timeout_ms: self.timeout_ms,
        }
    }
}

/// 周回点の計算結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitPoint {
    pub position: Vec3,
    /// 足場となる固体ブロックが見つかったかどうか
    ///
    /// falseの場合、positionは床境界の1つ下（到達不能）です。
    pub grounded: bool,
}

/// 相手の周囲に移動先を決める配置プランナー
#[derive(Debug, Clone)]
pub struct PositioningPlanner {
    /// ワールドの天井（走査開始高さ）
    pub max_height: i64,
    /// ワールドの床（走査終了高さ）
    pub min_height: i64,
    /// 戦闘中の再配置に使うナビゲーション設定
    pub combat_navigation: NavigateOptions,
    /// スポーン地点への退避に使うナビゲーション設定
    pub spawn_navigation: NavigateOptions,
}

impl PositioningPlanner {
    /// 相手を中心とした半径`radius`の円周上のランダムな点を、地面まで下ろして返す
    ///
    /// 角度を[0, 2π)から一様に選び、天井から1ブロックずつ下へ走査して
    /// 最初の固体ブロック（バウンディングボックスが空でないもの）の高さを採用します。
    /// 床まで走査しても見つからない場合は再試行せず、床の1つ下の点を返します。
    /// その点への移動失敗はナビゲーション側の失敗通知に任せます。
    pub fn compute_orbit_point<W, R>(&self, world: &W, rng: &mut R, target_pos: Vec3, radius: f64) -> OrbitPoint
    where
        W: IWorldQuery + ?Sized,
        R: Rng,
    {
        let angle = rng.gen_range(0.0..TAU);
        let dx = radius * angle.cos();
        let dz = radius * angle.sin();

        let mut dest = Vec3::new(target_pos.x + dx, self.max_height as f64, target_pos.z + dz);
        let mut y = self.max_height;
        while y >= self.min_height {
            dest = dest.with_y(y as f64);
            if let Some(block) = world.block_at(dest) {
                if !block.is_empty {
                    return OrbitPoint {
                        position: dest,
                        grounded: true,
                    };
                }
            }
            y -= 1;
        }

        OrbitPoint {
            position: dest.with_y(y as f64),
            grounded: false,
        }
    }

    /// 戦闘中の再配置用の移動意図（狭い到着半径・短いタイムアウト）
    pub fn combat_intent(&self, destination: Vec3) -> MoveIntent {
        MoveIntent {
            destination,
            end_radius: self.combat_navigation.end_radius,
            timeout_ms: self.combat_navigation.timeout_ms,
        }
    }

    /// スポーン地点へ戻る移動意図
    ///
    /// 戦闘配置ではなくフォールバックなので、到着半径を広く、タイムアウトを短く取ります。
    pub fn spawn_intent(&self, spawn_point: Vec3) -> MoveIntent {
        MoveIntent {
            destination: spawn_point,
            end_radius: self.spawn_navigation.end_radius,
            timeout_ms: self.spawn_navigation.timeout_ms,
        }
    }
}
