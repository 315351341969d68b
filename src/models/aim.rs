use crate::models::common::Vec3;

/// 身長に対する照準高さの比率
const HEIGHT_FACTOR: f64 = 0.8;
/// 距離に応じた上方補正（矢の落下分の概算）
const DISTANCE_DROP_FACTOR: f64 = 0.05;

/// 見越し照準の予測器
///
/// 推定速度に固定の見越し時間（`lead_horizon_s`）を掛けて照準点を前方にずらします。
/// これは弾道を解いた迎撃解ではなく開ループの近似です。照準中は一定周期で
/// 再計算されるため、速度推定の更新に追従して自己修正されます。
#[derive(Debug, Clone, Copy)]
pub struct AimPredictor {
    /// 想定する矢の飛翔時間[s]（経験的に調整した定数）
    pub lead_horizon_s: f64,
}

impl AimPredictor {
    pub fn new(lead_horizon_s: f64) -> Self {
        Self { lead_horizon_s }
    }

    /// 照準点の計算
    ///
    /// # 引数
    ///
    /// * `target_pos` - 相手の足元位置
    /// * `target_height` - 相手の身長
    /// * `distance` - 自分から相手までの距離
    /// * `velocity` - 相手の推定速度[ブロック/秒]
    ///
    /// # 戻り値
    ///
    /// `target_pos + (0, 縦補正, 0) + velocity * lead_horizon_s`
    pub fn compute_aim_point(
        &self,
        target_pos: Vec3,
        target_height: f64,
        distance: f64,
        velocity: Vec3,
    ) -> Vec3 {
        let vertical_offset = target_height * HEIGHT_FACTOR + distance * DISTANCE_DROP_FACTOR;
        let lead_offset = velocity * self.lead_horizon_s;
        target_pos + Vec3::new(0.0, vertical_offset, 0.0) + lead_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_stationary_target_only_vertical_offset() {
        let predictor = AimPredictor::new(0.5);
        let aim = predictor.compute_aim_point(Vec3::new(10.0, 64.0, -3.0), 1.8, 20.0, Vec3::ZERO);
        assert_relative_eq!(aim.x, 10.0);
        assert_relative_eq!(aim.y, 64.0 + 1.8 * 0.8 + 20.0 * 0.05, epsilon = 1e-9);
        assert_relative_eq!(aim.z, -3.0);
    }

    #[test]
    fn test_moving_target_is_led() {
        let predictor = AimPredictor::new(0.5);
        let aim = predictor.compute_aim_point(Vec3::new(0.0, 64.0, 0.0), 2.0, 0.0, Vec3::new(4.0, 0.0, -2.0));
        assert_relative_eq!(aim.x, 2.0);
        assert_relative_eq!(aim.y, 65.6, epsilon = 1e-9);
        assert_relative_eq!(aim.z, -1.0);
    }
}
