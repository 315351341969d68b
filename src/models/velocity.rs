use crate::models::common::{millis_to_secs, Millis, Vec3};

/// 差分による速度推定器
///
/// 追尾中の相手の位置サンプルから、直前サンプルとの差分で速度を求めます。
/// 速度の単位はブロック/秒です。2つ以上の異なる時刻のサンプルが揃うまで
/// 推定値はゼロベクトルのままです。
#[derive(Debug, Clone)]
pub struct VelocityEstimator {
    /// 直前のサンプル（位置, 時刻）
    previous: Option<(Vec3, Millis)>,
    /// 現在の推定速度
    velocity: Vec3,
    /// 推定が有効かどうか
    valid: bool,
    /// これ以下の経過時間では速度を再計算しない[s]
    epsilon_s: f64,
}

impl VelocityEstimator {
    pub fn new(epsilon_s: f64) -> Self {
        Self {
            previous: None,
            velocity: Vec3::ZERO,
            valid: false,
            epsilon_s,
        }
    }

    /// 新しい位置サンプルを取り込む
    ///
    /// 経過時間がepsilon以下（同時刻・ほぼ重複したサンプル）の場合は
    /// 推定値を更新しませんが、サンプル自体は常に「直前」として保存します。
    pub fn update(&mut self, position: Vec3, timestamp: Millis) {
        if let Some((prev_pos, prev_time)) = self.previous {
            let dt = millis_to_secs(timestamp.saturating_sub(prev_time));
            if dt > self.epsilon_s {
                self.velocity = (position - prev_pos) / dt;
                self.valid = true;
            }
        }
        self.previous = Some((position, timestamp));
    }

    /// 追尾対象が変わったときのリセット
    pub fn reset(&mut self) {
        self.previous = None;
        self.velocity = Vec3::ZERO;
        self.valid = false;
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[cfg(test)]
    pub fn last_sample(&self) -> Option<(Vec3, Millis)> {
        self.previous
    }
}
