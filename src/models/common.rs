use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

/// ミリ秒単位の時刻（コントローラの仮想時計）
pub type Millis = u64;

/// プレイヤー名
pub type PlayerId = String;

/// 3次元ベクトル（位置・速度の両方に使用）
///
/// ワールド座標系はyが鉛直上向き、xz平面が水平面です。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64, // 高さ
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// xz平面（水平面）での距離を計算
    pub fn distance_xz(&self, other: &Vec3) -> f64 {
        ((self.x - other.x).powi(2) + (self.z - other.z).powi(2)).sqrt()
    }

    /// 3次元距離を計算
    pub fn distance(&self, other: &Vec3) -> f64 {
        (*self - *other).magnitude()
    }

    /// ベクトルの長さ
    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }

    /// y成分のみ差し替えたベクトル
    pub fn with_y(&self, y: f64) -> Self {
        Self::new(self.x, y, self.z)
    }

    /// ブロック座標（各成分を切り捨て）
    pub fn floored(&self) -> (i64, i64, i64) {
        (self.x.floor() as i64, self.y.floor() as i64, self.z.floor() as i64)
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;

    fn div(self, scalar: f64) -> Self::Output {
        Self::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
}

/// ミリ秒を秒に変換
pub fn millis_to_secs(ms: Millis) -> f64 {
    ms as f64 / 1000.0
}
