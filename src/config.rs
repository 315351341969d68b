use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::models::{NavigateOptions, Vec3};

/// プロファイルメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfileMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

impl Default for ProfileMeta {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            name: "archerbot".to_string(),
            description: "Bow duelist".to_string(),
        }
    }
}

/// 戦闘ループ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CombatConfig {
    /// 相手を周回する半径
    pub firing_radius: f64,
    pub min_move_interval_ms: u64,
    pub max_move_interval_ms: u64,
    pub min_shoot_interval_ms: u64,
    pub max_shoot_interval_ms: u64,
    /// 弓を引いている時間
    pub draw_duration_ms: u64,
    /// 照準の再計算周期
    pub aim_tick_ms: u64,
    /// 見越し照準の時間[s]
    pub lead_horizon_s: f64,
    /// 速度推定で無視する最小経過時間[s]
    pub velocity_epsilon_s: f64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            firing_radius: 20.0,
            min_move_interval_ms: 5_000,
            max_move_interval_ms: 10_000,
            min_shoot_interval_ms: 100,
            max_shoot_interval_ms: 6_000,
            draw_duration_ms: 1_500,
            aim_tick_ms: 20,
            lead_horizon_s: 0.5,
            velocity_epsilon_s: 0.001,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct NavigationProfile {
    pub end_radius: f64,
    pub timeout_ms: u64,
}

impl From<NavigationProfile> for NavigateOptions {
    fn from(profile: NavigationProfile) -> Self {
        NavigateOptions {
            end_radius: profile.end_radius,
            timeout_ms: profile.timeout_ms,
        }
    }
}

/// ナビゲーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// 戦闘中の再配置
    pub combat: NavigationProfile,
    /// スポーン地点への退避
    pub spawn: NavigationProfile,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            combat: NavigationProfile {
                end_radius: 2.0,
                timeout_ms: 3_000,
            },
            spawn: NavigationProfile {
                end_radius: 50.0,
                timeout_ms: 2_000,
            },
        }
    }
}

/// 世界設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorldConfig {
    pub max_height: i64,
    pub min_height: i64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_height: 255,
            min_height: 0,
        }
    }
}

/// 装備設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EquipmentConfig {
    pub weapon_item: u32,
    pub ammo_item: u32,
    pub min_ammo: u32,
}

impl Default for EquipmentConfig {
    fn default() -> Self {
        Self {
            weapon_item: 261,
            ammo_item: 262,
            min_ammo: 30,
        }
    }
}

/// アナウンス設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnnounceConfig {
    /// 同一文言の再送を抑止する期間
    pub interval_ms: u64,
    /// 状態確認の周期
    pub status_check_interval_ms: u64,
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10 * 60 * 1000,
            status_check_interval_ms: 5_000,
        }
    }
}

/// オフラインアリーナのスクリプト設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DemoConfig {
    pub dt_ms: u64,
    pub duration_s: f64,
    /// 地面の高さ（この高さ以下が固体）
    pub ground_level: i64,
    pub spawn_point: Vec3,
    pub walk_speed: f64,
    pub opponent: String,
    pub challenge_at_s: f64,
    pub opponent_center: Vec3,
    pub opponent_orbit_radius: f64,
    /// 相手の角速度[rad/s]
    pub opponent_angular_speed: f64,
    pub opponent_leaves_at_s: Option<f64>,
    pub self_dies_at_s: Option<f64>,
    /// 運営者が決闘を強制終了する時刻
    pub end_challenge_at_s: Option<f64>,
    /// ささやきを送ってくる通りすがりのプレイヤー
    pub whisperer: String,
    pub whisper_at_s: Option<f64>,
    /// 地面が無い正方形の穴（中心x, 中心z, 半辺長）
    pub pit: Option<[f64; 3]>,
    pub bows: u32,
    pub arrows: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            dt_ms: 50,
            duration_s: 60.0,
            ground_level: 63,
            spawn_point: Vec3::new(0.0, 64.0, 0.0),
            walk_speed: 4.3,
            opponent: "bob".to_string(),
            challenge_at_s: 3.0,
            opponent_center: Vec3::new(10.0, 64.0, 10.0),
            opponent_orbit_radius: 6.0,
            opponent_angular_speed: 0.4,
            opponent_leaves_at_s: Some(45.0),
            self_dies_at_s: None,
            end_challenge_at_s: None,
            whisperer: "eve".to_string(),
            whisper_at_s: Some(5.0),
            pit: None,
            bows: 1,
            arrows: 64,
        }
    }
}

/// 完全なエージェント設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    pub meta: ProfileMeta,
    pub username: String,
    pub seed: u64,
    pub combat: CombatConfig,
    pub navigation: NavigationConfig,
    pub world: WorldConfig,
    pub equipment: EquipmentConfig,
    pub announce: AnnounceConfig,
    pub demo: DemoConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            meta: ProfileMeta::default(),
            username: "archerbot".to_string(),
            seed: 0,
            combat: CombatConfig::default(),
            navigation: NavigationConfig::default(),
            world: WorldConfig::default(),
            equipment: EquipmentConfig::default(),
            announce: AnnounceConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl AgentConfig {
    /// YAMLファイルから設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;

        let config = Self::from_yaml_str(&contents)
            .map_err(|e| match e {
                ConfigError::ParseError(_, err) => ConfigError::ParseError(path.to_path_buf(), err),
                other => other,
            })?;

        Ok(config)
    }

    /// YAML文字列から設定を読み込み
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = serde_yaml::from_str(contents)
            .map_err(|e| ConfigError::ParseError(Default::default(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.username.is_empty() {
            return Err(ConfigError::ValidationError("username must not be empty".to_string()));
        }
        let combat = &self.combat;
        if combat.firing_radius <= 0.0 {
            return Err(ConfigError::ValidationError("firing_radius must be positive".to_string()));
        }
        if combat.min_move_interval_ms > combat.max_move_interval_ms {
            return Err(ConfigError::ValidationError(
                "min_move_interval_ms must not exceed max_move_interval_ms".to_string(),
            ));
        }
        if combat.min_shoot_interval_ms > combat.max_shoot_interval_ms {
            return Err(ConfigError::ValidationError(
                "min_shoot_interval_ms must not exceed max_shoot_interval_ms".to_string(),
            ));
        }
        if combat.draw_duration_ms == 0 || combat.aim_tick_ms == 0 {
            return Err(ConfigError::ValidationError(
                "draw_duration_ms and aim_tick_ms must be positive".to_string(),
            ));
        }
        if self.world.max_height <= self.world.min_height {
            return Err(ConfigError::ValidationError("Invalid world height range".to_string()));
        }
        if self.announce.interval_ms == 0 || self.announce.status_check_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "announce intervals must be positive".to_string(),
            ));
        }
        if self.demo.dt_ms == 0 || self.demo.duration_s <= 0.0 {
            return Err(ConfigError::ValidationError(
                "demo dt_ms and duration_s must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// 設定の概要を表示
    pub fn print_summary(&self) {
        println!("=== プロファイル情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!("ユーザー名: {}", self.username);
        println!("シード値: {}", self.seed);
        println!();

        println!("=== 戦闘設定 ===");
        println!("周回半径: {:.1}", self.combat.firing_radius);
        println!(
            "移動間隔: {}〜{}ms",
            self.combat.min_move_interval_ms, self.combat.max_move_interval_ms
        );
        println!(
            "射撃間隔: {}〜{}ms",
            self.combat.min_shoot_interval_ms, self.combat.max_shoot_interval_ms
        );
        println!("引き絞り時間: {}ms (照準周期 {}ms)", self.combat.draw_duration_ms, self.combat.aim_tick_ms);
        println!("見越し時間: {:.2}秒", self.combat.lead_horizon_s);
        println!();

        println!("=== 装備 ===");
        println!(
            "武器ID: {} / 矢ID: {} (必要数 {}本)",
            self.equipment.weapon_item, self.equipment.ammo_item, self.equipment.min_ammo
        );
        println!();

        println!("=== デモアリーナ ===");
        println!("相手: {} ({:.1}秒に申し込み)", self.demo.opponent, self.demo.challenge_at_s);
        if let Some(at) = self.demo.end_challenge_at_s {
            println!("強制終了: {:.1}秒", at);
        }
        println!("実行時間: {:.1}秒 (刻み {}ms)", self.demo.duration_s, self.demo.dt_ms);
    }
}

/// 設定読み込みエラー
#[derive(Debug)]
pub enum ConfigError {
    FileNotFound(std::path::PathBuf),
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(std::path::PathBuf, serde_yaml::Error),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "設定ファイルが見つかりません: {}", path.display())
            }
            ConfigError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            ConfigError::ParseError(path, err) => {
                write!(f, "YAML解析エラー {}: {}", path.display(), err)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "設定検証エラー: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = AgentConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.username, "archerbot");
        assert_eq!(config.combat.firing_radius, 20.0);
        assert_eq!(config.equipment.min_ammo, 30);
        assert_eq!(config.announce.interval_ms, 600_000);
        assert_eq!(config.world.max_height, 255);
    }

    #[test]
    fn test_partial_section_overrides() {
        let yaml = "
username: robin
combat:
  firing_radius: 12.5
  max_shoot_interval_ms: 3000
";
        let config = AgentConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.username, "robin");
        assert_eq!(config.combat.firing_radius, 12.5);
        assert_eq!(config.combat.max_shoot_interval_ms, 3000);
        assert_eq!(config.combat.min_shoot_interval_ms, 100);
    }

    #[test]
    fn test_inverted_interval_is_rejected() {
        let yaml = "
combat:
  min_move_interval_ms: 9000
  max_move_interval_ms: 1000
";
        let err = AgentConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = AgentConfig::from_file("does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_bundled_profiles_load() {
        let demo = AgentConfig::from_yaml_str(include_str!("../scenarios/duel_demo.yaml")).unwrap();
        assert_eq!(demo.seed, 42);
        assert_eq!(demo.navigation.spawn.timeout_ms, 2_000);
        assert_eq!(demo.demo.pit, Some([25.0, 25.0, 6.0]));

        let last = AgentConfig::from_yaml_str(include_str!("../scenarios/last_stand.yaml")).unwrap();
        assert_eq!(last.demo.opponent_leaves_at_s, None);
        assert_eq!(last.demo.self_dies_at_s, Some(20.0));
        assert_eq!(last.combat.firing_radius, 20.0);
    }

    #[test]
    fn test_bad_yaml_is_parse_error() {
        let err = AgentConfig::from_yaml_str("combat: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_, _)));
    }
}
