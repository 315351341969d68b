use std::collections::HashMap;

use tracing::{debug, info, trace};

use crate::config::AgentConfig;
use crate::models::{
    millis_to_secs, Block, BotEvent, Entity, EquipSlot, IActuation, ICommunication, IInventory,
    INavigation, IWorldQuery, ItemStack, Millis, NavigateOptions, Vec3,
};

/// プレイヤーの身長
const PLAYER_HEIGHT: f64 = 1.8;

/// 進行中のナビゲーション
#[derive(Debug, Clone, Copy)]
struct NavigationGoal {
    target: Vec3,
    end_radius: f64,
    deadline: Millis,
}

/// スクリプトで動く相手
#[derive(Debug, Clone)]
struct ScriptedOpponent {
    name: String,
    position: Vec3,
    angle: f64,
    present: bool,
    challenged: bool,
}

/// チャットログの1行
#[derive(Debug, Clone, PartialEq)]
pub enum ChatLine {
    Broadcast(String),
    Whisper { to: String, message: String },
}

/// オフライン検証用のアリーナ
///
/// 平坦な地形（穴あり）、決められた時刻に申し込んで円運動する相手、
/// 直線移動のナビゲーションを持つ決定的なワールドです。
/// コントローラからは通常のクライアントと同じ能力トレイトで操作されます。
#[derive(Debug)]
pub struct Arena {
    time_ms: Millis,
    ground_level: i64,
    min_height: i64,
    pit: Option<[f64; 3]>,
    spawn_point: Vec3,
    walk_speed: f64,

    bot_position: Vec3,
    navigation: Option<NavigationGoal>,
    opponent: ScriptedOpponent,
    opponent_center: Vec3,
    orbit_radius: f64,
    angular_speed: f64,
    challenge_at_ms: Millis,
    leaves_at_ms: Option<Millis>,
    dies_at_ms: Option<Millis>,
    whisperer: String,
    whisper_at_ms: Option<Millis>,

    weapon_item: u32,
    ammo_item: u32,
    inventory: HashMap<u32, u32>,
    equipped: Option<u32>,
    drawing: bool,
    last_look: Option<Vec3>,

    pub arrows_fired: u32,
    pub chat_log: Vec<ChatLine>,
    pending: Vec<BotEvent>,
}

fn secs_to_millis(secs: f64) -> Millis {
    (secs.max(0.0) * 1000.0).round() as Millis
}

impl Arena {
    pub fn new(config: &AgentConfig) -> Self {
        let demo = &config.demo;
        let mut inventory = HashMap::new();
        if demo.bows > 0 {
            inventory.insert(config.equipment.weapon_item, demo.bows);
        }
        if demo.arrows > 0 {
            inventory.insert(config.equipment.ammo_item, demo.arrows);
        }

        let start = demo.opponent_center + Vec3::new(demo.opponent_orbit_radius, 0.0, 0.0);
        Self {
            time_ms: 0,
            ground_level: demo.ground_level,
            min_height: config.world.min_height,
            pit: demo.pit,
            spawn_point: demo.spawn_point,
            walk_speed: demo.walk_speed,
            bot_position: demo.spawn_point,
            navigation: None,
            opponent: ScriptedOpponent {
                name: demo.opponent.clone(),
                position: start,
                angle: 0.0,
                present: true,
                challenged: false,
            },
            opponent_center: demo.opponent_center,
            orbit_radius: demo.opponent_orbit_radius,
            angular_speed: demo.opponent_angular_speed,
            challenge_at_ms: secs_to_millis(demo.challenge_at_s),
            leaves_at_ms: demo.opponent_leaves_at_s.map(secs_to_millis),
            dies_at_ms: demo.self_dies_at_s.map(secs_to_millis),
            whisperer: demo.whisperer.clone(),
            whisper_at_ms: demo.whisper_at_s.map(secs_to_millis),
            weapon_item: config.equipment.weapon_item,
            ammo_item: config.equipment.ammo_item,
            inventory,
            equipped: None,
            drawing: false,
            last_look: None,
            arrows_fired: 0,
            chat_log: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// 接続直後のイベント
    pub fn start(&mut self) -> Vec<BotEvent> {
        vec![BotEvent::Spawn {
            spawn_point: self.spawn_point,
        }]
    }

    #[cfg(test)]
    pub fn is_navigating(&self) -> bool {
        self.navigation.is_some()
    }

    fn in_pit(&self, x: f64, z: f64) -> bool {
        self.pit.is_some_and(|[cx, cz, half]| (x - cx).abs() <= half && (z - cz).abs() <= half)
    }

    /// `dt_ms`だけ時間を進め、その間に発生したイベントを返す
    pub fn step(&mut self, dt_ms: Millis) -> Vec<BotEvent> {
        let previous = self.time_ms;
        self.time_ms += dt_ms;
        let now = self.time_ms;
        let crossed = |at: Millis| previous < at && at <= now;

        self.step_opponent(dt_ms, crossed(self.challenge_at_ms));

        if self.whisper_at_ms.is_some_and(crossed) {
            info!("[arena] {} がささやいた", self.whisperer);
            self.pending.push(BotEvent::Whisper {
                username: self.whisperer.clone(),
            });
        }

        if self.leaves_at_ms.is_some_and(crossed) && self.opponent.present {
            self.opponent.present = false;
            info!("[arena] {} が離脱", self.opponent.name);
            self.pending.push(BotEvent::EntityGone {
                username: Some(self.opponent.name.clone()),
            });
        }

        if self.dies_at_ms.is_some_and(crossed) {
            info!("[arena] ボットが倒された");
            self.navigation = None;
            self.drawing = false;
            self.bot_position = self.spawn_point;
            self.pending.push(BotEvent::SelfDeath);
            self.pending.push(BotEvent::Spawn {
                spawn_point: self.spawn_point,
            });
        }

        self.step_navigation(dt_ms);
        std::mem::take(&mut self.pending)
    }

    fn step_opponent(&mut self, dt_ms: Millis, challenge_now: bool) {
        if !self.opponent.present {
            return;
        }

        self.opponent.angle += self.angular_speed * millis_to_secs(dt_ms);
        let (sin, cos) = self.opponent.angle.sin_cos();
        self.opponent.position =
            self.opponent_center + Vec3::new(self.orbit_radius * cos, 0.0, self.orbit_radius * sin);
        self.pending.push(BotEvent::EntityMoved {
            username: Some(self.opponent.name.clone()),
            position: self.opponent.position,
        });

        if challenge_now && !self.opponent.challenged {
            self.opponent.challenged = true;
            info!("[arena] <{}> challenge", self.opponent.name);
            self.pending.push(BotEvent::Chat {
                username: self.opponent.name.clone(),
                message: "challenge".to_string(),
            });
        }
    }

    fn step_navigation(&mut self, dt_ms: Millis) {
        let Some(goal) = self.navigation else {
            return;
        };

        let horizontal = Vec3::new(goal.target.x, self.bot_position.y, goal.target.z);
        let remaining = self.bot_position.distance_xz(&goal.target);
        if remaining <= goal.end_radius {
            debug!("[arena] 目的地に到着 ({:.1}, {:.1})", goal.target.x, goal.target.z);
            self.navigation = None;
            return;
        }
        if self.time_ms > goal.deadline {
            self.navigation = None;
            self.pending.push(BotEvent::NavigationFailed);
            return;
        }

        let step = (self.walk_speed * millis_to_secs(dt_ms)).min(remaining);
        let direction = (horizontal - self.bot_position) / remaining;
        self.bot_position = self.bot_position + direction * step;
        if !self.in_pit(self.bot_position.x, self.bot_position.z) {
            self.bot_position.y = (self.ground_level + 1) as f64;
        }
    }
}

impl IWorldQuery for Arena {
    fn entity_of(&self, username: &str) -> Option<Entity> {
        if !self.opponent.present || self.opponent.name != username {
            return None;
        }
        Some(Entity {
            position: self.opponent.position,
            height: PLAYER_HEIGHT,
        })
    }

    fn block_at(&self, position: Vec3) -> Option<Block> {
        let (_, y, _) = position.floored();
        if y < self.min_height {
            return None;
        }
        let is_empty = y > self.ground_level || self.in_pit(position.x, position.z);
        Some(Block { is_empty })
    }

    fn self_position(&self) -> Vec3 {
        self.bot_position
    }
}

impl INavigation for Arena {
    fn navigate_to(&mut self, point: Vec3, options: NavigateOptions) {
        // 床より下の地点には経路が無い
        if point.y < self.min_height as f64 {
            self.navigation = None;
            self.pending.push(BotEvent::NavigationFailed);
            return;
        }
        self.navigation = Some(NavigationGoal {
            target: point,
            end_radius: options.end_radius,
            deadline: self.time_ms + options.timeout_ms,
        });
    }

    fn stop_navigation(&mut self) {
        self.navigation = None;
    }
}

impl IActuation for Arena {
    fn look_at(&mut self, point: Vec3) {
        trace!("[arena] look_at ({:.2}, {:.2}, {:.2})", point.x, point.y, point.z);
        self.last_look = Some(point);
    }

    fn activate_held_item(&mut self) {
        self.drawing = self.equipped == Some(self.weapon_item);
    }

    fn deactivate_held_item(&mut self) {
        if !self.drawing {
            return;
        }
        self.drawing = false;
        if let Some(arrows) = self.inventory.get_mut(&self.ammo_item) {
            if *arrows > 0 {
                *arrows -= 1;
                self.arrows_fired += 1;
                // 弾道は扱わないので、放った瞬間の照準点と相手の位置のずれだけ記録する
                if let Some(aim) = self.last_look.filter(|_| self.opponent.present) {
                    debug!(
                        "[arena] 発射: 照準点と相手の水平距離 {:.2}",
                        aim.distance_xz(&self.opponent.position)
                    );
                }
            }
        }
    }

    fn equip(&mut self, item: &ItemStack, _slot: EquipSlot) {
        self.equipped = Some(item.item_id);
    }
}

impl ICommunication for Arena {
    fn broadcast(&mut self, message: &str) {
        info!("[chat] {}", message);
        self.chat_log.push(ChatLine::Broadcast(message.to_string()));
    }

    fn whisper(&mut self, username: &str, message: &str) {
        info!("[whisper -> {}] {}", username, message);
        self.chat_log.push(ChatLine::Whisper {
            to: username.to_string(),
            message: message.to_string(),
        });
    }
}

impl IInventory for Arena {
    fn count_item(&self, item_id: u32) -> u32 {
        self.inventory.get(&item_id).copied().unwrap_or(0)
    }

    fn find_item(&self, item_id: u32) -> Option<ItemStack> {
        self.inventory
            .get(&item_id)
            .filter(|&&count| count > 0)
            .map(|&count| ItemStack {
                item_id,
                count,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> Arena {
        let mut config = AgentConfig::default();
        config.demo.pit = Some([40.0, 40.0, 5.0]);
        Arena::new(&config)
    }

    #[test]
    fn test_terrain_has_pit() {
        let a = arena();
        assert_eq!(a.block_at(Vec3::new(0.0, 63.0, 0.0)), Some(Block { is_empty: false }));
        assert_eq!(a.block_at(Vec3::new(0.0, 64.0, 0.0)), Some(Block { is_empty: true }));
        assert_eq!(a.block_at(Vec3::new(41.0, 10.0, 39.0)), Some(Block { is_empty: true }));
        assert_eq!(a.block_at(Vec3::new(0.0, -1.0, 0.0)), None);
    }

    #[test]
    fn test_opponent_challenges_once_at_scripted_time() {
        let mut a = arena();
        let mut chats = 0;
        for _ in 0..200 {
            chats += a
                .step(50)
                .iter()
                .filter(|e| matches!(e, BotEvent::Chat { .. }))
                .count();
        }
        assert_eq!(chats, 1);
    }

    #[test]
    fn test_whisperer_speaks_once() {
        let mut a = arena();
        let whispers: Vec<_> = (0..200)
            .flat_map(|_| a.step(50))
            .filter(|e| matches!(e, BotEvent::Whisper { .. }))
            .collect();
        assert_eq!(whispers, vec![BotEvent::Whisper { username: "eve".to_string() }]);
    }

    #[test]
    fn test_navigation_arrives_within_end_radius() {
        let mut a = arena();
        a.navigate_to(
            Vec3::new(10.0, 64.0, 0.0),
            NavigateOptions { end_radius: 2.0, timeout_ms: 10_000 },
        );
        for _ in 0..100 {
            a.step(50);
        }
        assert!(!a.is_navigating());
        assert!(a.self_position().distance_xz(&Vec3::new(10.0, 64.0, 0.0)) <= 2.0);
    }

    #[test]
    fn test_navigation_timeout_and_unreachable_fail() {
        let mut a = arena();
        a.navigate_to(
            Vec3::new(500.0, 64.0, 0.0),
            NavigateOptions { end_radius: 2.0, timeout_ms: 1_000 },
        );
        let mut failures = 0;
        for _ in 0..40 {
            failures += a
                .step(50)
                .iter()
                .filter(|e| **e == BotEvent::NavigationFailed)
                .count();
        }
        assert_eq!(failures, 1);

        a.navigate_to(Vec3::new(0.0, -1.0, 0.0), NavigateOptions { end_radius: 2.0, timeout_ms: 1_000 });
        assert!(a.step(50).contains(&BotEvent::NavigationFailed));
    }

    #[test]
    fn test_shooting_consumes_arrows_only_with_bow_equipped() {
        let mut a = arena();
        a.activate_held_item();
        a.deactivate_held_item();
        assert_eq!(a.arrows_fired, 0);

        let bow = a.find_item(261).expect("bow in inventory");
        a.equip(&bow, EquipSlot::Hand);
        a.activate_held_item();
        a.deactivate_held_item();
        assert_eq!(a.arrows_fired, 1);
        assert_eq!(a.count_item(262), 63);
    }
}
