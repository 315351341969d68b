//! # Controller モジュール
//!
//! 決闘エージェントの制御コンテキストを提供します。
//!
//! 相手・速度推定・射撃フラグ・アナウンス記録といった共有状態はすべて
//! `ArcherController`のフィールドとして保持され、イベントハンドラとタイマー
//! コールバックに明示的に渡されます。外部クライアントへは`IBotClient`の
//! 能力トレイト経由でのみアクセスします。
//!
//! ## 周期処理
//!
//! - **状態確認**: 固定周期で装備を確認し、状態をアナウンス
//! - **移動ループ**: ランダム周期で相手の周囲へ再配置（射撃中はスキップ）
//! - **射撃ループ**: 照準 → 発射の1サイクルごとにランダム間隔で再登録
//!
//! 各コールバックは単一の協調スケジューリング領域で最後まで実行されます。

mod movement;
mod shooting;

pub use shooting::ShootCyclePhase;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::models::{
    AimPredictor, AnnouncementThrottle, BotEvent, ChallengeOutcome, DuelStateMachine,
    EquipmentGate, IBotClient, Millis, PositioningPlanner, Vec3, VelocityEstimator,
};
use crate::scheduler::{TimerHandle, TimerQueue};

/// タイマーで起動される処理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    StatusCheck,
    MoveTick,
    ShootCycle,
    AimTick,
    Release,
}

/// 実行統計
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerStats {
    pub moves_issued: u32,
    pub spawn_fallbacks: u32,
    pub moves_skipped: u32,
    pub ungrounded_orbits: u32,
    pub shots_released: u32,
    pub aim_updates: u32,
    pub navigation_failures: u32,
    pub announcements: u32,
}

/// ループの周期設定
#[derive(Debug, Clone)]
struct LoopTimings {
    firing_radius: f64,
    move_interval_ms: (Millis, Millis),
    shoot_interval_ms: (Millis, Millis),
    draw_duration_ms: Millis,
    aim_tick_ms: Millis,
    status_check_interval_ms: Millis,
}

/// 決闘エージェントの制御コンテキスト
pub struct ArcherController<C, R> {
    client: C,
    rng: R,
    username: String,
    min_ammo: u32,
    timings: LoopTimings,

    duel: DuelStateMachine,
    announcer: AnnouncementThrottle,
    equipment: EquipmentGate,
    velocity: VelocityEstimator,
    aim: AimPredictor,
    planner: PositioningPlanner,

    phase: ShootCyclePhase,
    aim_timer: Option<TimerHandle>,
    timers: TimerQueue<Task>,
    now: Millis,
    spawn_point: Option<Vec3>,
    stats: ControllerStats,
}

impl<C, R> ArcherController<C, R>
where
    C: IBotClient,
    R: Rng,
{
    pub fn new(client: C, config: &AgentConfig, rng: R) -> Self {
        let combat = &config.combat;
        Self {
            client,
            rng,
            username: config.username.clone(),
            min_ammo: config.equipment.min_ammo,
            timings: LoopTimings {
                firing_radius: combat.firing_radius,
                move_interval_ms: (combat.min_move_interval_ms, combat.max_move_interval_ms),
                shoot_interval_ms: (combat.min_shoot_interval_ms, combat.max_shoot_interval_ms),
                draw_duration_ms: combat.draw_duration_ms,
                aim_tick_ms: combat.aim_tick_ms,
                status_check_interval_ms: config.announce.status_check_interval_ms,
            },
            duel: DuelStateMachine::new(),
            announcer: AnnouncementThrottle::new(config.announce.interval_ms),
            equipment: EquipmentGate::new(
                config.equipment.weapon_item,
                config.equipment.ammo_item,
                config.equipment.min_ammo,
            ),
            velocity: VelocityEstimator::new(combat.velocity_epsilon_s),
            aim: AimPredictor::new(combat.lead_horizon_s),
            planner: PositioningPlanner {
                max_height: config.world.max_height,
                min_height: config.world.min_height,
                combat_navigation: config.navigation.combat.into(),
                spawn_navigation: config.navigation.spawn.into(),
            },
            phase: ShootCyclePhase::Idle,
            aim_timer: None,
            timers: TimerQueue::new(),
            now: 0,
            spawn_point: None,
            stats: ControllerStats::default(),
        }
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    pub fn duel(&self) -> &DuelStateMachine {
        &self.duel
    }

    pub fn velocity(&self) -> &VelocityEstimator {
        &self.velocity
    }

    pub fn phase(&self) -> ShootCyclePhase {
        self.phase
    }

    /// 射撃中フラグ（移動ループとの相互排他）
    pub fn is_shooting(&self) -> bool {
        self.phase == ShootCyclePhase::Aiming
    }

    pub fn spawn_point(&self) -> Option<Vec3> {
        self.spawn_point
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// 仮想時計を`now`まで進め、期限を迎えたタイマーを順に実行
    pub fn advance_to(&mut self, now: Millis) {
        while let Some((due, task)) = self.timers.pop_due(now) {
            self.now = self.now.max(due);
            self.run_task(task);
        }
        self.now = self.now.max(now);
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::StatusCheck => self.status_check(),
            Task::MoveTick => self.on_move_tick(),
            Task::ShootCycle => self.on_shoot_cycle(),
            Task::AimTick => self.on_aim_tick(),
            Task::Release => self.on_release(),
        }
    }

    /// 外部イベントの処理（現在の仮想時刻で実行）
    pub fn handle(&mut self, event: BotEvent) {
        match event {
            BotEvent::Spawn { spawn_point } => self.on_spawn(spawn_point),
            BotEvent::Chat { username, message } => {
                if username == self.username {
                    return;
                }
                if message == "challenge" {
                    self.challenge(&username);
                }
            }
            BotEvent::Whisper { username } => {
                self.client.whisper(&username, "I ignore whisperers.");
            }
            BotEvent::EntityGone { username: Some(username) } => {
                if self.duel.opponent_left(&mut self.client, &username) {
                    self.velocity.reset();
                }
            }
            BotEvent::EntityGone { username: None } => {}
            BotEvent::EntityMoved { username: Some(username), position } => {
                if self.duel.record_sample(&username, position, self.now) {
                    self.velocity.update(position, self.now);
                }
            }
            BotEvent::EntityMoved { username: None, .. } => {}
            BotEvent::SelfDeath => {
                if self.duel.self_died(&mut self.client) {
                    self.velocity.reset();
                }
            }
            BotEvent::NavigationFailed => {
                self.stats.navigation_failures += 1;
                warn!("経路が見つかりません (cannot find path)");
            }
        }
    }

    fn on_spawn(&mut self, spawn_point: Vec3) {
        let first_spawn = self.spawn_point.is_none();
        self.spawn_point = Some(spawn_point);
        if !first_spawn {
            debug!("リスポーン: ({:.1}, {:.1}, {:.1})", spawn_point.x, spawn_point.y, spawn_point.z);
            return;
        }

        info!("スポーン: ({:.1}, {:.1}, {:.1})", spawn_point.x, spawn_point.y, spawn_point.z);
        self.timers
            .schedule_every(self.now, self.timings.status_check_interval_ms, Task::StatusCheck);
        self.status_check();
        self.schedule_next_move();
        self.schedule_next_shot();
    }

    /// 決闘の申し込み
    ///
    /// 受諾した場合は速度推定をリセットし、即座に状態確認と再配置を行います。
    pub fn challenge(&mut self, username: &str) -> ChallengeOutcome {
        let outcome = self.duel.challenge(&mut self.client, username);
        if outcome == ChallengeOutcome::Accepted {
            self.velocity.reset();
            self.status_check();
            self.reposition();
        }
        outcome
    }

    /// 管理用の決闘リセット
    pub fn end_challenge(&mut self) {
        if let Some(opponent) = self.duel.opponent() {
            info!("決闘を強制終了: {}", opponent);
        }
        self.duel.end_challenge();
        self.velocity.reset();
    }

    /// 状態確認とアナウンス
    pub fn status_check(&mut self) {
        let ready = self.equipment.is_ready(&mut self.client);
        let msg = match self.duel.opponent() {
            Some(opponent) => format!("I am currently dueling {}", opponent),
            None if ready => {
                "I challenge anyone to a gentlemanly duel. Say 'challenge' to accept.".to_string()
            }
            None => format!(
                "I will not accept challenges until I have a bow and at least {} arrows.",
                self.min_ammo
            ),
        };
        if self.announcer.announce(&mut self.client, &msg, self.now) {
            self.stats.announcements += 1;
        }
    }

    fn random_delay(&mut self, (min, max): (Millis, Millis)) -> Millis {
        self.rng.gen_range(min..=max)
    }
}
