use rand::Rng;
use tracing::{debug, info, trace};

use super::{ArcherController, Task};
use crate::models::{IBotClient, Vec3};

/// 射撃サイクルの段階
///
/// `Idle → Aiming → Releasing → Idle`を1回の起動で1周します。
/// `Aiming`の間は射撃中フラグが立ち、移動ループは移動を発行しません。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShootCyclePhase {
    Idle,
    Aiming,
    Releasing,
}

impl<C, R> ArcherController<C, R>
where
    C: IBotClient,
    R: Rng,
{
    pub(super) fn schedule_next_shot(&mut self) {
        let delay = self.random_delay(self.timings.shoot_interval_ms);
        self.timers.schedule_after(self.now, delay, Task::ShootCycle);
    }

    /// 射撃サイクルの開始
    ///
    /// 相手がいない、またはエンティティが解決できなければ何もせず再登録のみ行います。
    pub(super) fn on_shoot_cycle(&mut self) {
        if self.phase != ShootCyclePhase::Idle {
            return;
        }

        let resolvable = self
            .duel
            .opponent()
            .and_then(|name| self.client.entity_of(name))
            .is_some();
        if !resolvable {
            trace!("射撃サイクル: 対象なし");
            self.schedule_next_shot();
            return;
        }

        self.client.stop_navigation();
        self.phase = ShootCyclePhase::Aiming;
        self.client.activate_held_item();
        self.aim_once();
        self.aim_timer = Some(
            self.timers
                .schedule_every(self.now, self.timings.aim_tick_ms, Task::AimTick),
        );
        self.timers
            .schedule_after(self.now, self.timings.draw_duration_ms, Task::Release);
        debug!("引き絞り開始 (t={}ms)", self.now);
    }

    pub(super) fn on_aim_tick(&mut self) {
        if self.phase == ShootCyclePhase::Aiming {
            self.aim_once();
        }
    }

    /// 矢を放ち、射撃中フラグを下ろして即座に再配置する
    pub(super) fn on_release(&mut self) {
        if let Some(handle) = self.aim_timer.take() {
            self.timers.cancel(handle);
        }
        if self.phase != ShootCyclePhase::Aiming {
            return;
        }

        let aim = self.aim_once();
        self.client.deactivate_held_item();
        self.phase = ShootCyclePhase::Releasing;
        self.stats.shots_released += 1;
        if let Some(point) = aim {
            info!("発射: 照準点 ({:.1}, {:.1}, {:.1})", point.x, point.y, point.z);
        }

        self.reposition();
        self.phase = ShootCyclePhase::Idle;
        self.schedule_next_shot();
    }

    /// 相手の現在位置と推定速度から照準点を計算して視線を向ける
    ///
    /// 相手が解決できない場合は何もしません。
    fn aim_once(&mut self) -> Option<Vec3> {
        let entity = self
            .duel
            .opponent()
            .and_then(|name| self.client.entity_of(name))?;
        let distance = self.client.self_position().distance(&entity.position);
        let aim = self.aim.compute_aim_point(
            entity.position,
            entity.height,
            distance,
            self.velocity.velocity(),
        );
        self.client.look_at(aim);
        self.stats.aim_updates += 1;
        Some(aim)
    }
}
