use rand::Rng;
use tracing::{debug, warn};

use super::{ArcherController, Task};
use crate::models::{IBotClient, MoveIntent};

/// 再配置の判断結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveDecision {
    /// 射撃中のため移動しなかった
    Skipped,
    /// スポーン地点が未知のため移動しなかった
    NoSpawnPoint,
    /// スポーン地点へ退避
    Spawn(MoveIntent),
    /// 相手の周囲の周回点へ移動
    Orbit { intent: MoveIntent, grounded: bool },
}

impl<C, R> ArcherController<C, R>
where
    C: IBotClient,
    R: Rng,
{
    /// 移動ループの1ティック
    pub(super) fn on_move_tick(&mut self) {
        let decision = self.reposition();
        debug!("移動ティック: {:?}", decision);
        self.schedule_next_move();
    }

    pub(super) fn schedule_next_move(&mut self) {
        let delay = self.random_delay(self.timings.move_interval_ms);
        self.timers.schedule_after(self.now, delay, Task::MoveTick);
    }

    /// 相手の周囲へ再配置する
    ///
    /// 射撃中は何もしません。相手がいない、または相手のエンティティが
    /// 解決できない（範囲外）場合はスポーン地点へ戻ります。
    /// エンティティが見えないだけでは決闘状態を変更しません。
    pub fn reposition(&mut self) -> MoveDecision {
        if self.is_shooting() {
            self.stats.moves_skipped += 1;
            return MoveDecision::Skipped;
        }

        let target = self
            .duel
            .opponent()
            .and_then(|name| self.client.entity_of(name));
        let Some(entity) = target else {
            return self.move_toward_spawn();
        };

        let orbit = self.planner.compute_orbit_point(
            &self.client,
            &mut self.rng,
            entity.position,
            self.timings.firing_radius,
        );
        if !orbit.grounded {
            self.stats.ungrounded_orbits += 1;
            warn!(
                "周回点の地面が見つかりません: ({:.1}, {:.1}, {:.1})",
                orbit.position.x, orbit.position.y, orbit.position.z
            );
        }

        let intent = self.planner.combat_intent(orbit.position);
        self.client.navigate_to(intent.destination, intent.options());
        self.stats.moves_issued += 1;
        MoveDecision::Orbit {
            intent,
            grounded: orbit.grounded,
        }
    }

    /// 最後に確認したスポーン地点へ移動
    pub fn move_toward_spawn(&mut self) -> MoveDecision {
        let Some(spawn_point) = self.spawn_point else {
            debug!("スポーン地点が未確定のため移動しません");
            return MoveDecision::NoSpawnPoint;
        };

        let intent = self.planner.spawn_intent(spawn_point);
        self.client.navigate_to(intent.destination, intent.options());
        self.stats.spawn_fallbacks += 1;
        MoveDecision::Spawn(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{armed_client, controller};
    use super::*;
    use crate::models::{BotEvent, Vec3};
    use crate::models::testing::Command;

    #[test]
    fn test_idle_move_tick_heads_to_spawn() {
        let mut ctl = controller(armed_client());
        ctl.handle(BotEvent::Spawn { spawn_point: Vec3::new(4.0, 64.0, -2.0) });

        ctl.advance_to(4_999);
        assert!(ctl.client().navigations().is_empty());

        ctl.advance_to(10_000);
        let navs = ctl.client().navigations();
        assert!(!navs.is_empty());
        assert_eq!(navs[0].0, Vec3::new(4.0, 64.0, -2.0));
        assert_eq!(navs[0].1.end_radius, 50.0);
        assert_eq!(navs[0].1.timeout_ms, 2_000);
    }

    #[test]
    fn test_unresolvable_opponent_falls_back_to_spawn_and_keeps_duel() {
        let mut ctl = controller(armed_client());
        ctl.handle(BotEvent::Spawn { spawn_point: Vec3::ZERO });
        ctl.challenge("ghost");

        assert!(matches!(ctl.reposition(), MoveDecision::Spawn(_)));
        assert_eq!(ctl.duel().opponent(), Some("ghost"));
    }

    #[test]
    fn test_ungrounded_orbit_is_still_navigated() {
        let mut client = armed_client();
        client.ground_level = None;
        client.put_player("bob", Vec3::new(0.0, 64.0, 0.0));
        let mut ctl = controller(client);
        ctl.challenge("bob");

        assert_eq!(ctl.stats().ungrounded_orbits, 1);
        let navs = ctl.client().navigations();
        assert_eq!(navs.len(), 1);
        assert_eq!(navs[0].0.y, -1.0);
    }

    #[test]
    fn test_reposition_is_skipped_while_drawing() {
        let mut client = armed_client();
        client.put_player("bob", Vec3::new(20.0, 64.0, 0.0));
        let mut ctl = controller(client);
        ctl.handle(BotEvent::Spawn { spawn_point: Vec3::ZERO });
        ctl.challenge("bob");

        let mut t = 0;
        while !ctl.is_shooting() {
            t += 1;
            assert!(t < 10_000, "shoot cycle never started");
            ctl.advance_to(t);
        }
        let navs_before = ctl.client().navigations().len();
        let skipped_before = ctl.stats().moves_skipped;

        assert_eq!(ctl.reposition(), MoveDecision::Skipped);
        assert_eq!(ctl.reposition(), MoveDecision::Skipped);
        assert_eq!(ctl.stats().moves_skipped, skipped_before + 2);
        assert_eq!(ctl.client().navigations().len(), navs_before);

        let commands = &ctl.client().commands;
        let draw_start = commands
            .iter()
            .rposition(|c| *c == Command::Activate)
            .expect("draw started");
        assert!(!commands[draw_start..].iter().any(|c| matches!(c, Command::NavigateTo(..))));
    }

    #[test]
    fn test_no_spawn_point_means_no_navigation() {
        let mut ctl = controller(armed_client());
        assert_eq!(ctl.move_toward_spawn(), MoveDecision::NoSpawnPoint);
        assert!(!ctl.client().commands.iter().any(|c| matches!(c, Command::NavigateTo(..))));
    }
}
