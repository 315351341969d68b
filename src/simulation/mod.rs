//! # Simulation モジュール
//!
//! オフラインアリーナ上で決闘コントローラを動かすシミュレーションエンジンを提供します。
//!
//! ゲームクライアント本体は外部コンポーネントのため、ここでは決定的な
//! `Arena`を能力トレイトの実装として差し込み、固定時間刻み（Δt）で
//! アリーナとコントローラの仮想時計を同時に進めます。
//!
//! ## 1ステップの処理順序
//!
//! 1. **アリーナ更新**: 相手の移動、スクリプトイベント、ナビゲーション進行
//! 2. **タイマー処理**: コントローラの仮想時計をΔt進め、期限のタイマーを実行
//! 3. **イベント配送**: アリーナで発生したイベントをコントローラへ渡す
//!
//! エンジンは運営者の役も兼ね、`demo.end_challenge_at_s`の時刻に
//! 決闘を強制終了します。
//!
//! `--realtime`指定時はtokioのintervalで壁時計に合わせてステップします。
//! ランタイムはシングルスレッド（current_thread）で、コントローラの
//! 協調スケジューリングモデルと一致します。

pub mod arena;

pub use arena::{Arena, ChatLine};

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace};

use crate::config::AgentConfig;
use crate::controller::{ArcherController, ControllerStats, ShootCyclePhase};
use crate::models::{DuelPhase, Millis, Vec3};

/// 実行結果のまとめ
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub steps: u64,
    pub elapsed_ms: Millis,
    pub stats: ControllerStats,
    pub arrows_fired: u32,
    pub chat_lines: usize,
    pub whispers_sent: usize,
    pub spawn_point: Option<Vec3>,
    /// 推定が有効な場合の最終的な相手速度
    pub opponent_velocity: Option<Vec3>,
    /// 決闘中の場合、相手の最後の観測（位置, 時刻）
    pub last_opponent_sample: Option<(Vec3, Millis)>,
    pub final_duel: DuelPhase,
    pub final_phase: ShootCyclePhase,
}

impl SimulationReport {
    pub fn print_summary(&self) {
        println!("=== シミュレーション結果 ===");
        println!("実行時間: {:.1}秒 ({}ステップ)", self.elapsed_ms as f64 / 1000.0, self.steps);
        println!(
            "発射数: {}本 / 射撃サイクル {}回 (照準更新 {}回)",
            self.arrows_fired, self.stats.shots_released, self.stats.aim_updates
        );
        println!(
            "移動指令: 周回 {}回 / スポーン退避 {}回 / スキップ {}回",
            self.stats.moves_issued, self.stats.spawn_fallbacks, self.stats.moves_skipped
        );
        println!(
            "経路失敗: {}回 (地面なし周回点 {}回)",
            self.stats.navigation_failures, self.stats.ungrounded_orbits
        );
        println!(
            "チャット: {}行 (アナウンス {}回, ささやき {}回)",
            self.chat_lines, self.stats.announcements, self.whispers_sent
        );
        if let Some(spawn) = self.spawn_point {
            println!("スポーン地点: ({:.1}, {:.1}, {:.1})", spawn.x, spawn.y, spawn.z);
        }
        match self.opponent_velocity {
            Some(v) => println!("相手の推定速度: ({:.2}, {:.2}, {:.2}) ブロック/秒", v.x, v.y, v.z),
            None => println!("相手の推定速度: なし"),
        }
        if let Some((pos, at)) = self.last_opponent_sample {
            println!("相手の最終観測: ({:.1}, {:.1}, {:.1}) @ {}ms", pos.x, pos.y, pos.z, at);
        }
        println!("最終状態: {:?} / {:?}", self.final_duel, self.final_phase);
    }
}

pub struct SimulationEngine {
    controller: ArcherController<Arena, ChaCha8Rng>,
    dt_ms: Millis,
    max_time_ms: Millis,
    end_challenge_at_ms: Option<Millis>,
    step_count: u64,
    verbose_level: u8,
}

impl SimulationEngine {
    pub fn new(config: &AgentConfig, verbose_level: u8) -> Self {
        let arena = Arena::new(config);
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            controller: ArcherController::new(arena, config, rng),
            dt_ms: config.demo.dt_ms,
            max_time_ms: (config.demo.duration_s * 1000.0).round() as Millis,
            end_challenge_at_ms: config
                .demo
                .end_challenge_at_s
                .map(|s| (s.max(0.0) * 1000.0).round() as Millis),
            step_count: 0,
            verbose_level,
        }
    }

    #[cfg(test)]
    pub fn controller(&self) -> &ArcherController<Arena, ChaCha8Rng> {
        &self.controller
    }

    /// アリーナへの接続（スポーンイベントの配送）
    pub fn initialize(&mut self) {
        if self.verbose_level > 0 {
            info!("シミュレーションエンジンを初期化中...");
        }
        let events = self.controller.client_mut().start();
        for event in events {
            self.controller.handle(event);
        }
    }

    /// シミュレーション実行
    ///
    /// `realtime`がtrueの場合、各ステップをΔtの壁時計間隔に合わせます。
    pub async fn run(&mut self, realtime: bool) -> SimulationReport {
        info!("=== シミュレーション実行開始 ===");
        let mut ticker = realtime.then(|| tokio::time::interval(Duration::from_millis(self.dt_ms)));

        while self.controller.now() < self.max_time_ms {
            if let Some(ticker) = ticker.as_mut() {
                ticker.tick().await;
            }
            self.step();

            if self.verbose_level > 2 {
                trace!("時刻: {}ms (ステップ: {})", self.controller.now(), self.step_count);
            }
            if self.step_count % 200 == 0 && self.verbose_level > 0 {
                let progress = self.controller.now() as f64 / self.max_time_ms as f64 * 100.0;
                info!(
                    "進行状況: {:.1}% ({}ms, 待機タイマー {}件)",
                    progress,
                    self.controller.now(),
                    self.controller.pending_timers()
                );
            }
        }

        info!("=== シミュレーション完了 ===");
        self.report()
    }

    fn step(&mut self) {
        let previous = self.controller.now();
        let now = previous + self.dt_ms;
        let events = self.controller.client_mut().step(self.dt_ms);
        self.controller.advance_to(now);
        for event in events {
            debug!("イベント: {:?}", event);
            self.controller.handle(event);
        }

        let reset_due = self
            .end_challenge_at_ms
            .is_some_and(|at| previous < at && at <= now);
        if reset_due && self.controller.duel().is_dueling() {
            self.controller.end_challenge();
        }
        self.step_count += 1;
    }

    pub fn report(&self) -> SimulationReport {
        let arena = self.controller.client();
        let whispers_sent = arena
            .chat_log
            .iter()
            .filter(|line| matches!(line, ChatLine::Whisper { .. }))
            .count();
        let velocity = self.controller.velocity();
        SimulationReport {
            steps: self.step_count,
            elapsed_ms: self.controller.now(),
            stats: self.controller.stats().clone(),
            arrows_fired: arena.arrows_fired,
            chat_lines: arena.chat_log.len(),
            whispers_sent,
            spawn_point: self.controller.spawn_point(),
            opponent_velocity: velocity.is_valid().then_some(velocity.velocity()),
            last_opponent_sample: self.controller.duel().last_opponent_sample(),
            final_duel: self.controller.duel().phase().clone(),
            final_phase: self.controller.phase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broadcasts(engine: &SimulationEngine) -> Vec<String> {
        engine
            .controller()
            .client()
            .chat_log
            .iter()
            .filter_map(|line| match line {
                ChatLine::Broadcast(msg) => Some(msg.clone()),
                ChatLine::Whisper { .. } => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_default_demo_duel_runs_to_forfeit() {
        let config = AgentConfig::default();
        let mut engine = SimulationEngine::new(&config, 0);
        engine.initialize();
        let report = engine.run(false).await;

        assert_eq!(report.elapsed_ms, 60_000);
        assert!(report.arrows_fired > 0);
        assert_eq!(report.arrows_fired, report.stats.shots_released);
        assert_eq!(report.final_duel, DuelPhase::Idle);

        let chat = broadcasts(&engine);
        assert!(chat.contains(&"I am currently dueling bob".to_string()));
        assert_eq!(
            chat.iter().filter(|m| m.contains("forfeited")).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_death_script_reports_defeat() {
        let mut config = AgentConfig::default();
        config.demo.duration_s = 20.0;
        config.demo.opponent_leaves_at_s = None;
        config.demo.self_dies_at_s = Some(10.0);
        let mut engine = SimulationEngine::new(&config, 0);
        engine.initialize();
        let report = engine.run(false).await;

        assert_eq!(report.final_duel, DuelPhase::Idle);
        assert!(broadcasts(&engine).contains(&"bob has bested me.".to_string()));
    }

    #[tokio::test]
    async fn test_unarmed_bot_still_accepts_duel() {
        let mut config = AgentConfig::default();
        config.demo.arrows = 0;
        config.demo.duration_s = 10.0;
        config.demo.opponent_leaves_at_s = None;
        let mut engine = SimulationEngine::new(&config, 0);
        engine.initialize();
        let report = engine.run(false).await;

        assert_eq!(report.final_duel, DuelPhase::Dueling("bob".to_string()));
        assert_eq!(report.arrows_fired, 0);
        let chat = broadcasts(&engine);
        assert_eq!(
            chat.first().map(String::as_str),
            Some("I will not accept challenges until I have a bow and at least 30 arrows.")
        );
    }

    #[tokio::test]
    async fn test_scripted_reset_and_whisper_reach_controller() {
        let mut config = AgentConfig::default();
        config.demo.duration_s = 15.0;
        config.demo.opponent_leaves_at_s = None;
        config.demo.end_challenge_at_s = Some(8.0);
        let mut engine = SimulationEngine::new(&config, 0);
        engine.initialize();
        let report = engine.run(false).await;

        let log = &engine.controller().client().chat_log;
        assert!(log.contains(&ChatLine::Whisper {
            to: "eve".to_string(),
            message: "I ignore whisperers.".to_string(),
        }));
        assert_eq!(report.whispers_sent, 1);

        // 強制終了は勝敗のメッセージを出さない
        assert_eq!(report.final_duel, DuelPhase::Idle);
        let chat = broadcasts(&engine);
        assert!(!chat.iter().any(|m| m.contains("forfeited") || m.contains("bested")));
        assert_eq!(
            chat.last().map(String::as_str),
            Some("I challenge anyone to a gentlemanly duel. Say 'challenge' to accept.")
        );
        assert_eq!(report.spawn_point, Some(config.demo.spawn_point));
    }

    #[tokio::test]
    async fn test_same_seed_is_reproducible() {
        let config = AgentConfig::default();
        let mut a = SimulationEngine::new(&config, 0);
        let mut b = SimulationEngine::new(&config, 0);
        a.initialize();
        b.initialize();
        let ra = a.run(false).await;
        let rb = b.run(false).await;

        assert_eq!(ra.stats, rb.stats);
        assert_eq!(a.controller().client().chat_log, b.controller().client().chat_log);
    }
}
