// 基本的なデータ型
pub mod common;

// 外部クライアントの能力（trait）とイベント定義
pub mod traits;

// 判断ロジックの各部品
pub mod velocity;
pub mod aim;
pub mod positioning;
pub mod announcer;
pub mod equipment;
pub mod duel;

#[cfg(test)]
pub mod testing;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use velocity::VelocityEstimator;
pub use aim::AimPredictor;
pub use positioning::{MoveIntent, PositioningPlanner};
pub use announcer::AnnouncementThrottle;
pub use equipment::EquipmentGate;
pub use duel::{ChallengeOutcome, DuelPhase, DuelStateMachine};
