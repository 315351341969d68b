use tracing::info;

use crate::models::{
    common::{Millis, PlayerId, Vec3},
    traits::ICommunication,
};

/// 決闘の状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuelPhase {
    Idle,
    Dueling(PlayerId),
}

/// `challenge`の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// 新たに決闘を受諾した
    Accepted,
    /// 別の相手と決闘中のため拒否した
    Rejected { current: PlayerId },
    /// 既に同じ相手と決闘中（何もしない）
    AlreadyDueling,
}

/// 決闘状態機械
///
/// 相手は常に高々1人です。相手のクリアは`opponent_left`, `self_died`,
/// `end_challenge`の3つの遷移でのみ行われます。
#[derive(Debug, Clone)]
pub struct DuelStateMachine {
    phase: DuelPhase,
    /// 相手の最新サンプル（位置, 時刻）
    last_opponent_sample: Option<(Vec3, Millis)>,
}

impl Default for DuelStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl DuelStateMachine {
    pub fn new() -> Self {
        Self {
            phase: DuelPhase::Idle,
            last_opponent_sample: None,
        }
    }

    pub fn phase(&self) -> &DuelPhase {
        &self.phase
    }

    pub fn opponent(&self) -> Option<&str> {
        match &self.phase {
            DuelPhase::Dueling(name) => Some(name.as_str()),
            DuelPhase::Idle => None,
        }
    }

    pub fn is_dueling(&self) -> bool {
        matches!(self.phase, DuelPhase::Dueling(_))
    }

    pub fn last_opponent_sample(&self) -> Option<(Vec3, Millis)> {
        self.last_opponent_sample
    }

    /// 決闘の申し込み
    ///
    /// 装備の準備状況は確認しません。受諾後の再配置・状態確認は呼び出し側が行います。
    pub fn challenge<C>(&mut self, comms: &mut C, username: &str) -> ChallengeOutcome
    where
        C: ICommunication + ?Sized,
    {
        match &self.phase {
            // 現在の相手からの再申し込みには拒否のささやきを返さない
            DuelPhase::Dueling(current) if current == username => ChallengeOutcome::AlreadyDueling,
            DuelPhase::Dueling(current) => {
                let current = current.clone();
                comms.whisper(username, &format!("I am in the middle of a duel with {}.", current));
                info!("決闘申し込みを拒否: {} (対戦中: {})", username, current);
                ChallengeOutcome::Rejected { current }
            }
            DuelPhase::Idle => {
                self.phase = DuelPhase::Dueling(username.to_string());
                self.last_opponent_sample = None;
                info!("決闘開始: {}", username);
                ChallengeOutcome::Accepted
            }
        }
    }

    /// エンティティ消失の通知
    ///
    /// 現在の相手であれば不戦勝のメッセージを流してIdleに戻り、trueを返します。
    pub fn opponent_left<C>(&mut self, comms: &mut C, username: &str) -> bool
    where
        C: ICommunication + ?Sized,
    {
        if self.opponent() != Some(username) {
            return false;
        }
        comms.broadcast(&format!(
            "{}, you coward! You have forfeited the challenge by running away.",
            username
        ));
        info!("相手が離脱: {}", username);
        self.end_challenge();
        true
    }

    /// 自分の死亡通知
    ///
    /// 決闘中であれば敗北のメッセージを流してIdleに戻り、trueを返します。
    pub fn self_died<C>(&mut self, comms: &mut C) -> bool
    where
        C: ICommunication + ?Sized,
    {
        let DuelPhase::Dueling(opponent) = &self.phase else {
            return false;
        };
        comms.broadcast(&format!("{} has bested me.", opponent));
        info!("決闘に敗北: {}", opponent);
        self.end_challenge();
        true
    }

    /// 管理用の無条件リセット
    pub fn end_challenge(&mut self) {
        self.phase = DuelPhase::Idle;
        self.last_opponent_sample = None;
    }

    /// 相手の位置サンプルを記録（相手以外は無視してfalse）
    pub fn record_sample(&mut self, username: &str, position: Vec3, timestamp: Millis) -> bool {
        if self.opponent() != Some(username) {
            return false;
        }
        self.last_opponent_sample = Some((position, timestamp));
        true
    }
}
