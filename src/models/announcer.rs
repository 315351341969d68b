use tracing::{debug, info};

use crate::models::{common::Millis, traits::ICommunication};

/// 直近のアナウンス記録
#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncementRecord {
    pub last_message: String,
    pub last_time: Millis,
}

/// 重複抑止付きの状態アナウンサー
///
/// 同じ文言を`interval_ms`以内に繰り返し流さないようにします。
/// 重複判定は文字列の完全一致のみです。
#[derive(Debug, Clone)]
pub struct AnnouncementThrottle {
    interval_ms: Millis,
    record: Option<AnnouncementRecord>,
}

impl AnnouncementThrottle {
    pub fn new(interval_ms: Millis) -> Self {
        Self {
            interval_ms,
            record: None,
        }
    }

    /// アナウンスを試みる
    ///
    /// 直前と同じ文言で、かつ前回から`interval_ms`以内なら何もせずfalseを返します。
    /// それ以外はブロードキャストして記録を更新し、trueを返します。
    pub fn announce<C>(&mut self, comms: &mut C, msg: &str, now: Millis) -> bool
    where
        C: ICommunication + ?Sized,
    {
        if let Some(record) = &self.record {
            let recent = now.saturating_sub(record.last_time) <= self.interval_ms;
            if record.last_message == msg && recent {
                debug!("アナウンス抑止: {}", msg);
                return false;
            }
        }

        comms.broadcast(msg);
        info!("アナウンス: {}", msg);
        self.record = Some(AnnouncementRecord {
            last_message: msg.to_string(),
            last_time: now,
        });
        true
    }

    #[cfg(test)]
    pub fn record(&self) -> Option<&AnnouncementRecord> {
        self.record.as_ref()
    }
}
