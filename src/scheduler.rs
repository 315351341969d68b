//! # Scheduler モジュール
//!
//! 仮想時刻で動く決定的なタイマーキューを提供します。
//!
//! コントローラの全処理は単一の協調スケジューリング領域で実行されます。
//! 各コールバックは最後まで実行され、中断は「将来のタイマー登録」によってのみ
//! 表現されます。壁時計を使わないため、テストでは`pop_due`に渡す時刻を
//! 進めるだけで時間を決定的にステップできます。
//!
//! ## 発火順序
//!
//! 期限時刻の昇順、同時刻なら登録順です。周期タイマーは発火後に
//! キャンセルされていなければ自動的に再登録されます。

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::models::Millis;

/// タイマーのキャンセル用ハンドル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct TimerEntry<T> {
    due: Millis,
    seq: u64,
    id: u64,
    period: Option<Millis>,
    task: T,
}

// BinaryHeapは最大ヒープなので、期限の早いものが「大きい」ように逆順で比較する
impl<T> Ord for TimerEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for TimerEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for TimerEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for TimerEntry<T> {}

/// 仮想時刻タイマーキュー
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<TimerEntry<T>>,
    cancelled: HashSet<u64>,
    next_id: u64,
    next_seq: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            cancelled: HashSet::new(),
            next_id: 0,
            next_seq: 0,
        }
    }

    /// `now + delay`に一度だけ発火するタイマーを登録
    pub fn schedule_after(&mut self, now: Millis, delay: Millis, task: T) -> TimerHandle {
        self.push(now + delay, None, task)
    }

    /// `now + period`から`period`ごとに発火する周期タイマーを登録
    pub fn schedule_every(&mut self, now: Millis, period: Millis, task: T) -> TimerHandle {
        // 周期0は無限ループになるため最小1msに丸める
        let period = period.max(1);
        self.push(now + period, Some(period), task)
    }

    /// タイマーをキャンセル（発火済み・キャンセル済みなら何もしない）
    pub fn cancel(&mut self, handle: TimerHandle) {
        if self.heap.iter().any(|e| e.id == handle.0) {
            self.cancelled.insert(handle.0);
        }
    }

    #[cfg(test)]
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        !self.cancelled.contains(&handle.0) && self.heap.iter().any(|e| e.id == handle.0)
    }

    /// 最も早い未キャンセルタイマーの期限
    #[cfg(test)]
    pub fn next_due(&mut self) -> Option<Millis> {
        self.discard_cancelled();
        self.heap.peek().map(|e| e.due)
    }

    /// 未キャンセルのタイマー数
    pub fn len(&self) -> usize {
        self.heap
            .iter()
            .filter(|e| !self.cancelled.contains(&e.id))
            .count()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> TimerQueue<T> {
    /// `now`までに期限を迎えたタイマーを1つ取り出す
    ///
    /// 周期タイマーは同じハンドルのまま次の期限で再登録されます。
    pub fn pop_due(&mut self, now: Millis) -> Option<(Millis, T)> {
        self.discard_cancelled();
        if self.heap.peek().is_none_or(|e| e.due > now) {
            return None;
        }
        let entry = self.heap.pop()?;
        if let Some(period) = entry.period {
            let seq = self.bump_seq();
            self.heap.push(TimerEntry {
                due: entry.due + period,
                seq,
                id: entry.id,
                period: entry.period,
                task: entry.task.clone(),
            });
        }
        Some((entry.due, entry.task))
    }
}

impl<T> TimerQueue<T> {
    fn push(&mut self, due: Millis, period: Option<Millis>, task: T) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        let seq = self.bump_seq();
        self.heap.push(TimerEntry {
            due,
            seq,
            id,
            period,
            task,
        });
        TimerHandle(id)
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn discard_cancelled(&mut self) {
        while let Some(top) = self.heap.peek() {
            if !self.cancelled.contains(&top.id) {
                break;
            }
            if let Some(entry) = self.heap.pop() {
                // 周期タイマーは再登録されないので、ここでIDを解放できる
                self.cancelled.remove(&entry.id);
            }
        }
    }
}
