//! Bounded per-room message history.

use std::collections::VecDeque;

use super::entity::ChatMessage;

/// Default number of messages retained per room.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Strict FIFO of the most recent chat messages of a room.
///
/// The length never exceeds the capacity; appending at capacity evicts the
/// oldest message first.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Create an empty buffer. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, returning the evicted one if the buffer was full.
    pub fn append(&mut self, message: ChatMessage) -> Option<ChatMessage> {
        let evicted = if self.messages.len() == self.capacity {
            self.messages.pop_front()
        } else {
            None
        };
        self.messages.push_back(message);
        evicted
    }

    /// Owned copy of the contents, oldest first.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DisplayName, MessageId, MessageText, RoomId, Timestamp};

    fn message(n: u64) -> ChatMessage {
        ChatMessage::new(
            MessageId::new(n),
            RoomId::new("r1".to_string()).unwrap(),
            DisplayName::new("alice".to_string()).unwrap(),
            MessageText::new(format!("message #{n}")).unwrap(),
            Timestamp::new(n as i64),
        )
    }

    #[test]
    fn test_append_below_capacity_keeps_everything() {
        // テスト項目: 容量未満なら全メッセージが到着順に保持される
        // given (前提条件):
        let mut buffer = HistoryBuffer::new(3);

        // when (操作):
        let evicted = [buffer.append(message(1)), buffer.append(message(2))];

        // then (期待する結果):
        assert!(evicted.iter().all(Option::is_none));
        let ids: Vec<u64> = buffer.snapshot().iter().map(|m| m.id.value()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_append_at_capacity_evicts_oldest() {
        // テスト項目: 101 件目の追加で 1 件目が追い出され、最古は 2 件目になる
        // given (前提条件):
        let mut buffer = HistoryBuffer::default();
        for n in 1..=100 {
            buffer.append(message(n));
        }

        // when (操作):
        let evicted = buffer.append(message(101));

        // then (期待する結果):
        assert_eq!(evicted.map(|m| m.id.value()), Some(1));
        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), 100);
        assert_eq!(snapshot[0].id.value(), 2);
        assert_eq!(snapshot[99].id.value(), 101);
    }

    #[test]
    fn test_many_appends_keep_last_n_in_order() {
        // テスト項目: N > capacity 件追加後、直近 capacity 件が到着順に残る
        // given (前提条件):
        let mut buffer = HistoryBuffer::new(100);

        // when (操作):
        for n in 1..=250 {
            buffer.append(message(n));
            assert!(buffer.len() <= buffer.capacity());
        }

        // then (期待する結果):
        let ids: Vec<u64> = buffer.snapshot().iter().map(|m| m.id.value()).collect();
        assert_eq!(ids, (151..=250).collect::<Vec<u64>>());
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_appends() {
        // テスト項目: 取得済みスナップショットは後続の追加の影響を受けない
        // given (前提条件):
        let mut buffer = HistoryBuffer::new(2);
        buffer.append(message(1));
        buffer.append(message(2));
        let snapshot = buffer.snapshot();

        // when (操作):
        buffer.append(message(3));

        // then (期待する結果):
        let ids: Vec<u64> = snapshot.iter().map(|m| m.id.value()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        // テスト項目: 容量 0 を指定しても最新 1 件は保持される
        // given (前提条件):
        let mut buffer = HistoryBuffer::new(0);

        // when (操作):
        buffer.append(message(1));
        buffer.append(message(2));

        // then (期待する結果):
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.snapshot()[0].id.value(), 2);
    }
}
