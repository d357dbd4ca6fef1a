use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::message::{MessageId, TutorMessage};

#[derive(Debug)]
struct QueuedMessage {
    message: TutorMessage,
    urgent: bool,
    seq: u64,
}

impl QueuedMessage {
    fn rank(&self) -> (bool, i32, Reverse<u64>) {
        (self.urgent, self.message.priority, Reverse(self.seq))
    }
}

impl PartialEq for QueuedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.rank() == other.rank()
    }
}

impl Eq for QueuedMessage {}

impl PartialOrd for QueuedMessage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedMessage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// Priority queue of messages waiting for the slot. Deferred immediate
/// messages rank above everything else; then higher priority; then FIFO.
#[derive(Debug, Default)]
pub(crate) struct MessageQueue {
    heap: BinaryHeap<QueuedMessage>,
    next_seq: u64,
}

impl MessageQueue {
    pub(crate) fn push(&mut self, message: TutorMessage, urgent: bool) {
        self.next_seq += 1;
        self.heap.push(QueuedMessage {
            message,
            urgent,
            seq: self.next_seq,
        });
    }

    pub(crate) fn pop_next(&mut self) -> Option<TutorMessage> {
        self.heap.pop().map(|queued| queued.message)
    }

    pub(crate) fn contains(&self, id: &MessageId) -> bool {
        self.heap.iter().any(|queued| queued.message.id == *id)
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn clear(&mut self) {
        self.heap.clear();
    }
}
