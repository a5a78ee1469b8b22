use std::collections::VecDeque;

use crate::models::Target;

/// FIFO of pending targets.
///
/// Owned by the control task and touched only between rounds, so it needs
/// no synchronisation. Retries go to the tail: they are neither starved nor
/// prioritised over targets that have not been tried yet.
#[derive(Debug, Default, Clone)]
pub struct TargetQueue {
    items: VecDeque<Target>,
}

impl TargetQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, target: Target) {
        self.items.push_back(target);
    }

    /// Remove and return at most `n` targets from the front, in order.
    pub fn dequeue_up_to(&mut self, n: usize) -> Vec<Target> {
        let take = n.min(self.items.len());
        self.items.drain(..take).collect()
    }

    /// Put a failed target back at the tail.
    pub fn requeue(&mut self, target: Target) {
        self.enqueue(target);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Target> for TargetQueue {
    fn from_iter<I: IntoIterator<Item = Target>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl Extend<Target> for TargetQueue {
    fn extend<I: IntoIterator<Item = Target>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}
