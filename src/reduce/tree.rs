// Wed Jan 14 2026 - Alex

use crate::engine::error::TaskFailure;
use crate::engine::handle::TaskHandle;
use crate::reduce::task::ReduceNode;
use std::collections::VecDeque;

/// Incrementally folds an ordered stream of result handles into one.
///
/// Entries are paired like a binary counter: level `k` holds at most one
/// pending subtree covering `2^k` consecutive shards. Any subtree sitting at a
/// higher level always covers earlier shards than one at a lower level, so
/// every pairing puts the older subtree on the left. N entries produce exactly
/// N - 1 reduce nodes.
pub struct ReduceTree<T> {
    levels: Vec<Option<TaskHandle<T>>>,
    pending: VecDeque<ReduceNode<T>>,
    root: Option<TaskHandle<T>>,
    nodes_created: u64,
    completed: bool,
}

impl<T: Send + 'static> ReduceTree<T> {
    pub fn new() -> Self {
        Self {
            levels: Vec::new(),
            pending: VecDeque::new(),
            root: None,
            nodes_created: 0,
            completed: false,
        }
    }

    pub fn add_entry(&mut self, entry: TaskHandle<T>) {
        debug_assert!(!self.completed, "entry added after the tree was completed");
        self.add_at_level(entry, 0);
    }

    fn add_at_level(&mut self, node: TaskHandle<T>, level: usize) {
        let mut carry = node;
        let mut level = level;

        loop {
            if level >= self.levels.len() {
                self.levels.push(None);
            }

            match self.levels[level].take() {
                Some(lhs) => {
                    carry = self.queue_reduce(lhs, carry);
                    level += 1;
                }
                None => {
                    self.levels[level] = Some(carry);
                    return;
                }
            }
        }
    }

    fn queue_reduce(&mut self, lhs: TaskHandle<T>, rhs: TaskHandle<T>) -> TaskHandle<T> {
        self.nodes_created += 1;
        let node = ReduceNode::new(self.nodes_created, lhs, rhs);
        let combined = node.combined_handle();
        self.pending.push_back(node);
        combined
    }

    /// Signals that no further entries will arrive. Leftover subtrees are
    /// folded from the lowest level upward, each joining the older subtree
    /// above it as the right-hand side.
    pub fn complete(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;

        let mut carry: Option<TaskHandle<T>> = None;
        for level in 0..self.levels.len() {
            carry = match (self.levels[level].take(), carry) {
                (Some(lhs), Some(rhs)) => Some(self.queue_reduce(lhs, rhs)),
                (Some(lhs), None) => Some(lhs),
                (None, rest) => rest,
            };
        }

        self.root = carry;
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn nodes_created(&self) -> u64 {
        self.nodes_created
    }

    pub fn take_ready(&mut self) -> Result<Option<ReduceNode<T>>, TaskFailure> {
        let position = match self.pending.iter().position(|node| node.is_ready()) {
            Some(position) => position,
            None => return Ok(None),
        };

        if let Some(failure) = self.pending[position].child_failure() {
            return Err(failure);
        }

        Ok(self.pending.remove(position))
    }

    pub fn root(&self) -> Option<TaskHandle<T>> {
        self.root.clone()
    }

    pub fn into_root(self) -> Option<TaskHandle<T>> {
        self.root
    }
}

impl<T: Send + 'static> Default for ReduceTree<T> {
    fn default() -> Self {
        Self::new()
    }
}
