//! Retry queue for undeliverable infections.
//!
//! This module provides a bounded queue with:
//! - FIFO ordering for redelivery
//! - Eviction of the oldest entry when full (bounded memory beats backlog)
//! - An eviction counter for operational visibility
//!
//! The queue is drained one entry at a time by the node's retry task.
//! An empty queue is a normal outcome, never an error.

use std::collections::VecDeque;

use gossip_types::Infection;

/// Bounded FIFO of infections awaiting redelivery.
#[derive(Debug)]
pub struct RetryQueue {
    /// Maximum number of queued infections.
    capacity: usize,
    /// Oldest first.
    queue: VecDeque<Infection>,
    /// Infections dropped because the queue was full.
    evicted_total: u64,
}

impl RetryQueue {
    /// Create a queue holding at most `capacity` infections.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            queue: VecDeque::with_capacity(capacity),
            evicted_total: 0,
        }
    }

    /// Append an infection.
    ///
    /// Returns the evicted oldest entry if the queue was already full.
    pub fn push(&mut self, infection: Infection) -> Option<Infection> {
        let evicted = if self.queue.len() >= self.capacity {
            self.evicted_total += 1;
            self.queue.pop_front()
        } else {
            None
        };
        self.queue.push_back(infection);
        evicted
    }

    /// Remove and return the oldest infection, if any.
    pub fn pop_oldest(&mut self) -> Option<Infection> {
        self.queue.pop_front()
    }

    /// Number of queued infections.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Maximum number of queued infections.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total infections dropped on overflow since creation.
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total
    }

    /// Iterate oldest first without removing.
    pub fn iter(&self) -> impl Iterator<Item = &Infection> {
        self.queue.iter()
    }

    /// Drop every queued infection.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
