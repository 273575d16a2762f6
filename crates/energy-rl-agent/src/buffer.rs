//! Experience replay memory

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;

use energy_rl_core::Transition;

/// Fixed-capacity FIFO store of transitions
///
/// Pushing onto a full memory evicts the oldest transition first.
#[derive(Debug, Clone)]
pub struct ReplayMemory<S, A> {
    /// Buffer storage, oldest first
    memory: VecDeque<Transition<S, A>>,
    /// Maximum capacity
    capacity: usize,
}

impl<S: Clone, A: Clone> ReplayMemory<S, A> {
    /// Create a new replay memory
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            memory: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a transition, dropping the oldest one when full
    pub fn push(&mut self, transition: Transition<S, A>) {
        if self.capacity == 0 {
            return;
        }
        if self.memory.len() >= self.capacity {
            self.memory.pop_front();
        }
        self.memory.push_back(transition);
    }

    /// Sample a batch uniformly without replacement
    ///
    /// Returns `None` while the memory holds fewer than `batch_size` transitions.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Option<Vec<Transition<S, A>>> {
        if self.memory.len() < batch_size {
            return None;
        }

        let indices: Vec<usize> = (0..self.memory.len()).collect();
        let batch = indices
            .choose_multiple(rng, batch_size)
            .map(|&i| self.memory[i].clone())
            .collect();
        Some(batch)
    }

    /// Get the current size of the memory
    #[must_use]
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Check if the memory is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Maximum number of stored transitions
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the next push evicts a transition
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.memory.len() >= self.capacity
    }

    /// Stored transitions, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Transition<S, A>> {
        self.memory.iter()
    }

    /// Clear the memory
    pub fn clear(&mut self) {
        self.memory.clear();
    }
}
