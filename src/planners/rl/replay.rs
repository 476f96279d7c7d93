//! Fixed-capacity experience store for the network estimator

use rand::Rng;
use rand::seq::index;

use crate::infra::ActionId;

/// One transition seen by a Learned seat
#[derive(Debug, Clone, PartialEq)]
pub struct Experience {
    pub state: Vec<f32>,
    pub action: ActionId,
    pub reward: f32,
    pub next_state: Vec<f32>,
    /// The seat died on this transition
    pub done: bool,
}

/// Circular buffer; the oldest experience is overwritten once full
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    items: Vec<Experience>,
    capacity: usize,
    /// Slot written by the next push once the buffer is full
    next: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity.min(4096)),
            capacity: capacity.max(1),
            next: 0,
        }
    }

    pub fn push(&mut self, experience: Experience) {
        if self.items.len() < self.capacity {
            self.items.push(experience);
        } else {
            self.items[self.next] = experience;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    /// Up to `batch_size` distinct experiences, drawn uniformly
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<&Experience> {
        let amount = batch_size.min(self.items.len());
        index::sample(rng, self.items.len(), amount)
            .into_iter()
            .map(|i| &self.items[i])
            .collect()
    }

    /// Experiences from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        let split = if self.items.len() < self.capacity { 0 } else { self.next };
        self.items[split..].iter().chain(self.items[..split].iter())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
