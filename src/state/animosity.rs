use rand::Rng;

use crate::infra::{AgentId, AnimosityProfile};

pub const MAX_ANIMOSITY: u8 = 2;

/// Directed hostility levels, `level(i, j)` is how much `i` resents `j`.
///
/// Each ordered pair mutates independently. The diagonal is never read or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimosityMatrix {
    size: usize,
    levels: Vec<u8>,
}

impl AnimosityMatrix {
    pub fn new<R: Rng + ?Sized>(size: usize, profile: AnimosityProfile, rng: &mut R) -> Self {
        let mut levels = vec![0; size * size];
        for i in 0..size {
            for j in 0..size {
                if i == j {
                    continue;
                }
                levels[i * size + j] = match profile {
                    AnimosityProfile::High => MAX_ANIMOSITY,
                    AnimosityProfile::Low => 0,
                    AnimosityProfile::Random => rng.random_range(0..=MAX_ANIMOSITY),
                };
            }
        }
        Self { size, levels }
    }

    pub fn uniform(size: usize, level: u8) -> Self {
        let mut levels = vec![level.min(MAX_ANIMOSITY); size * size];
        for i in 0..size {
            levels[i * size + i] = 0;
        }
        Self { size, levels }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn level(&self, from: AgentId, toward: AgentId) -> u8 {
        debug_assert_ne!(from, toward);
        self.levels[from * self.size + toward]
    }

    pub fn increase(&mut self, from: AgentId, toward: AgentId) {
        let level = &mut self.levels[from * self.size + toward];
        *level = (*level + 1).min(MAX_ANIMOSITY);
    }

    pub fn decrease(&mut self, from: AgentId, toward: AgentId) {
        let level = &mut self.levels[from * self.size + toward];
        *level = level.saturating_sub(1);
    }

    pub fn set_max(&mut self, from: AgentId, toward: AgentId) {
        self.levels[from * self.size + toward] = MAX_ANIMOSITY;
    }

    /// Rows of the matrix, with `None` on the diagonal
    pub fn rows(&self) -> Vec<Vec<Option<u8>>> {
        (0..self.size)
            .map(|i| {
                (0..self.size)
                    .map(|j| (i != j).then(|| self.level(i, j)))
                    .collect()
            })
            .collect()
    }
}
