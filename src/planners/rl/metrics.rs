//! Running statistics of the training phase

use std::collections::VecDeque;
use std::time::Instant;

/// Moving average calculator
#[derive(Debug, Clone)]
pub struct MovingAverage {
    values: VecDeque<f32>,
    window_size: usize,
    sum: f32,
}

impl MovingAverage {
    pub fn new(window_size: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(window_size),
            window_size,
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.values.len() >= self.window_size {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
        self.values.push_back(value);
        self.sum += value;
    }

    pub fn average(&self) -> f32 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum / self.values.len() as f32
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Per sub-game statistics of the Learned seats
#[derive(Debug)]
pub struct TrainingMetrics {
    /// Mean reward per tick of the Learned seats
    pub subgame_rewards: MovingAverage,
    pub subgame_lengths: MovingAverage,
    /// Fraction of sub-games in which a Learned seat survived
    pub survival_rate: MovingAverage,
    /// Network loss, when the network estimator trains
    pub loss: MovingAverage,
    pub subgames: usize,
    pub total_ticks: usize,
    start_time: Instant,
}

impl TrainingMetrics {
    pub fn new(window_size: usize) -> Self {
        Self {
            subgame_rewards: MovingAverage::new(window_size),
            subgame_lengths: MovingAverage::new(window_size),
            survival_rate: MovingAverage::new(window_size),
            loss: MovingAverage::new(window_size),
            subgames: 0,
            total_ticks: 0,
            start_time: Instant::now(),
        }
    }

    /// Record a finished sub-game
    pub fn record_subgame(&mut self, mean_reward: f32, length: usize, learner_survived: bool) {
        self.subgame_rewards.push(mean_reward);
        self.subgame_lengths.push(length as f32);
        self.survival_rate.push(if learner_survived { 1.0 } else { 0.0 });
        self.subgames += 1;
        self.total_ticks += length;
    }

    pub fn record_loss(&mut self, loss: f32) {
        self.loss.push(loss);
    }

    pub fn training_duration_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    pub fn ticks_per_second(&self) -> f64 {
        let duration = self.training_duration_secs();
        if duration > 0.0 {
            self.total_ticks as f64 / duration
        } else {
            0.0
        }
    }

    pub fn log_to_console(&self, budget: usize, epsilon: Option<f64>) {
        tracing::info!(
            "Sub-game {}/{} | Ticks {} | TPS {:.1}",
            self.subgames,
            budget,
            self.total_ticks,
            self.ticks_per_second()
        );
        tracing::info!(
            "  Learned: reward={:.3}, length={:.1}, survival={:.1}%, loss={:.4}, epsilon={}",
            self.subgame_rewards.average(),
            self.subgame_lengths.average(),
            self.survival_rate.average() * 100.0,
            self.loss.average(),
            epsilon.map_or_else(|| "-".to_string(), |e| format!("{e:.3}"))
        );
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new(100)
    }
}
