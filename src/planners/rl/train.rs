//! Deep Q-learning with experience replay and a target network

use std::path::Path;

use burn::backend::{Autodiff, NdArray};
use burn::module::Module;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::AutodiffBackend;
use rand::Rng;
use tracing::debug;

use crate::infra::{SimConfig, SimError, SimResult};
use crate::planners::action_count;

use super::policy::QNetwork;
use super::replay::{Experience, ReplayBuffer};

/// Backend the binary trains on
pub type TrainBackend = Autodiff<NdArray>;

/// Learning calls between two gradient steps
const UPDATE_INTERVAL: usize = 3;

pub struct DqnLearner<B: AutodiffBackend> {
    online: QNetwork<B>,
    target: QNetwork<B>,
    optimizer: OptimizerAdaptor<Adam, QNetwork<B>, B>,
    replay: ReplayBuffer,
    device: B::Device,
    state_size: usize,
    learning_rate: f64,
    discount: f32,
    batch_size: usize,
    target_update_frequency: usize,
    /// Learning calls from every Learned seat
    calls: usize,
}

impl<B: AutodiffBackend> DqnLearner<B> {
    pub fn new(device: B::Device, config: &SimConfig) -> Self {
        B::seed(config.seed);

        let state_size = config.num_agents + 1;
        let learning = &config.learning;
        let online = QNetwork::new(
            &device,
            state_size,
            learning.hidden_size,
            action_count(config.num_agents),
        );
        let target = online.clone();

        Self {
            online,
            target,
            optimizer: AdamConfig::new().init(),
            replay: ReplayBuffer::new(learning.replay_capacity),
            device,
            state_size,
            learning_rate: learning.learning_rate,
            discount: learning.discount as f32,
            batch_size: learning.batch_size,
            target_update_frequency: learning.target_update_frequency,
            calls: 0,
        }
    }

    /// Q-values of the online network for one observation
    pub fn evaluate(&self, features: &[f32]) -> Vec<f32> {
        self.forward_values(&self.online, features)
    }

    fn forward_values(&self, network: &QNetwork<B>, features: &[f32]) -> Vec<f32> {
        let state = Tensor::<B, 1>::from_floats(features, &self.device).reshape([1, self.state_size]);
        network
            .forward(state)
            .into_data()
            .to_vec::<f32>()
            .unwrap_or_default()
    }

    /// Store the experience and train on every third call once the buffer
    /// holds a full batch. Returns the loss when a gradient step ran.
    pub fn learn<R: Rng + ?Sized>(&mut self, experience: Experience, rng: &mut R) -> Option<f32> {
        self.replay.push(experience);

        let loss = if self.calls % UPDATE_INTERVAL == 0 && self.replay.len() >= self.batch_size {
            Some(self.update(rng))
        } else {
            None
        };

        self.calls += 1;
        if self.calls % self.target_update_frequency == 0 {
            self.target = self.online.clone();
            debug!(calls = self.calls, "target network synchronized");
        }
        loss
    }

    fn update<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f32 {
        let batch = self.replay.sample(self.batch_size, rng);
        let batch_size = batch.len();

        let states: Vec<f32> = batch.iter().flat_map(|e| e.state.iter().copied()).collect();
        let next_states: Vec<f32> = batch
            .iter()
            .flat_map(|e| e.next_state.iter().copied())
            .collect();
        let actions: Vec<i64> = batch.iter().map(|e| e.action as i64).collect();
        let rewards: Vec<f32> = batch.iter().map(|e| e.reward).collect();
        let not_done: Vec<f32> = batch
            .iter()
            .map(|e| if e.done { 0.0 } else { 1.0 })
            .collect();

        let states = self.batch_to_tensor(&states, batch_size);
        let next_states = self.batch_to_tensor(&next_states, batch_size);
        let actions = Tensor::<B, 1, Int>::from_ints(actions.as_slice(), &self.device)
            .reshape([batch_size, 1]);
        let rewards = Tensor::<B, 1>::from_floats(rewards.as_slice(), &self.device);
        let not_done = Tensor::<B, 1>::from_floats(not_done.as_slice(), &self.device);

        let current = self.online.forward(states).gather(1, actions).squeeze(1);
        let next_max: Tensor<B, 1> = self.target.forward(next_states).max_dim(1).squeeze(1);
        let targets = (rewards + not_done * next_max.mul_scalar(self.discount)).detach();

        let loss = (current - targets).powf_scalar(2.0).mean();
        let loss_value = loss
            .clone()
            .into_data()
            .to_vec::<f32>()
            .ok()
            .and_then(|values| values.first().copied())
            .unwrap_or(0.0);

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.online);
        self.online = self
            .optimizer
            .step(self.learning_rate, self.online.clone(), grads);

        loss_value
    }

    fn batch_to_tensor(&self, flat: &[f32], batch_size: usize) -> Tensor<B, 2> {
        Tensor::<B, 1>::from_floats(flat, &self.device).reshape([batch_size, self.state_size])
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn replay(&self) -> &ReplayBuffer {
        &self.replay
    }

    /// Save the online network as a named MessagePack checkpoint
    pub fn save_checkpoint(&self, path: &Path) -> SimResult<()> {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        self.online
            .clone()
            .save_file(path.to_path_buf(), &recorder)
            .map_err(|err| SimError::ModelPersistence(err.to_string()))?;
        tracing::info!("Saved checkpoint to {}", path.display());
        Ok(())
    }
}
