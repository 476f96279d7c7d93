//! Q-network using the Burn framework

use burn::module::Module;
use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

/// Feed-forward Q-function: observation features → one value per action id
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    input: Linear<B>,
    hidden: Linear<B>,
    output: Linear<B>,
    activation: Relu,
}

impl<B: Backend> QNetwork<B> {
    pub fn new(device: &B::Device, state_size: usize, hidden_size: usize, num_actions: usize) -> Self {
        Self {
            input: LinearConfig::new(state_size, hidden_size).init(device),
            hidden: LinearConfig::new(hidden_size, hidden_size).init(device),
            output: LinearConfig::new(hidden_size, num_actions).init(device),
            activation: Relu::new(),
        }
    }

    /// states: [batch, state_size] → [batch, num_actions]
    pub fn forward(&self, states: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.input.forward(states));
        let x = self.activation.forward(self.hidden.forward(x));
        self.output.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_output_has_one_value_per_action() {
        let device = Default::default();
        let network = QNetwork::<NdArray>::new(&device, 4, 8, 11);
        let states = Tensor::<NdArray, 2>::zeros([5, 4], &device);
        assert_eq!(network.forward(states).dims(), [5, 11]);
    }
}
