//! The value estimator shared by every Learned seat

use std::cell::RefCell;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rand::Rng;
use tracing::info;

use crate::infra::{EstimatorKind, SimConfig, SimResult};
#[cfg(not(feature = "rl"))]
use crate::infra::SimError;

use super::replay::Experience;
use super::tabular::QTable;

#[cfg(feature = "rl")]
use super::train::{DqnLearner, TrainBackend};

/// Handle given to each Learned seat at construction
pub type SharedLearner = Rc<RefCell<LearningCore>>;

pub enum LearningCore {
    Tabular(QTable),
    #[cfg(feature = "rl")]
    Network(Box<DqnLearner<TrainBackend>>),
}

impl std::fmt::Debug for LearningCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LearningCore::Tabular(table) => f
                .debug_struct("Tabular")
                .field("states", &table.num_states())
                .finish(),
            #[cfg(feature = "rl")]
            LearningCore::Network(learner) => f
                .debug_struct("Network")
                .field("calls", &learner.calls())
                .finish(),
        }
    }
}

impl LearningCore {
    pub fn from_config(config: &SimConfig) -> SimResult<Self> {
        match config.estimator {
            EstimatorKind::Tabular => {
                let table = QTable::new(config)?;
                info!("Tabular estimator with {} states", table.num_states());
                Ok(LearningCore::Tabular(table))
            }
            #[cfg(feature = "rl")]
            EstimatorKind::Network => {
                info!(
                    "Network estimator (hidden size {})",
                    config.learning.hidden_size
                );
                Ok(LearningCore::Network(Box::new(DqnLearner::new(
                    Default::default(),
                    config,
                ))))
            }
            #[cfg(not(feature = "rl"))]
            EstimatorKind::Network => Err(SimError::EstimatorUnavailable),
        }
    }

    pub fn shared(self) -> SharedLearner {
        Rc::new(RefCell::new(self))
    }

    pub fn kind(&self) -> EstimatorKind {
        match self {
            LearningCore::Tabular(_) => EstimatorKind::Tabular,
            #[cfg(feature = "rl")]
            LearningCore::Network(_) => EstimatorKind::Network,
        }
    }

    /// One value per action id in the padded range
    pub fn evaluate(&self, features: &[f32]) -> Vec<f32> {
        match self {
            LearningCore::Tabular(table) => table.values(features).to_vec(),
            #[cfg(feature = "rl")]
            LearningCore::Network(learner) => learner.evaluate(features),
        }
    }

    /// Learning hook, called once per tick for every living Learned seat.
    /// Returns the network loss when a gradient step ran.
    #[allow(unused_variables)]
    pub fn learn<R: Rng + ?Sized>(&mut self, experience: Experience, rng: &mut R) -> Option<f32> {
        match self {
            LearningCore::Tabular(table) => {
                table.update(&experience);
                None
            }
            #[cfg(feature = "rl")]
            LearningCore::Network(learner) => learner.learn(experience, rng),
        }
    }

    /// Persist the learned parameters. Returns the path actually written.
    pub fn save(&self, path: &Path) -> SimResult<PathBuf> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        match self {
            LearningCore::Tabular(table) => {
                let file = File::create(path)?;
                table.write_to(BufWriter::new(file))?;
                info!("Saved Q-table to {}", path.display());
                Ok(path.to_path_buf())
            }
            #[cfg(feature = "rl")]
            LearningCore::Network(learner) => {
                learner.save_checkpoint(path)?;
                // the recorder appends its own extension
                Ok(path.with_extension("mpk"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tabular_core_learns_immediately() {
        let config = SimConfig::for_agents(2);
        let mut core = LearningCore::from_config(&config).unwrap();
        let mut rng = rand::rng();
        let experience = Experience {
            state: vec![2.0, 2.0, 1.0],
            action: 4,
            reward: 2.0,
            next_state: vec![2.0, 2.0, 1.0],
            done: false,
        };

        assert_eq!(core.kind(), EstimatorKind::Tabular);
        assert!(core.learn(experience.clone(), &mut rng).is_none());
        assert!(core.evaluate(&experience.state)[4] > 0.0);
    }

    #[test]
    fn test_save_writes_table() {
        let config = SimConfig::for_agents(2);
        let core = LearningCore::from_config(&config).unwrap();
        let path = std::env::temp_dir().join("allegiance-core-test").join("q.txt");

        let written = core.save(&path).unwrap();
        let contents = std::fs::read_to_string(written).unwrap();
        assert!(contents.starts_with("# agents=2"));
    }

    #[cfg(not(feature = "rl"))]
    #[test]
    fn test_network_requires_feature() {
        let mut config = SimConfig::for_agents(2);
        config.estimator = EstimatorKind::Network;
        assert!(matches!(
            LearningCore::from_config(&config),
            Err(SimError::EstimatorUnavailable)
        ));
    }
}
