use std::fmt;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::infra::{AgentId, DefaultObserver, PolicyKind, SimConfig, SimObserver, SimResult};
use crate::planners::ExplorationHint;
use crate::planners::rl::{Arena, Signature, TrainingMetrics};

/// Sub-games between two progress log lines
const PROGRESS_INTERVAL: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationReason {
    SingleWinner,
    AlliedPairWinner,
    AllPairedStalemate,
    IterationCap,
    NoChangeStalemate,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::SingleWinner => "single_winner",
            TerminationReason::AlliedPairWinner => "allied_pair_winner",
            TerminationReason::AllPairedStalemate => "all_paired_stalemate",
            TerminationReason::IterationCap => "iteration_cap",
            TerminationReason::NoChangeStalemate => "no_change_stalemate",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Training,
    Evaluating,
    Terminated(TerminationReason),
}

/// Number of training sub-games: fewer per extra Learned seat, more when the
/// iteration budget is small
pub fn training_budget(max_iteration: usize, learned_seats: usize) -> usize {
    if learned_seats == 0 {
        return 10;
    }
    let scale = 1000.0 / max_iteration.max(100) as f64;
    let budget = (100.0 * scale / learned_seats as f64).floor() as usize;
    budget.max(20)
}

/// Counts consecutive ticks with an identical signature
#[derive(Debug, Clone)]
pub struct StalemateDetector {
    window: usize,
    last: Option<Signature>,
    run: usize,
}

impl StalemateDetector {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            last: None,
            run: 0,
        }
    }

    /// Returns `true` once the same signature was seen `window` ticks in a row
    pub fn observe(&mut self, signature: Signature) -> bool {
        if self.last.as_ref() == Some(&signature) {
            self.run += 1;
        } else {
            self.last = Some(signature);
            self.run = 1;
        }
        self.run >= self.window
    }

    pub fn run_length(&self) -> usize {
        self.run
    }
}

#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub reason: TerminationReason,
    pub training_subgames: usize,
    pub evaluation_ticks: usize,
    pub survivors: Vec<AgentId>,
    /// Ground-truth health of every agent at the end, in real units
    pub final_health: Vec<f64>,
}

/// Episode controller: training sub-games, then one evaluation episode
pub struct Simulation {
    arena: Arena,
    rng: StdRng,
    phase: Phase,
    observer: Box<dyn SimObserver>,
    metrics: TrainingMetrics,
}

impl Simulation {
    pub fn new(mut config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let arena = Arena::new(config, &mut rng)?;
        Ok(Self::from_arena(arena, rng))
    }

    /// Drive an already seated arena
    pub fn from_arena(arena: Arena, rng: StdRng) -> Self {
        Self {
            arena,
            rng,
            phase: Phase::Training,
            observer: Box::new(DefaultObserver),
            metrics: TrainingMetrics::default(),
        }
    }

    pub fn with_observer(mut self, observer: impl SimObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn training_budget(&self) -> usize {
        let config = self.arena.config();
        training_budget(config.max_iteration, config.learned_seat_count())
    }

    pub fn run(&mut self) -> SimulationSummary {
        let budget = self.training_budget();
        self.observer.on_simulation_start(self.arena.config(), budget);

        let subgames = self.train();
        let (reason, ticks) = self.evaluate();

        if let Some(learner) = self.arena.learner() {
            self.observer.on_model_ready(&learner.borrow());
        }

        let world = self.arena.world();
        SimulationSummary {
            reason,
            training_subgames: subgames,
            evaluation_ticks: ticks,
            survivors: self.arena.alive_ids(),
            final_health: (0..world.num_agents()).map(|id| world.health_value(id)).collect(),
        }
    }

    /// Run the full training budget; returns the number of sub-games played
    pub fn train(&mut self) -> usize {
        self.phase = Phase::Training;
        let budget = self.training_budget();
        let start = Instant::now();

        for index in 0..budget {
            self.run_subgame(index);
            if (index + 1) % PROGRESS_INTERVAL == 0 {
                self.metrics
                    .log_to_console(budget, self.arena.learned_epsilon());
            }
        }

        info!(
            "Training finished: {} sub-games in {:.2}s",
            budget,
            start.elapsed().as_secs_f64()
        );
        budget
    }

    /// Play one sub-game from the stable snapshot and roll back afterwards.
    /// Returns the number of ticks played.
    pub fn run_subgame(&mut self, index: usize) -> usize {
        let max_iteration = self.arena.config().max_iteration;
        let learned: Vec<AgentId> = self
            .arena
            .agents()
            .iter()
            .filter(|agent| agent.policy_kind() == PolicyKind::Learned)
            .map(|agent| agent.id())
            .collect();

        let mut ticks = 0;
        let mut learned_reward = 0.0;
        for tick in 0..max_iteration {
            let step = self
                .arena
                .step(ExplorationHint::Training { tick }, &mut self.rng);
            ticks += 1;
            learned_reward += learned.iter().map(|id| step.rewards[*id]).sum::<f64>();
            if let Some(loss) = step.loss {
                self.metrics.record_loss(loss);
            }
            if self.arena.subgame_over() {
                break;
            }
        }

        let survived = learned.iter().any(|id| self.arena.world().is_alive(*id));
        let samples = (ticks * learned.len()).max(1);
        self.metrics
            .record_subgame((learned_reward / samples as f64) as f32, ticks, survived);
        self.observer.on_subgame_finished(index, ticks, &self.arena);
        debug!(index, ticks, "sub-game finished");

        self.arena.rollback();
        ticks
    }

    /// Play the evaluation episode until a win condition, a stalemate or the
    /// iteration cap. Returns the reason and the number of ticks played.
    pub fn evaluate(&mut self) -> (TerminationReason, usize) {
        self.phase = Phase::Evaluating;
        let max_iteration = self.arena.config().max_iteration;
        let mut detector = StalemateDetector::new(self.arena.config().stalemate_window);

        let mut ticks = 0;
        let mut reason = TerminationReason::IterationCap;
        for tick in 0..max_iteration {
            ticks = tick + 1;
            if let Some(found) = self.evaluation_tick(tick, &mut detector) {
                reason = found;
                break;
            }
        }

        self.phase = Phase::Terminated(reason);
        self.observer.on_terminated(reason, ticks, &self.arena);
        info!("Evaluation terminated after {} ticks: {}", ticks, reason);
        (reason, ticks)
    }

    /// One committed evaluation tick followed by the termination checks
    pub fn evaluation_tick(
        &mut self,
        tick: usize,
        detector: &mut StalemateDetector,
    ) -> Option<TerminationReason> {
        self.arena
            .step(ExplorationHint::PostTraining, &mut self.rng);
        self.arena.commit();
        self.observer.on_tick(tick, &self.arena);

        if let Some(reason) = self.arena.outcome() {
            return Some(reason);
        }
        detector
            .observe(self.arena.signature())
            .then_some(TerminationReason::NoChangeStalemate)
    }
}
