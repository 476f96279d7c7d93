use std::path::Path;

use allegiance::infra::{CompositeObserver, DefaultObserver, SimObserver, TickRecorder};
use allegiance::{SimConfig, Simulation};
use dotenv::dotenv;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("allegiance=info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging();

    let config = SimConfig::from_env()?;

    let mut observers: Vec<Box<dyn SimObserver>> = vec![Box::new(DefaultObserver)];
    if let Some(folder) = &config.records_folder {
        match TickRecorder::new(folder, config.seed) {
            Ok(recorder) => observers.push(Box::new(recorder)),
            Err(err) => tracing::warn!("Tick recording disabled: {}", err),
        }
    }
    let model_path = config.model_path.clone();

    let mut simulation = Simulation::new(config)?.with_observer(CompositeObserver::new(observers));
    let summary = simulation.run();

    tracing::info!(
        "Result: {} after {} evaluation ticks ({} training sub-games)",
        summary.reason,
        summary.evaluation_ticks,
        summary.training_subgames
    );
    tracing::info!("Final health: {:?}", summary.final_health);

    if let (Some(path), Some(learner)) = (model_path, simulation.arena().learner()) {
        let written = learner.borrow().save(Path::new(&path))?;
        tracing::info!("Model written to {}", written.display());
    }

    Ok(())
}
