use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use time::{OffsetDateTime, format_description};
use tracing::{info, warn};

use crate::game::TerminationReason;
use crate::infra::{SimConfig, SimObserver, SimResult};
use crate::planners::rl::Arena;

/// Writes every evaluation tick as CSV rows, one row per agent
pub struct TickRecorder {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl TickRecorder {
    pub fn new(records_folder: &str, seed: u64) -> SimResult<Self> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let format =
            format_description::parse_borrowed::<2>("[year][month][day]-[hour][minute][second]")
                .map_err(io::Error::other)?;
        let date_time_str = now.format(&format).map_err(io::Error::other)?;

        let path = Path::new(records_folder)
            .join(format!("allegiance - {} - seed {}.csv", date_time_str, seed));
        Self::create(path)
    }

    /// Record into an explicit file
    pub fn create(path: PathBuf) -> SimResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(writer, "tick,agent,alive,health,alliance_status,partner,reward")?;
        info!("Recording evaluation ticks to {}", path.display());

        Ok(Self {
            path,
            writer: Some(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Failures stop the recording; the simulation keeps running
    fn write(&mut self, write: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(err) = write(writer) {
                warn!("Tick recording to {} stopped: {}", self.path.display(), err);
                self.writer = None;
            }
        }
    }
}

impl SimObserver for TickRecorder {
    fn on_simulation_start(&mut self, config: &SimConfig, training_budget: usize) {
        let line = format!(
            "# agents={} seed={} training_subgames={}",
            config.num_agents, config.seed, training_budget
        );
        self.write(|writer| writeln!(writer, "{line}"));
    }

    fn on_tick(&mut self, tick: usize, arena: &Arena) {
        let world = arena.world();
        self.write(|writer| {
            for agent in arena.agents() {
                let id = agent.id();
                let state = agent.state();
                let partner = state
                    .alliance_partner
                    .map_or_else(String::new, |p| p.to_string());
                writeln!(
                    writer,
                    "{},{},{},{},{},{},{:.4}",
                    tick,
                    id,
                    world.is_alive(id),
                    world.health_value(id),
                    state.alliance_status,
                    partner,
                    state.reward
                )?;
            }
            Ok(())
        });
    }

    fn on_terminated(&mut self, reason: TerminationReason, ticks: usize, _arena: &Arena) {
        self.write(|writer| {
            writeln!(writer, "# terminated={} ticks={}", reason, ticks)?;
            writer.flush()
        });
    }
}
