use std::path::Path;

use tracing::info;

use crate::averages::{AveragingEngine, BlockSummary, Observable, RunSummary};
use crate::config::RunConfig;
use crate::config_io::write_configuration;
use crate::engine::Simulation;
use crate::error::Result;
use crate::overlap::OverlapOracle;
use crate::state::MolecularState;

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub initial: Vec<Observable>,
    pub blocks: Vec<BlockSummary>,
    pub summary: RunSummary,
    pub final_values: Vec<Observable>,
    pub state: MolecularState,
}

/// Write a state to disk with positions scaled back to absolute units.
pub fn save_state<P: AsRef<Path>>(path: P, state: &MolecularState) -> Result<()> {
    write_configuration(
        path,
        state.box_length(),
        &state.absolute_positions(),
        state.orientations(),
    )
}

/// Drive a simulation through the configured blocks of steps.
///
/// Every step's observables go into the current block; a checkpoint is
/// written after each block. The run ends with the final snapshot, the
/// overlap check, and the final configuration file.
pub fn run_simulation<O: OverlapOracle>(
    mut sim: Simulation<O>,
    config: &RunConfig,
) -> Result<RunOutcome> {
    let initial = sim.sample_snapshot("Initial values");

    let mut averages = AveragingEngine::new();
    averages.run_begin(&initial)?;

    let mut blocks = Vec::with_capacity(config.run.block_count);
    for block in 1..=config.run.block_count {
        averages.block_begin()?;
        for _ in 0..config.run.steps_per_block {
            sim.step()?;
            averages.block_add(&sim.sample_step())?;
        }
        blocks.push(averages.block_end(block)?);

        let checkpoint = config.checkpoint_path(block);
        save_state(&checkpoint, sim.state())?;
        info!("Configuration saved to {}", checkpoint);
    }

    let summary = averages.run_end()?;
    let final_values = sim.sample_snapshot("Final values");
    sim.verify_final()?;

    let final_path = config.final_path();
    save_state(&final_path, sim.state())?;
    info!("Final configuration written to {}", final_path);

    Ok(RunOutcome {
        initial,
        blocks,
        summary,
        final_values,
        state: sim.into_state(),
    })
}
