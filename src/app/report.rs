use tracing::info;

use crate::config::RunConfig;
use crate::engine::Ensemble;
use crate::state::MolecularState;

use super::runner::RunOutcome;

pub fn report_run_parameters(config: &RunConfig, state: &MolecularState) {
    let ensemble = config.ensemble();
    info!("Hard linear molecule Monte Carlo, {} ensemble", ensemble.name());
    info!("  Number of blocks:               {}", config.run.block_count);
    info!("  Number of steps per block:      {}", config.run.steps_per_block);
    info!("  Maximum displacement:           {:.6}", config.run.max_displacement);
    info!("  Maximum rotation:               {:.6}", config.run.max_rotation);
    match ensemble {
        Ensemble::Nvt {
            pressure_virial_epsilon,
        } => {
            info!("  Pressure scaling parameter:     {:.6}", pressure_virial_epsilon);
        }
        Ensemble::Npt {
            pressure,
            max_box_displacement,
        } => {
            info!("  Specified pressure:             {:.6}", pressure);
            info!("  Maximum ln(box) displacement:   {:.6}", max_box_displacement);
        }
    }
    info!("  Spherocylinder L/D ratio:       {:.6}", config.molecule.length);
    info!("  Number of particles:            {}", state.len());
    info!("  Simulation box length:          {:.6}", state.box_length());
    info!("  Density:                        {:.6}", state.density());
    match config.seed {
        Some(seed) => info!("  Random seed:                    {}", seed),
        None => info!("  Random seed:                    from entropy"),
    }
}

pub fn report_run_outcome(outcome: &RunOutcome) {
    info!(
        "\nRun finished after {} blocks; final box length {:.6}, density {:.6}",
        outcome.summary.blocks,
        outcome.state.box_length(),
        outcome.state.density()
    );
}
