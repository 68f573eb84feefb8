mod initial;
mod report;
mod runner;

pub use initial::{build_initial_state, lattice_state};
pub use runner::{run_simulation, save_state, RunOutcome};

use self::report::{report_run_outcome, report_run_parameters};
use crate::config::{Args, RunConfig};
use crate::engine::Simulation;
use crate::io::setup_output;
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;

pub struct McApplication {
    config: RunConfig,
}

impl McApplication {
    /// Parse the command line, start the report stream and load the run
    /// configuration with the command-line overrides applied.
    pub fn from_cli() -> Result<Self> {
        let args = Args::parse();
        setup_output(args.output.as_deref(), args.verbose).wrap_err_with(|| {
            format!(
                "Unable to create output file: {}",
                args.output.as_deref().unwrap_or_default()
            )
        })?;
        let config = load_config(&args)?;
        Ok(Self { config })
    }

    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn run(self) -> Result<RunOutcome> {
        let oracle = self.config.molecule.oracle();
        let state = build_initial_state(&self.config, &oracle)
            .wrap_err("Unable to set up the initial configuration")?;
        report_run_parameters(&self.config, &state);

        let sim = Simulation::new(
            state,
            oracle,
            self.config.ensemble(),
            self.config.move_parameters(),
            self.config.seed,
        )
        .wrap_err("Initial configuration rejected")?;

        let outcome = run_simulation(sim, &self.config).wrap_err("Simulation failed")?;
        report_run_outcome(&outcome);
        Ok(outcome)
    }
}

fn load_config(args: &Args) -> Result<RunConfig> {
    info!("Reading configuration from: {}", args.config_file);
    let config = RunConfig::from_file(&args.config_file)
        .wrap_err_with(|| format!("Unable to load configuration file: {}", args.config_file))?
        .with_overrides(args)
        .wrap_err("Invalid command-line override")?;
    Ok(config)
}
