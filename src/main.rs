//! Hard linear molecule Monte Carlo command-line interface
//!
//! Runs NVT or NPT Monte Carlo of hard spherocylinders from a YAML run configuration.

use color_eyre::eyre::Result;
use linear_mc::app::McApplication;

fn main() -> Result<()> {
    color_eyre::install()?;
    McApplication::from_cli()?.run()?;
    Ok(())
}
