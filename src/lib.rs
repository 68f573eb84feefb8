//! Hard linear molecule Monte Carlo in the NVT and NPT ensembles

pub mod app;
pub mod averages;
pub mod config;
pub mod config_io;
pub mod engine;
pub mod error;
pub mod io;
pub mod maths;
pub mod moves;
pub mod observables;
pub mod overlap;
pub mod state;

pub use engine::{Ensemble, MoveParameters, Simulation};
pub use error::{McError, Result};
pub use overlap::{HardSpherocylinder, OverlapOracle};
pub use state::MolecularState;
