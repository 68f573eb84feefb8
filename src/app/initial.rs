use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::config::{InitialConfig, RunConfig};
use crate::config_io::read_configuration;
use crate::error::{McError, Result};
use crate::maths::random_unit_vector;
use crate::overlap::OverlapOracle;
use crate::state::MolecularState;

/// Build the starting state described by the run configuration.
pub fn build_initial_state<O: OverlapOracle>(config: &RunConfig, oracle: &O) -> Result<MolecularState> {
    match &config.initial {
        InitialConfig::File { path } => {
            info!("Reading initial configuration from: {}", path);
            let cnf = read_configuration(path)?;
            MolecularState::from_absolute(&cnf.positions, cnf.orientations, cnf.box_length)
        }
        InitialConfig::Lattice {
            n_per_side,
            box_length,
            aligned,
            max_attempts,
        } => {
            info!(
                "Building {}x{}x{} lattice in a box of length {}",
                n_per_side, n_per_side, n_per_side, box_length
            );
            // separate stream from the one driving the moves
            let seed = config.seed.map(|s| s.wrapping_add(1));
            lattice_state(oracle, *n_per_side, *box_length, *aligned, *max_attempts, seed)
        }
    }
}

/// Simple cubic lattice of molecules centred in their cells.
///
/// Aligned lattices point every molecule along z. Otherwise each molecule gets
/// a random orientation, redrawn up to `max_attempts` times until it overlaps
/// none of the molecules already placed.
pub fn lattice_state<O: OverlapOracle>(
    oracle: &O,
    n_per_side: usize,
    box_length: f64,
    aligned: bool,
    max_attempts: usize,
    seed: Option<u64>,
) -> Result<MolecularState> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let n = n_per_side.checked_pow(3).ok_or_else(|| {
        McError::Config(format!("lattice with {n_per_side} molecules per side is too large"))
    })?;
    let cell = 1.0 / n_per_side as f64;
    let mut positions = Vec::with_capacity(n);
    for i in 0..n_per_side {
        for j in 0..n_per_side {
            for k in 0..n_per_side {
                let r = Vector3::new(i as f64, j as f64, k as f64).add_scalar(0.5) * cell;
                positions.push(r.add_scalar(-0.5));
            }
        }
    }

    let orientations = if aligned {
        vec![Vector3::z(); positions.len()]
    } else {
        let mut placed: Vec<Vector3<f64>> = Vec::with_capacity(positions.len());
        for (i, ri) in positions.iter().enumerate() {
            let mut attempts = 0;
            let e = loop {
                attempts += 1;
                if attempts > max_attempts {
                    return Err(McError::Config(format!(
                        "could not orient molecule {} without overlap after {} attempts",
                        i + 1,
                        max_attempts
                    )));
                }
                let e = random_unit_vector(&mut rng);
                let clash = placed
                    .iter()
                    .zip(&positions)
                    .any(|(ej, rj)| oracle.pair_overlap(ri, &e, rj, ej, box_length));
                if !clash {
                    break e;
                }
            };
            placed.push(e);
        }
        placed
    };

    MolecularState::new(positions, orientations, box_length)
}
