use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::maths::{metropolis, random_rotate_vector, random_translate_vector, wrap_position};
use crate::state::MolecularState;

/// A proposed replacement for one molecule, in box-relative units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialMove {
    pub index: usize,
    pub position: Vector3<f64>,
    pub orientation: Vector3<f64>,
}

/// A proposed uniform rescaling of the box, sampled in `ln(box)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialVolume {
    pub box_length: f64,
    pub log_box_scale: f64,
}

impl TrialVolume {
    /// Volume-scale factor's inverse, `(box / trial_box)^3`.
    pub fn density_scale(&self) -> f64 {
        (-3.0 * self.log_box_scale).exp()
    }
}

/// Proposes trial moves. Owns the random number generator so that runs are
/// reproducible from a seed.
#[derive(Debug)]
pub struct MoveGenerator {
    rng: StdRng,
}

impl MoveGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Trial displacement within `dr_max` (molecular units) and rotation within
    /// `de_max`, drawn independently of every other molecule.
    pub fn propose_translation_rotation(
        &mut self,
        state: &MolecularState,
        index: usize,
        dr_max: f64,
        de_max: f64,
    ) -> TrialMove {
        let half_width = dr_max / state.box_length();
        let position = random_translate_vector(&mut self.rng, half_width, state.position(index));
        let orientation = random_rotate_vector(&mut self.rng, de_max, state.orientation(index));
        TrialMove {
            index,
            position: wrap_position(&position),
            orientation,
        }
    }

    /// Trial box length `box * exp(db_max * zeta)`, `zeta` uniform in (-1, 1).
    pub fn propose_volume_change(&mut self, box_length: f64, db_max: f64) -> TrialVolume {
        let zeta = 2.0 * self.rng.gen::<f64>() - 1.0;
        let log_box_scale = zeta * db_max;
        TrialVolume {
            box_length: box_length * log_box_scale.exp(),
            log_box_scale,
        }
    }

    /// Metropolis test drawing from the owned generator.
    pub fn metropolis(&mut self, delta: f64) -> bool {
        metropolis(&mut self.rng, delta)
    }
}
