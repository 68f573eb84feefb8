//! Acceptance engine for hard-body Monte Carlo in the NVT and NPT ensembles.
//!
//! Particle moves are accepted iff the trial molecule overlaps nothing; all
//! non-overlapping configurations are equally likely so no Boltzmann factor
//! appears. In NPT one volume move per step is sampled uniformly in
//! `ln(box)` and accepted by a Metropolis test on
//! `delta = P (V' - V) + (N + 1) ln(V / V')`.

use tracing::{debug, info};

use crate::averages::{report_snapshot, Observable};
use crate::error::{McError, Result};
use crate::moves::{MoveGenerator, TrialMove, TrialVolume};
use crate::observables::{calculate, StepRatios};
use crate::overlap::OverlapOracle;
use crate::state::MolecularState;

/// Ensemble and its ensemble-specific parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ensemble {
    /// Constant volume; pressure is measured through the compressed-box virial.
    Nvt { pressure_virial_epsilon: f64 },
    /// Constant pressure (reduced, `beta P`) with log-box volume moves.
    Npt {
        pressure: f64,
        max_box_displacement: f64,
    },
}

impl Ensemble {
    pub fn name(&self) -> &'static str {
        match self {
            Ensemble::Nvt { .. } => "NVT",
            Ensemble::Npt { .. } => "NPT",
        }
    }
}

/// Maximum trial displacement (molecular units) and rotation per particle move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveParameters {
    pub max_displacement: f64,
    pub max_rotation: f64,
}

/// Accepted/attempted counts for one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepCounters {
    pub moves_attempted: usize,
    pub moves_accepted: usize,
    pub volume_attempted: usize,
    pub volume_accepted: usize,
}

impl StepCounters {
    pub fn ratios(&self) -> StepRatios {
        let ratio = |accepted: usize, attempted: usize| {
            if attempted == 0 {
                0.0
            } else {
                accepted as f64 / attempted as f64
            }
        };
        StepRatios {
            move_ratio: ratio(self.moves_accepted, self.moves_attempted),
            volume_ratio: ratio(self.volume_accepted, self.volume_attempted),
        }
    }
}

/// Molecular state together with the overlap oracle and the move generator
/// that drive it. The state is only mutated through accepted trials.
#[derive(Debug)]
pub struct Simulation<O: OverlapOracle> {
    state: MolecularState,
    oracle: O,
    mover: MoveGenerator,
    ensemble: Ensemble,
    params: MoveParameters,
    last_step: StepCounters,
}

impl<O: OverlapOracle> Simulation<O> {
    /// Set up a simulation, rejecting boxes too small for the minimum-image
    /// convention and configurations that already contain an overlap.
    ///
    /// In NVT the box never changes, so the compressed box used by the virial
    /// pressure is checked here once for every later sample.
    pub fn new(
        state: MolecularState,
        oracle: O,
        ensemble: Ensemble,
        params: MoveParameters,
        seed: Option<u64>,
    ) -> Result<Self> {
        oracle.check_box(state.box_length())?;
        if let Ensemble::Nvt {
            pressure_virial_epsilon,
        } = ensemble
        {
            oracle.check_box(state.box_length() / (1.0 + pressure_virial_epsilon))?;
        }
        if oracle.overlap_all(&state, state.box_length()) {
            return Err(McError::InitialOverlap);
        }
        Ok(Self {
            state,
            oracle,
            mover: MoveGenerator::new(seed),
            ensemble,
            params,
            last_step: StepCounters::default(),
        })
    }

    pub fn state(&self) -> &MolecularState {
        &self.state
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn ensemble(&self) -> &Ensemble {
        &self.ensemble
    }

    pub fn params(&self) -> &MoveParameters {
        &self.params
    }

    pub fn last_step(&self) -> &StepCounters {
        &self.last_step
    }

    /// Accept the trial iff it overlaps none of the other N - 1 molecules.
    pub fn try_particle_move(&mut self, trial: &TrialMove) -> bool {
        let box_length = self.state.box_length();
        if self.oracle.overlap_one(
            &self.state,
            &trial.position,
            &trial.orientation,
            trial.index,
            box_length,
        ) {
            return false;
        }
        self.state
            .commit_molecule(trial.index, trial.position, trial.orientation);
        true
    }

    /// One sequential sweep of trial moves over all molecules.
    pub fn sweep(&mut self) -> usize {
        let mut accepted = 0;
        for index in 0..self.state.len() {
            let trial = self.mover.propose_translation_rotation(
                &self.state,
                index,
                self.params.max_displacement,
                self.params.max_rotation,
            );
            if self.try_particle_move(&trial) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Acceptance exponent for a volume move at the given pressure.
    pub fn volume_delta(&self, pressure: f64, trial: &TrialVolume) -> f64 {
        let n = self.state.len() as f64;
        let box_length = self.state.box_length();
        let delta = pressure * (trial.box_length.powi(3) - box_length.powi(3));
        delta + (n + 1.0) * trial.density_scale().ln()
    }

    /// Hard-core rejection followed by the Metropolis test; commits on acceptance.
    pub fn try_volume_move(&mut self, pressure: f64, trial: &TrialVolume) -> Result<bool> {
        self.oracle.check_box(trial.box_length)?;
        if self.oracle.overlap_all(&self.state, trial.box_length) {
            return Ok(false);
        }
        let delta = self.volume_delta(pressure, trial);
        if !self.mover.metropolis(delta) {
            return Ok(false);
        }
        self.state.commit_box(trial.box_length);
        Ok(true)
    }

    /// One Monte Carlo step: a particle sweep, then (NPT) a single volume trial.
    pub fn step(&mut self) -> Result<()> {
        let mut counters = StepCounters {
            moves_attempted: self.state.len(),
            moves_accepted: self.sweep(),
            ..StepCounters::default()
        };

        if let Ensemble::Npt {
            pressure,
            max_box_displacement,
        } = self.ensemble
        {
            let trial = self
                .mover
                .propose_volume_change(self.state.box_length(), max_box_displacement);
            counters.volume_attempted = 1;
            if self.try_volume_move(pressure, &trial)? {
                counters.volume_accepted = 1;
                debug!(box_length = trial.box_length, "volume move accepted");
            }
        }

        self.last_step = counters;
        Ok(())
    }

    /// Observables after the most recent step.
    pub fn sample_step(&self) -> Vec<Observable> {
        calculate(
            &self.ensemble,
            &self.oracle,
            &self.state,
            self.last_step.ratios(),
        )
    }

    /// Observables outside the sampling loop: the same layout with zero
    /// ratios, reported under `label`.
    pub fn sample_snapshot(&self, label: &str) -> Vec<Observable> {
        let observables = calculate(
            &self.ensemble,
            &self.oracle,
            &self.state,
            StepRatios::default(),
        );
        report_snapshot(label, &observables);
        observables
    }

    /// The configuration produced by the run must be overlap-free.
    pub fn verify_final(&self) -> Result<()> {
        if self.oracle.overlap_all(&self.state, self.state.box_length()) {
            return Err(McError::FinalOverlap);
        }
        info!("No overlaps in final configuration");
        Ok(())
    }

    pub fn into_state(self) -> MolecularState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::HardSpherocylinder;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    const NVT: Ensemble = Ensemble::Nvt {
        pressure_virial_epsilon: 0.005,
    };

    fn lattice_state(n_side: usize, spacing: f64) -> MolecularState {
        let box_length = n_side as f64 * spacing;
        let mut positions = Vec::new();
        for i in 0..n_side {
            for j in 0..n_side {
                for k in 0..n_side {
                    positions.push(Vector3::new(i as f64, j as f64, k as f64) * spacing);
                }
            }
        }
        let n = positions.len();
        MolecularState::from_absolute(&positions, vec![Vector3::z(); n], box_length).unwrap()
    }

    fn params(dr: f64, de: f64) -> MoveParameters {
        MoveParameters {
            max_displacement: dr,
            max_rotation: de,
        }
    }

    #[test]
    fn test_initial_overlap_rejected() {
        let state = MolecularState::from_absolute(
            &[Vector3::zeros(), Vector3::new(0.5, 0.0, 0.0)],
            vec![Vector3::z(), Vector3::z()],
            20.0,
        )
        .unwrap();
        let result = Simulation::new(state, HardSpherocylinder::new(5.0), NVT, params(0.1, 0.1), Some(1));
        assert!(matches!(result, Err(McError::InitialOverlap)));
    }

    #[test]
    fn test_box_too_small_rejected() {
        let state = lattice_state(1, 10.0);
        let result = Simulation::new(state, HardSpherocylinder::new(5.0), NVT, params(0.1, 0.1), Some(1));
        assert!(matches!(result, Err(McError::BoxTooSmall { .. })));
    }

    #[test]
    fn test_compressed_virial_box_too_small_rejected() {
        // 12.02 clears 2 * range = 12, the virial box 12.02 / 1.005 does not
        let pair = || {
            MolecularState::from_absolute(
                &[Vector3::zeros(), Vector3::new(6.01, 0.0, 0.0)],
                vec![Vector3::z(), Vector3::z()],
                12.02,
            )
            .unwrap()
        };
        let result = Simulation::new(pair(), HardSpherocylinder::new(5.0), NVT, params(0.1, 0.1), Some(1));
        assert!(matches!(result, Err(McError::BoxTooSmall { .. })));

        let npt = Ensemble::Npt {
            pressure: 1.0,
            max_box_displacement: 0.001,
        };
        assert!(Simulation::new(pair(), HardSpherocylinder::new(5.0), npt, params(0.1, 0.1), Some(1)).is_ok());
    }

    #[test]
    fn test_accepted_moves_never_create_overlaps() {
        let oracle = HardSpherocylinder::new(2.0);
        let mut sim = Simulation::new(lattice_state(3, 3.2), oracle, NVT, params(0.3, 0.3), Some(17))
            .unwrap();
        let mut total_accepted = 0;
        for _ in 0..40 {
            let n = sim.state().len();
            for index in 0..n {
                let trial = sim.mover.propose_translation_rotation(
                    &sim.state,
                    index,
                    sim.params.max_displacement,
                    sim.params.max_rotation,
                );
                if sim.try_particle_move(&trial) {
                    total_accepted += 1;
                    assert!(!sim.oracle().overlap_all(sim.state(), sim.state().box_length()));
                }
            }
        }
        assert!(total_accepted > 0);
    }

    #[test]
    fn test_zero_magnitude_moves_always_accepted() {
        let oracle = HardSpherocylinder::new(2.0);
        let mut sim = Simulation::new(lattice_state(3, 3.2), oracle, NVT, params(0.0, 0.0), Some(5))
            .unwrap();
        for _ in 0..5 {
            sim.step().unwrap();
            assert_eq!(sim.last_step().moves_accepted, 27);
            assert_relative_eq!(sim.last_step().ratios().move_ratio, 1.0);
        }
    }

    #[test]
    fn test_degenerate_volume_move_has_zero_delta() {
        let oracle = HardSpherocylinder::new(2.0);
        let ensemble = Ensemble::Npt {
            pressure: 3.0,
            max_box_displacement: 0.0,
        };
        let mut sim =
            Simulation::new(lattice_state(3, 3.2), oracle, ensemble, params(0.0, 0.0), Some(8))
                .unwrap();
        let box_length = sim.state().box_length();
        let trial = sim.mover.propose_volume_change(box_length, 0.0);
        assert_eq!(sim.volume_delta(3.0, &trial), 0.0);
        for _ in 0..10 {
            sim.step().unwrap();
            assert_eq!(sim.last_step().volume_accepted, 1);
        }
    }

    #[test]
    fn test_volume_delta_formula() {
        let oracle = HardSpherocylinder::new(2.0);
        let ensemble = Ensemble::Npt {
            pressure: 0.5,
            max_box_displacement: 0.01,
        };
        let sim = Simulation::new(lattice_state(2, 7.0), oracle, ensemble, params(0.1, 0.1), Some(2))
            .unwrap();
        let trial = TrialVolume {
            box_length: 14.0 * 0.01f64.exp(),
            log_box_scale: 0.01,
        };
        let expected = 0.5 * (trial.box_length.powi(3) - 14.0f64.powi(3)) + 9.0 * (-0.03);
        assert_relative_eq!(sim.volume_delta(0.5, &trial), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_accepted_volume_move_keeps_density_consistent() {
        let oracle = HardSpherocylinder::new(1.0);
        let ensemble = Ensemble::Npt {
            pressure: 0.05,
            max_box_displacement: 0.02,
        };
        let mut sim =
            Simulation::new(lattice_state(3, 4.0), oracle, ensemble, params(0.2, 0.2), Some(23))
                .unwrap();
        let mut accepted = 0;
        for _ in 0..100 {
            sim.step().unwrap();
            if sim.last_step().volume_accepted == 1 {
                accepted += 1;
                let state = sim.state();
                assert_relative_eq!(
                    state.density() * state.box_length().powi(3),
                    state.len() as f64,
                    max_relative = 1e-12
                );
                assert!(!sim.oracle().overlap_all(state, state.box_length()));
            }
        }
        assert!(accepted > 0);
    }

    fn npt_pair(separation: f64, box_length: f64, length: f64) -> Simulation<HardSpherocylinder> {
        let state = MolecularState::from_absolute(
            &[Vector3::zeros(), Vector3::new(separation, 0.0, 0.0)],
            vec![Vector3::z(), Vector3::z()],
            box_length,
        )
        .unwrap();
        let ensemble = Ensemble::Npt {
            pressure: 1.0,
            max_box_displacement: 0.02,
        };
        Simulation::new(state, HardSpherocylinder::new(length), ensemble, params(0.0, 0.0), Some(3))
            .unwrap()
    }

    #[test]
    fn test_volume_move_rejected_on_overlap() {
        let mut sim = npt_pair(1.01, 20.0, 1.0);
        // shrinking by e^-0.02 brings the side-by-side gap below one diameter
        let trial = TrialVolume {
            box_length: 20.0 * (-0.02f64).exp(),
            log_box_scale: -0.02,
        };
        assert!(sim.volume_delta(1.0, &trial) < 0.0);
        assert!(!sim.try_volume_move(1.0, &trial).unwrap());
        assert_eq!(sim.state().box_length(), 20.0);
        assert!(sim.verify_final().is_ok());
    }

    #[test]
    fn test_volume_move_below_minimum_image_box_fails() {
        let mut sim = npt_pair(3.0, 20.0, 5.0);
        let trial = TrialVolume {
            box_length: 11.0,
            log_box_scale: (11.0f64 / 20.0).ln(),
        };
        let result = sim.try_volume_move(1.0, &trial);
        assert!(matches!(result, Err(McError::BoxTooSmall { .. })));
        assert_eq!(sim.state().box_length(), 20.0);
    }

    #[test]
    fn test_volume_move_rejected_by_metropolis() {
        let mut sim = npt_pair(5.0, 20.0, 1.0);
        let trial = TrialVolume {
            box_length: 20.0 * 0.5f64.exp(),
            log_box_scale: 0.5,
        };
        // P dV dwarfs the exponent guard, so the draw can never accept
        assert!(sim.volume_delta(10.0, &trial) > crate::maths::EXPONENT_GUARD);
        for _ in 0..20 {
            assert!(!sim.try_volume_move(10.0, &trial).unwrap());
        }
        assert_eq!(sim.state().box_length(), 20.0);
    }

    #[test]
    fn test_final_overlap_detected() {
        let mut sim = npt_pair(5.0, 20.0, 1.0);
        assert!(sim.verify_final().is_ok());
        // place molecule 1 on top of molecule 0, bypassing the acceptance test
        let r0 = *sim.state().position(0);
        sim.state.commit_molecule(1, r0, Vector3::x());
        assert!(matches!(sim.verify_final(), Err(McError::FinalOverlap)));
    }

    #[test]
    fn test_far_apart_pair_always_moves() {
        let state = MolecularState::from_absolute(
            &[Vector3::new(-10.0, -10.0, -10.0), Vector3::new(5.0, 5.0, 5.0)],
            vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(-1.0, 0.5, 0.2)],
            40.0,
        )
        .unwrap();
        let mut sim =
            Simulation::new(state, HardSpherocylinder::new(5.0), NVT, params(0.05, 0.05), Some(4))
                .unwrap();
        sim.step().unwrap();
        let observables = sim.sample_step();
        assert_eq!(observables[0].name, crate::observables::MOVE_RATIO);
        assert_relative_eq!(observables[0].value, 1.0);
        assert!(sim.verify_final().is_ok());
    }

    #[test]
    fn test_snapshot_zeroes_ratios() {
        let mut sim = Simulation::new(
            lattice_state(3, 3.2),
            HardSpherocylinder::new(2.0),
            NVT,
            params(0.0, 0.0),
            Some(6),
        )
        .unwrap();
        sim.step().unwrap();
        assert_relative_eq!(sim.sample_step()[0].value, 1.0);
        let snapshot = sim.sample_snapshot("Final values");
        assert_eq!(snapshot[0].value, 0.0);
        assert_eq!(snapshot.len(), sim.sample_step().len());
    }
}
