use crate::averages::Observable;
use crate::engine::Ensemble;
use crate::maths::orientational_order;
use crate::overlap::OverlapOracle;
use crate::state::MolecularState;

pub const MOVE_RATIO: &str = "Move ratio";
pub const VOLUME_RATIO: &str = "Volume ratio";
pub const PRESSURE: &str = "Pressure";
pub const DENSITY: &str = "Density";
pub const NEMATIC_ORDER: &str = "Nematic order";

/// Acceptance ratios of the most recent step; zero for off-loop snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepRatios {
    pub move_ratio: f64,
    pub volume_ratio: f64,
}

/// Virial from the number of pairs that overlap once the box is shrunk by
/// `1 + eps_box`: `W = n_overlap / (3 eps_box)`.
///
/// The shrunk box must still hold twice the oracle range; `Simulation::new`
/// checks this for NVT runs.
pub fn compressed_box_virial<O: OverlapOracle>(
    oracle: &O,
    state: &MolecularState,
    eps_box: f64,
) -> f64 {
    let box_scaled = state.box_length() / (1.0 + eps_box);
    let n_overlap = oracle.overlap_count(state, box_scaled);
    n_overlap as f64 / (3.0 * eps_box)
}

/// Pressure `rho + W / V` by the compressed-box virial route.
pub fn virial_pressure<O: OverlapOracle>(
    oracle: &O,
    state: &MolecularState,
    eps_box: f64,
) -> f64 {
    state.density() + compressed_box_virial(oracle, state, eps_box) / state.volume()
}

/// Instantaneous observables in the fixed order used for a whole run.
///
/// NVT: move ratio, pressure, nematic order.
/// NPT: move ratio, volume ratio, density, nematic order.
pub fn calculate<O: OverlapOracle>(
    ensemble: &Ensemble,
    oracle: &O,
    state: &MolecularState,
    ratios: StepRatios,
) -> Vec<Observable> {
    let order = orientational_order(state.orientations());
    match *ensemble {
        Ensemble::Nvt {
            pressure_virial_epsilon,
        } => vec![
            Observable::average(MOVE_RATIO, ratios.move_ratio).not_instant(),
            Observable::average(
                PRESSURE,
                virial_pressure(oracle, state, pressure_virial_epsilon),
            ),
            Observable::average(NEMATIC_ORDER, order),
        ],
        Ensemble::Npt { .. } => vec![
            Observable::average(MOVE_RATIO, ratios.move_ratio).not_instant(),
            Observable::average(VOLUME_RATIO, ratios.volume_ratio).not_instant(),
            Observable::average(DENSITY, state.density()),
            Observable::average(NEMATIC_ORDER, order),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::HardSpherocylinder;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_ideal_gas_pressure_when_far_apart() {
        let oracle = HardSpherocylinder::new(1.0);
        let state = MolecularState::from_absolute(
            &[Vector3::zeros(), Vector3::new(5.0, 0.0, 0.0)],
            vec![Vector3::z(), Vector3::z()],
            10.0,
        )
        .unwrap();
        assert_relative_eq!(virial_pressure(&oracle, &state, 0.005), 0.002, epsilon = 1e-15);
    }

    #[test]
    fn test_near_contact_pair_contributes_virial() {
        let oracle = HardSpherocylinder::new(1.0);
        // separation 1.004: overlaps once the box shrinks by 0.5%
        let state = MolecularState::from_absolute(
            &[Vector3::zeros(), Vector3::new(1.004, 0.0, 0.0)],
            vec![Vector3::z(), Vector3::z()],
            10.0,
        )
        .unwrap();
        assert_relative_eq!(
            compressed_box_virial(&oracle, &state, 0.005),
            1.0 / 0.015,
            epsilon = 1e-12
        );
        let expected = 0.002 + (1.0 / 0.015) / 1000.0;
        assert_relative_eq!(virial_pressure(&oracle, &state, 0.005), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_observable_layouts() {
        let oracle = HardSpherocylinder::new(1.0);
        let state =
            MolecularState::new(vec![Vector3::zeros()], vec![Vector3::x()], 10.0).unwrap();

        let nvt = calculate(
            &Ensemble::Nvt {
                pressure_virial_epsilon: 0.005,
            },
            &oracle,
            &state,
            StepRatios::default(),
        );
        let names: Vec<_> = nvt.iter().map(|o| o.name).collect();
        assert_eq!(names, vec![MOVE_RATIO, PRESSURE, NEMATIC_ORDER]);
        assert!(!nvt[0].instant);

        let npt = calculate(
            &Ensemble::Npt {
                pressure: 1.0,
                max_box_displacement: 0.01,
            },
            &oracle,
            &state,
            StepRatios {
                move_ratio: 0.5,
                volume_ratio: 1.0,
            },
        );
        let names: Vec<_> = npt.iter().map(|o| o.name).collect();
        assert_eq!(names, vec![MOVE_RATIO, VOLUME_RATIO, DENSITY, NEMATIC_ORDER]);
        assert_relative_eq!(npt[2].value, 0.001);
        assert_relative_eq!(npt[3].value, 1.0, epsilon = 1e-12);
    }
}
