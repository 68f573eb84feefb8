use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{McError, Result};
use crate::state::MolecularState;

/// Hard-core intersection test between linear molecules.
///
/// Positions passed in are box-relative; `box_length` converts them to
/// molecular (diameter = 1) units. Implementors only provide the pair test;
/// the whole-system queries are derived from it and are pure functions of the
/// supplied state.
pub trait OverlapOracle {
    /// Largest centre-centre separation at which two molecules can touch.
    fn range(&self) -> f64;

    /// Do molecules i and j intersect?
    fn pair_overlap(
        &self,
        ri: &Vector3<f64>,
        ei: &Vector3<f64>,
        rj: &Vector3<f64>,
        ej: &Vector3<f64>,
        box_length: f64,
    ) -> bool;

    /// The minimum-image convention only holds while the range fits in half a box.
    fn check_box(&self, box_length: f64) -> Result<()> {
        if box_length < 2.0 * self.range() {
            return Err(McError::BoxTooSmall {
                box_length,
                range: self.range(),
            });
        }
        Ok(())
    }

    /// Does a trial molecule at (`r`, `e`) overlap any molecule other than `skip`?
    fn overlap_one(
        &self,
        state: &MolecularState,
        r: &Vector3<f64>,
        e: &Vector3<f64>,
        skip: usize,
        box_length: f64,
    ) -> bool {
        state
            .molecules()
            .filter(|&(j, _, _)| j != skip)
            .any(|(_, rj, ej)| self.pair_overlap(r, e, rj, ej, box_length))
    }

    /// Is there any overlapping pair in the state at the given box length?
    fn overlap_all(&self, state: &MolecularState, box_length: f64) -> bool {
        let positions = state.positions();
        let orientations = state.orientations();
        (0..state.len()).any(|i| {
            ((i + 1)..state.len()).any(|j| {
                self.pair_overlap(
                    &positions[i],
                    &orientations[i],
                    &positions[j],
                    &orientations[j],
                    box_length,
                )
            })
        })
    }

    /// Number of overlapping pairs in the state at the given box length.
    fn overlap_count(&self, state: &MolecularState, box_length: f64) -> usize {
        let positions = state.positions();
        let orientations = state.orientations();
        let mut count = 0;
        for i in 0..state.len() {
            for j in (i + 1)..state.len() {
                if self.pair_overlap(
                    &positions[i],
                    &orientations[i],
                    &positions[j],
                    &orientations[j],
                    box_length,
                ) {
                    count += 1;
                }
            }
        }
        count
    }
}

/// Hard spherocylinder of unit diameter and cylinder length `length`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardSpherocylinder {
    pub length: f64,
}

impl HardSpherocylinder {
    pub fn new(length: f64) -> Self {
        HardSpherocylinder { length }
    }

    /// Minimum image separation in molecular units.
    fn minimum_image(&self, ri: &Vector3<f64>, rj: &Vector3<f64>, box_length: f64) -> Vector3<f64> {
        let d = ri - rj;
        d.map(|x| x - x.round()) * box_length
    }

    /// Squared minimum distance between the two axis segments (Vega & Lago).
    pub fn segment_distance_sq(
        &self,
        rij: &Vector3<f64>,
        ei: &Vector3<f64>,
        ej: &Vector3<f64>,
    ) -> f64 {
        const PARALLEL_TOL: f64 = 1.0e-6;
        let half = 0.5 * self.length;

        let rei = rij.dot(ei);
        let rej = rij.dot(ej);
        let eij = ei.dot(ej);
        let sin_sq = 1.0 - eij * eij;

        let (mut ci, mut cj) = if sin_sq < PARALLEL_TOL {
            (-rei, 0.0)
        } else {
            (
                (-rei + eij * rej) / sin_sq,
                (rej - eij * rei) / sin_sq,
            )
        };

        let ai = ci.abs();
        let aj = cj.abs();
        if ai > half || aj > half {
            if ai >= aj {
                ci = half.copysign(ci);
                cj = (ci * eij + rej).clamp(-half, half);
            } else {
                cj = half.copysign(cj);
                ci = (cj * eij - rei).clamp(-half, half);
            }
        }

        let dij = rij + ei * ci - ej * cj;
        dij.norm_squared()
    }
}

impl OverlapOracle for HardSpherocylinder {
    fn range(&self) -> f64 {
        1.0 + self.length
    }

    fn pair_overlap(
        &self,
        ri: &Vector3<f64>,
        ei: &Vector3<f64>,
        rj: &Vector3<f64>,
        ej: &Vector3<f64>,
        box_length: f64,
    ) -> bool {
        let rij = self.minimum_image(ri, rj, box_length);
        let range = self.range();
        if rij.norm_squared() > range * range {
            return false;
        }
        self.segment_distance_sq(&rij, ei, ej) < 1.0
    }
}
