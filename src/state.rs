use itertools::izip;
use nalgebra::Vector3;

use crate::error::{McError, Result};
use crate::maths::wrap_position;

/// Positions and orientations of N linear molecules in a cubic periodic box.
///
/// Positions are stored in box-relative units and kept inside [-0.5, 0.5);
/// orientations are unit vectors. A molecule is identified only by its index
/// into the two parallel sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct MolecularState {
    positions: Vec<Vector3<f64>>,
    orientations: Vec<Vector3<f64>>,
    box_length: f64,
}

impl MolecularState {
    /// Build a state from box-relative positions, wrapping them into the cell
    /// and normalising the orientations.
    pub fn new(
        positions: Vec<Vector3<f64>>,
        orientations: Vec<Vector3<f64>>,
        box_length: f64,
    ) -> Result<Self> {
        if positions.len() != orientations.len() {
            return Err(McError::DimensionMismatch {
                positions: positions.len(),
                orientations: orientations.len(),
            });
        }
        if !(box_length > 0.0) {
            return Err(McError::Config(format!(
                "box length must be positive, got {box_length}"
            )));
        }

        let positions = positions.iter().map(wrap_position).collect();
        let orientations = orientations
            .iter()
            .map(|e| {
                let norm = e.norm();
                if norm > 0.0 {
                    Ok(e / norm)
                } else {
                    Err(McError::Config(
                        "orientation vectors must have non-zero length".to_string(),
                    ))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            positions,
            orientations,
            box_length,
        })
    }

    /// Build a state from positions expressed in absolute (box-scaled) units.
    pub fn from_absolute(
        positions: &[Vector3<f64>],
        orientations: Vec<Vector3<f64>>,
        box_length: f64,
    ) -> Result<Self> {
        if !(box_length > 0.0) {
            return Err(McError::Config(format!(
                "box length must be positive, got {box_length}"
            )));
        }
        let relative = positions.iter().map(|r| r / box_length).collect();
        Self::new(relative, orientations, box_length)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn box_length(&self) -> f64 {
        self.box_length
    }

    pub fn volume(&self) -> f64 {
        self.box_length.powi(3)
    }

    /// Number density N / V.
    pub fn density(&self) -> f64 {
        self.len() as f64 / self.volume()
    }

    pub fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    pub fn orientations(&self) -> &[Vector3<f64>] {
        &self.orientations
    }

    pub fn position(&self, index: usize) -> &Vector3<f64> {
        &self.positions[index]
    }

    pub fn orientation(&self, index: usize) -> &Vector3<f64> {
        &self.orientations[index]
    }

    /// Positions scaled back to absolute units, for writing configurations.
    pub fn absolute_positions(&self) -> Vec<Vector3<f64>> {
        self.positions.iter().map(|r| r * self.box_length).collect()
    }

    /// Iterate over `(index, position, orientation)` triples.
    pub fn molecules(&self) -> impl Iterator<Item = (usize, &Vector3<f64>, &Vector3<f64>)> {
        izip!(0.., &self.positions, &self.orientations)
    }

    pub(crate) fn commit_molecule(
        &mut self,
        index: usize,
        position: Vector3<f64>,
        orientation: Vector3<f64>,
    ) {
        self.positions[index] = position;
        self.orientations[index] = orientation;
    }

    pub(crate) fn commit_box(&mut self, box_length: f64) {
        self.box_length = box_length;
    }
}
