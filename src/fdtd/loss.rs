use nalgebra::{
    Point2,
    Vector2,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    error::ConfigurationError,
    lattice::Lattice,
};

/// Graded absorbing layer along the grid edges.
///
/// This is not a PML: each E update simply keeps `1 - loss` of the old field
/// value. Grading the loss slowly from zero keeps the reflection off the start
/// of the layer small.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LossLayer {
    /// Width of the layer in cells.
    pub margin: usize,

    /// Loss fraction at the outermost cells.
    pub max_loss: f64,

    /// Polynomial grading order. 3 gives a cubic ease-in.
    #[serde(default = "default_order")]
    pub order: u32,
}

fn default_order() -> u32 {
    3
}

impl LossLayer {
    pub const REFERENCE: Self = Self {
        margin: 20,
        max_loss: 0.1,
        order: 3,
    };

    pub fn check(&self) -> Result<(), ConfigurationError> {
        if self.margin == 0 || self.order == 0 {
            return Err(ConfigurationError::InvalidLossLayer);
        }
        if !(0.0..1.0).contains(&self.max_loss) {
            return Err(ConfigurationError::InvalidLoss {
                value: self.max_loss,
            });
        }
        Ok(())
    }

    /// Loss of a cell `distance` cells away from the nearest edge.
    pub fn loss_at(&self, distance: usize) -> f64 {
        if distance >= self.margin {
            0.0
        }
        else {
            let depth = (self.margin - distance) as f64 / self.margin as f64;
            self.max_loss * depth.powi(self.order as i32)
        }
    }

    pub fn loss_map(&self, size: Vector2<usize>) -> Lattice<f64> {
        Lattice::new(size, |point| self.loss_at(edge_distance(&point, &size)))
    }
}

impl Default for LossLayer {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// Distance in cells to the nearest edge.
///
/// Axes with a single cell don't have edges, so a 1D line only measures along
/// x.
pub fn edge_distance(point: &Point2<usize>, size: &Vector2<usize>) -> usize {
    let axis = |p: usize, n: usize| (n > 1).then(|| p.min(n - 1 - p));
    [axis(point.x, size.x), axis(point.y, size.y)]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(0)
}
