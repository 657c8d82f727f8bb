use nalgebra::Vector2;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    error::ConfigurationError,
    fdtd::{
        coefficients::Coefficients,
        loss::LossLayer,
    },
    lattice::Lattice,
};

/// How the grid edges are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Boundary {
    /// Edge cells are never updated and stay zero. Waves are reflected.
    #[default]
    Fixed,

    /// Each edge cell replays the value its inner neighbour had one tick
    /// earlier.
    ///
    /// Only for 1D grids, and only reflection-free at Courant number 1, where a
    /// wave moves exactly one cell per tick.
    Replay,

    /// Fields are attenuated in a graded layer along the edges.
    GradedLoss(LossLayer),
}

impl Boundary {
    pub fn check(
        &self,
        size: &Vector2<usize>,
        coefficients: &Coefficients,
    ) -> Result<(), ConfigurationError> {
        match self {
            Boundary::Fixed => {}
            Boundary::Replay => {
                if size.y != 1 {
                    return Err(ConfigurationError::ReplayBoundaryRequiresLine { height: size.y });
                }
                let courant = coefficients.courant_number();
                if (courant - 1.0).abs() > 1e-9 {
                    tracing::warn!(
                        courant,
                        "replay boundary is only reflection-free at courant number 1"
                    );
                }
            }
            Boundary::GradedLoss(layer) => layer.check()?,
        }
        Ok(())
    }
}

/// Edge values captured at the end of the previous tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReplayBuffers {
    pub left: f64,
    pub right: f64,
}

impl ReplayBuffers {
    /// Writes the buffered values into the edge cells of a line.
    pub fn apply(&self, ez: &mut [f64]) {
        let n = ez.len();
        ez[0] = self.left;
        ez[n - 1] = self.right;
    }

    /// Remembers the inner neighbours of the edge cells for the next tick.
    pub fn capture(&mut self, ez: &[f64]) {
        let n = ez.len();
        self.left = ez[1];
        self.right = ez[n - 2];
    }
}

/// Per-simulation state of the configured [`Boundary`].
#[derive(Clone, Debug)]
pub(crate) enum BoundaryState {
    Fixed,
    Replay(ReplayBuffers),
    GradedLoss(Lattice<f64>),
}

impl BoundaryState {
    pub fn new(boundary: &Boundary, size: Vector2<usize>) -> Self {
        match boundary {
            Boundary::Fixed => Self::Fixed,
            Boundary::Replay => Self::Replay(ReplayBuffers::default()),
            Boundary::GradedLoss(layer) => Self::GradedLoss(layer.loss_map(size)),
        }
    }

    pub fn loss(&self) -> Option<&Lattice<f64>> {
        match self {
            Self::GradedLoss(loss) => Some(loss),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        if let Self::Replay(buffers) = self {
            *buffers = ReplayBuffers::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector2;

    use crate::{
        error::ConfigurationError,
        fdtd::{
            boundary::{
                Boundary,
                ReplayBuffers,
            },
            coefficients::Coefficients,
            loss::LossLayer,
        },
    };

    #[test]
    fn replay_buffers_delay_by_one_application() {
        let mut buffers = ReplayBuffers::default();
        let mut ez = [9.0, 1.0, 2.0, 3.0, 9.0];
        buffers.capture(&ez);
        ez[1] = 5.0;
        ez[3] = 6.0;
        buffers.apply(&mut ez);
        assert_eq!(ez, [1.0, 5.0, 2.0, 6.0, 3.0]);
    }

    #[test]
    fn replay_requires_a_line() {
        let result = Boundary::Replay.check(&Vector2::new(10, 10), &Coefficients::REFERENCE_2D);
        assert!(matches!(
            result,
            Err(ConfigurationError::ReplayBoundaryRequiresLine { height: 10 })
        ));
        Boundary::Replay
            .check(&Vector2::new(10, 1), &Coefficients::REFERENCE_1D)
            .unwrap();
    }

    #[test]
    fn loss_layer_is_checked() {
        let boundary = Boundary::GradedLoss(LossLayer {
            margin: 0,
            ..LossLayer::REFERENCE
        });
        assert!(
            boundary
                .check(&Vector2::new(10, 10), &Coefficients::REFERENCE_2D)
                .is_err()
        );
    }
}
