use nalgebra::Vector2;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    error::ConfigurationError,
    lattice::Lattice,
    material::{
        Material,
        MaterialRegion,
        Rasterize,
    },
};

/// Update gains of the normalized leapfrog scheme.
///
/// With unit cell size these are `c * dt / dx` for the E update in vacuum
/// (`vacuum`, called `Cb` per cell) and for the H update (`magnetic`, `Ch`).
/// The E gain inside a material is `vacuum / epsilon_r`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub vacuum: f64,
    pub magnetic: f64,
}

impl Coefficients {
    /// `Cb = Ch = 0.5`, a Courant number of 0.5.
    pub const REFERENCE_2D: Self = Self::from_courant_number(0.5);

    /// `Cb = Ch = 1`: waves travel exactly one cell per tick.
    pub const REFERENCE_1D: Self = Self::from_courant_number(1.0);

    pub const fn from_courant_number(courant: f64) -> Self {
        Self {
            vacuum: courant,
            magnetic: courant,
        }
    }

    /// Courant number in vacuum, i.e. cells travelled per tick along an axis.
    pub fn courant_number(&self) -> f64 {
        (self.vacuum * self.magnetic).sqrt()
    }

    /// E update gain inside `material`.
    pub fn electric(&self, material: &Material) -> f64 {
        self.vacuum / material.relative_permittivity
    }

    /// Checks the coefficients against the Courant stability limit of a grid
    /// with `dimensions` spatial dimensions.
    ///
    /// Materials can only lower the E gain (see [`check_material`]), so the
    /// vacuum coefficient bounds the whole grid.
    pub fn check(&self, dimensions: usize) -> Result<(), ConfigurationError> {
        for (name, value) in [("vacuum", self.vacuum), ("magnetic", self.magnetic)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigurationError::InvalidCoefficient { name, value });
            }
        }

        let courant = self.courant_number();
        let limit = stability_limit(dimensions);
        if courant > limit * (1.0 + 1e-12) {
            return Err(ConfigurationError::Unstable {
                courant,
                limit,
                dimensions,
            });
        }

        Ok(())
    }
}

impl Default for Coefficients {
    fn default() -> Self {
        Self::REFERENCE_2D
    }
}

/// Largest stable Courant number for a uniform grid: `1 / sqrt(D)`.
pub fn stability_limit(dimensions: usize) -> f64 {
    1.0 / (dimensions.max(1) as f64).sqrt()
}

pub fn check_material(material: &Material) -> Result<(), ConfigurationError> {
    let value = material.relative_permittivity;
    if value.is_finite() && value >= 1.0 {
        Ok(())
    }
    else {
        Err(ConfigurationError::InvalidPermittivity { value })
    }
}

/// Builds the per-cell E gain `Cb`.
///
/// Regions are applied in order, later regions overwrite earlier ones. The
/// regions are expected to have passed
/// [`SimulationConfig::check`](crate::config::SimulationConfig::check); cells
/// outside the lattice are skipped.
pub fn coefficient_map(
    size: Vector2<usize>,
    coefficients: &Coefficients,
    regions: &[MaterialRegion],
) -> Lattice<f64> {
    let mut cb = Lattice::from_element(size, coefficients.vacuum);

    for region in regions {
        let value = coefficients.electric(&region.material);
        let strider = *cb.strider();
        for point in region.shape.rasterize(&strider) {
            if let Some(cell) = cb.get_mut(&point) {
                *cell = value;
            }
        }
    }

    cb
}
