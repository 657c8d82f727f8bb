use std::path::PathBuf;

use nalgebra::Point2;

/// A simulation configuration that can't be run.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("grid must be at least 3 cells wide and either 1 or at least 3 cells high, got {width}x{height}")]
    InvalidGridSize { width: usize, height: usize },

    #[error("{name} coefficient must be finite and positive, got {value}")]
    InvalidCoefficient { name: &'static str, value: f64 },

    #[error("courant number {courant} exceeds the stability limit {limit} of a {dimensions}D grid")]
    Unstable {
        courant: f64,
        limit: f64,
        dimensions: usize,
    },

    #[error("relative permittivity must be finite and at least 1, got {value}")]
    InvalidPermittivity { value: f64 },

    #[error("material region {index} lies outside the grid")]
    RegionOutsideGrid { index: usize },

    #[error("source {index} at {position} lies outside the grid")]
    SourceOutsideGrid {
        index: usize,
        position: Point2<usize>,
    },

    #[error("invalid waveform for source {index}: {reason}")]
    InvalidWaveform { index: usize, reason: &'static str },

    #[error("maximum loss must be in [0, 1), got {value}")]
    InvalidLoss { value: f64 },

    #[error("loss layer margin and grading order must be non-zero")]
    InvalidLossLayer,

    #[error("the replay boundary only works on 1D grids, got height {height}")]
    ReplayBoundaryRequiresLine { height: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum LoadConfigError {
    #[error("could not read config file: {path}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("could not parse config file: {path}")]
    Toml {
        path: PathBuf,
        #[source]
        error: toml::de::Error,
    },

    #[error("invalid configuration in {path}")]
    Invalid {
        path: PathBuf,
        #[source]
        error: ConfigurationError,
    },
}

/// Errors from writing rendered frames.
///
/// These never leave the simulation in an inconsistent state: a frame is only
/// rendered from an immutable view of the field.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("io error")]
    Io(#[from] std::io::Error),

    #[error("image error")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, thiserror::Error)]
#[error("observer failed at tick {tick}")]
pub struct RunError<E>
where
    E: std::error::Error + 'static,
{
    pub tick: usize,
    #[source]
    pub error: E,
}
