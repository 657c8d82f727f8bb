//! Normalized 2D TMz leapfrog solver.
//!
//! Fields live on a row-major grid. `Ez` is sampled at integer cells, `Hx` and
//! `Hy` half a cell further along y and x. A grid with height 1 is a 1D line,
//! for which `Hx` stays zero.

pub mod boundary;
pub mod coefficients;
pub mod loss;
pub mod simulation;
pub mod source;
pub mod threading;

pub use self::{
    boundary::Boundary,
    coefficients::Coefficients,
    loss::LossLayer,
    simulation::Simulation,
    source::{
        AnyWaveform,
        ContinuousWave,
        GaussianPulse,
        Injection,
        Source,
        Waveform,
    },
    threading::{
        LatticeForEach,
        SingleThreaded,
    },
};
