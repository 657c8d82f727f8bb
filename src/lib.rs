//! Finite-difference time-domain simulation of electromagnetic waves on 1D
//! and 2D grids.

pub mod config;
pub mod error;
pub mod fdtd;
pub mod lattice;
pub mod material;
pub mod output;
pub mod runner;
pub mod util;
