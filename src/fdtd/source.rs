use std::f64::consts::TAU;

use nalgebra::Point2;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    error::ConfigurationError,
    lattice::{
        Lattice,
        Strider,
    },
};

/// Time dependence of a source, sampled once per tick.
pub trait Waveform {
    fn value(&self, tick: f64) -> f64;
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaussianPulse {
    /// Tick of the pulse maximum (`t0`).
    pub delay: f64,

    /// Standard deviation in ticks (`sigma`).
    pub width: f64,

    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
}

impl GaussianPulse {
    pub fn new(delay: f64, width: f64) -> Self {
        Self {
            delay,
            width,
            amplitude: 1.0,
        }
    }
}

impl Waveform for GaussianPulse {
    fn value(&self, tick: f64) -> f64 {
        self.amplitude * (-0.5 * ((tick - self.delay) / self.width).powi(2)).exp()
    }
}

/// Sinusoid that is ramped up linearly over the first `ramp` ticks.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContinuousWave {
    /// Period in ticks.
    pub period: f64,

    #[serde(default = "default_amplitude")]
    pub amplitude: f64,

    #[serde(default)]
    pub ramp: f64,
}

impl Waveform for ContinuousWave {
    fn value(&self, tick: f64) -> f64 {
        let envelope = if self.ramp > 0.0 {
            (tick / self.ramp).clamp(0.0, 1.0)
        }
        else {
            1.0
        };
        envelope * self.amplitude * (TAU * tick / self.period).sin()
    }
}

fn default_amplitude() -> f64 {
    1.0
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnyWaveform {
    GaussianPulse(GaussianPulse),
    ContinuousWave(ContinuousWave),
}

impl AnyWaveform {
    fn check(&self) -> Result<(), &'static str> {
        match self {
            AnyWaveform::GaussianPulse(pulse) => {
                if !(pulse.width.is_finite() && pulse.width > 0.0) {
                    return Err("pulse width must be positive");
                }
                if !(pulse.delay.is_finite() && pulse.amplitude.is_finite()) {
                    return Err("pulse delay and amplitude must be finite");
                }
            }
            AnyWaveform::ContinuousWave(wave) => {
                if !(wave.period.is_finite() && wave.period > 0.0) {
                    return Err("period must be positive");
                }
                if !(wave.ramp.is_finite() && wave.ramp >= 0.0 && wave.amplitude.is_finite()) {
                    return Err("ramp must be non-negative and amplitude finite");
                }
            }
        }
        Ok(())
    }
}

impl Waveform for AnyWaveform {
    fn value(&self, tick: f64) -> f64 {
        match self {
            AnyWaveform::GaussianPulse(gaussian_pulse) => gaussian_pulse.value(tick),
            AnyWaveform::ContinuousWave(continuous_wave) => continuous_wave.value(tick),
        }
    }
}

impl From<GaussianPulse> for AnyWaveform {
    fn from(value: GaussianPulse) -> Self {
        Self::GaussianPulse(value)
    }
}

impl From<ContinuousWave> for AnyWaveform {
    fn from(value: ContinuousWave) -> Self {
        Self::ContinuousWave(value)
    }
}

/// How the waveform is applied to `Ez`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Injection {
    /// Added to the field. Waves pass through the source cell.
    #[default]
    Soft,

    /// Overwrites the field. The source cell reflects like a conductor while
    /// it is active.
    Hard,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub position: Point2<usize>,

    pub waveform: AnyWaveform,

    #[serde(default)]
    pub injection: Injection,

    /// The source is only active for ticks below this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff: Option<usize>,
}

impl Source {
    pub fn soft(position: Point2<usize>, waveform: impl Into<AnyWaveform>) -> Self {
        Self {
            position,
            waveform: waveform.into(),
            injection: Injection::Soft,
            cutoff: None,
        }
    }

    pub fn hard(position: Point2<usize>, waveform: impl Into<AnyWaveform>) -> Self {
        Self {
            position,
            waveform: waveform.into(),
            injection: Injection::Hard,
            cutoff: None,
        }
    }

    pub fn with_cutoff(mut self, cutoff: usize) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    pub fn is_active(&self, tick: usize) -> bool {
        self.cutoff.is_none_or(|cutoff| tick < cutoff)
    }

    pub fn check(&self, index: usize, strider: &Strider) -> Result<(), ConfigurationError> {
        if !strider.is_inside(&self.position) {
            return Err(ConfigurationError::SourceOutsideGrid {
                index,
                position: self.position,
            });
        }
        self.waveform
            .check()
            .map_err(|reason| ConfigurationError::InvalidWaveform { index, reason })
    }

    /// Applies the source for `tick`.
    ///
    /// The position was checked at construction; a source outside the field is
    /// ignored.
    pub fn inject(&self, tick: usize, ez: &mut Lattice<f64>) {
        if !self.is_active(tick) {
            return;
        }

        let value = self.waveform.value(tick as f64);
        if let Some(cell) = ez.get_mut(&self.position) {
            match self.injection {
                Injection::Soft => *cell += value,
                Injection::Hard => *cell = value,
            }
        }
    }
}
