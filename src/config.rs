use std::path::{
    Path,
    PathBuf,
};

use nalgebra::{
    Point2,
    Vector2,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    error::{
        ConfigurationError,
        LoadConfigError,
    },
    fdtd::{
        boundary::Boundary,
        coefficients::{
            Coefficients,
            check_material,
        },
        loss::LossLayer,
        source::{
            GaussianPulse,
            Source,
        },
    },
    lattice::Strider,
    material::{
        Material,
        MaterialRegion,
        Shape,
    },
    output::OutputConfig,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub width: usize,
    pub height: usize,
}

impl GridSize {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// A 1D grid.
    pub fn line(width: usize) -> Self {
        Self::new(width, 1)
    }

    pub fn size(&self) -> Vector2<usize> {
        Vector2::new(self.width, self.height)
    }

    pub fn is_line(&self) -> bool {
        self.height == 1
    }

    /// Number of spatial dimensions a wave can travel in.
    pub fn dimensions(&self) -> usize {
        if self.is_line() { 1 } else { 2 }
    }

    pub fn center(&self) -> Point2<usize> {
        Point2::new(self.width / 2, self.height / 2)
    }

    pub fn check(&self) -> Result<(), ConfigurationError> {
        let valid = self.width >= 3 && (self.height == 1 || self.height >= 3);
        if valid {
            Ok(())
        }
        else {
            Err(ConfigurationError::InvalidGridSize {
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Bytes used by the field and coefficient arrays.
    pub fn memory_usage_estimate(&self) -> usize {
        // Ez, Hx, Hy, Cb and the optional loss map
        5 * size_of::<f64>() * self.width * self.height
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_ticks")]
    pub ticks: usize,

    pub grid: GridSize,

    #[serde(default)]
    pub coefficients: Coefficients,

    #[serde(default)]
    pub boundary: Boundary,

    /// Applied in order. Later regions overwrite earlier ones.
    #[serde(default)]
    pub materials: Vec<MaterialRegion>,

    #[serde(default)]
    pub sources: Vec<Source>,
}

fn default_ticks() -> usize {
    500
}

impl SimulationConfig {
    /// 200x200 plane with a glass slab and a pulse on its left.
    pub fn reference_2d() -> Self {
        let grid = GridSize::new(200, 200);
        Self {
            ticks: 500,
            grid,
            coefficients: Coefficients::REFERENCE_2D,
            boundary: Boundary::Fixed,
            materials: vec![MaterialRegion {
                shape: Shape::slab(100, 140, grid.height),
                material: Material::GLASS,
            }],
            sources: vec![Source::soft(
                Point2::new(50, 100),
                GaussianPulse::new(40.0, 10.0),
            )],
        }
    }

    /// Empty 200x200 plane with a pulse in the center.
    pub fn vacuum_2d() -> Self {
        let grid = GridSize::new(200, 200);
        Self {
            ticks: 300,
            grid,
            coefficients: Coefficients::REFERENCE_2D,
            boundary: Boundary::Fixed,
            materials: vec![],
            sources: vec![Source::soft(
                grid.center(),
                GaussianPulse::new(40.0, 10.0),
            )],
        }
    }

    /// Like [`Self::vacuum_2d`], but with a graded loss layer along the edges.
    pub fn absorbing_2d() -> Self {
        Self {
            boundary: Boundary::GradedLoss(LossLayer::REFERENCE),
            ..Self::vacuum_2d()
        }
    }

    /// 200 cell line at Courant number 1 with replaying edges and a short
    /// hard-sourced pulse in the middle.
    pub fn reference_1d() -> Self {
        let grid = GridSize::line(200);
        Self {
            ticks: 500,
            grid,
            coefficients: Coefficients::REFERENCE_1D,
            boundary: Boundary::Replay,
            materials: vec![],
            sources: vec![
                Source::hard(grid.center(), GaussianPulse::new(10.0, 3.0)).with_cutoff(20),
            ],
        }
    }

    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Reference2d => Self::reference_2d(),
            Preset::Vacuum2d => Self::vacuum_2d(),
            Preset::Absorbing2d => Self::absorbing_2d(),
            Preset::Reference1d => Self::reference_1d(),
        }
    }

    /// Validates everything a [`Simulation`](crate::fdtd::Simulation) needs.
    pub fn check(&self) -> Result<(), ConfigurationError> {
        self.grid.check()?;
        self.coefficients.check(self.grid.dimensions())?;

        let size = self.grid.size();
        self.boundary.check(&size, &self.coefficients)?;

        let strider = Strider::new(size);
        for (index, region) in self.materials.iter().enumerate() {
            check_material(&region.material)?;
            if !region.shape.fits(&strider) {
                return Err(ConfigurationError::RegionOutsideGrid { index });
            }
        }

        for (index, source) in self.sources.iter().enumerate() {
            source.check(index, &strider)?;
        }

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Preset {
    #[value(name = "reference-2d")]
    Reference2d,
    #[value(name = "vacuum-2d")]
    Vacuum2d,
    #[value(name = "absorbing-2d")]
    Absorbing2d,
    #[value(name = "reference-1d")]
    Reference1d,
}

/// Contents of a config file: the simulation and, optionally, an `[output]`
/// table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            simulation: SimulationConfig::from_preset(preset),
            output: Default::default(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadConfigError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading config");

        let toml = std::fs::read_to_string(path).map_err(|error| {
            LoadConfigError::Io {
                path: path.to_owned(),
                error,
            }
        })?;

        Self::from_toml(&toml, path)
    }

    fn from_toml(toml: &str, path: &Path) -> Result<Self, LoadConfigError> {
        let config: Self = toml::from_str(toml).map_err(|error| {
            LoadConfigError::Toml {
                path: PathBuf::from(path),
                error,
            }
        })?;

        config.simulation.check().map_err(|error| {
            LoadConfigError::Invalid {
                path: PathBuf::from(path),
                error,
            }
        })?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use nalgebra::Point2;

    use crate::{
        config::{
            Config,
            GridSize,
            Preset,
            SimulationConfig,
        },
        error::{
            ConfigurationError,
            LoadConfigError,
        },
        fdtd::{
            boundary::Boundary,
            coefficients::Coefficients,
            loss::LossLayer,
            source::{
                AnyWaveform,
                Injection,
            },
        },
        material::{
            Material,
            MaterialRegion,
            Shape,
        },
        output::FrameFormat,
    };

    #[test]
    fn presets_are_valid() {
        for preset in [
            Preset::Reference2d,
            Preset::Vacuum2d,
            Preset::Absorbing2d,
            Preset::Reference1d,
        ] {
            SimulationConfig::from_preset(preset).check().unwrap();
        }
    }

    #[test]
    fn reference_1d_is_a_courant_one_line() {
        let config = SimulationConfig::reference_1d();
        assert_eq!(config.grid.dimensions(), 1);
        assert_eq!(config.coefficients.courant_number(), 1.0);
        assert_eq!(config.sources[0].position, Point2::new(100, 0));
        assert_eq!(config.sources[0].injection, Injection::Hard);
        assert_eq!(config.sources[0].cutoff, Some(20));
    }

    #[test]
    fn presets_survive_toml() {
        for config in [
            SimulationConfig::reference_2d(),
            SimulationConfig::absorbing_2d(),
            SimulationConfig::reference_1d(),
        ] {
            let toml = toml::to_string(&config).unwrap();
            let parsed: SimulationConfig = toml::from_str(&toml).unwrap();
            assert_eq!(parsed, config);
        }
    }

    #[test]
    fn parses_a_handwritten_config() {
        let toml = r#"
            ticks = 120

            [grid]
            width = 80
            height = 60

            [boundary]
            type = "graded_loss"
            margin = 10
            max_loss = 0.05

            [[materials]]
            shape = { type = "disk", center = [40, 30], radius = 8 }
            material = { relative_permittivity = 2.25 }

            [[sources]]
            position = [20, 30]
            waveform = { type = "continuous_wave", period = 20, ramp = 40 }

            [output]
            format = "gif"
            every = 2
        "#;

        let config = Config::from_toml(toml, Path::new("test.toml")).unwrap();
        let simulation = &config.simulation;
        assert_eq!(simulation.ticks, 120);
        assert_eq!(simulation.grid, GridSize::new(80, 60));
        assert_eq!(simulation.coefficients, Coefficients::REFERENCE_2D);
        assert_eq!(
            simulation.boundary,
            Boundary::GradedLoss(LossLayer {
                margin: 10,
                max_loss: 0.05,
                order: 3,
            })
        );
        assert_eq!(
            simulation.materials[0].shape,
            Shape::Disk {
                center: Point2::new(40, 30),
                radius: 8.0,
            }
        );
        assert_eq!(simulation.materials[0].material.refractive_index(), 1.5);
        assert!(matches!(
            simulation.sources[0].waveform,
            AnyWaveform::ContinuousWave(wave) if wave.period == 20.0 && wave.amplitude == 1.0
        ));
        assert_eq!(simulation.sources[0].injection, Injection::Soft);
        assert_eq!(config.output.format, FrameFormat::Gif);
        assert_eq!(config.output.every, 2);
    }

    #[test]
    fn rejects_invalid_configs() {
        let toml = r#"
            [grid]
            width = 10
            height = 10

            [[sources]]
            position = [10, 3]
            waveform = { type = "gaussian_pulse", delay = 10, width = 3 }
        "#;
        let error = Config::from_toml(toml, Path::new("bad.toml")).unwrap_err();
        assert!(matches!(
            error,
            LoadConfigError::Invalid {
                error: ConfigurationError::SourceOutsideGrid { index: 0, .. },
                ..
            }
        ));

        let error = Config::from_toml("[grid]\nwidth = \"wide\"", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(error, LoadConfigError::Toml { .. }));

        let mut config = SimulationConfig::vacuum_2d();
        config.materials.push(MaterialRegion {
            shape: Shape::slab(10, 20, 200),
            material: Material {
                relative_permittivity: f64::NAN,
            },
        });
        assert!(matches!(
            config.check(),
            Err(ConfigurationError::InvalidPermittivity { .. })
        ));

        let mut config = SimulationConfig::vacuum_2d();
        config.materials.push(MaterialRegion {
            shape: Shape::slab(150, 220, 200),
            material: Material::GLASS,
        });
        assert!(matches!(
            config.check(),
            Err(ConfigurationError::RegionOutsideGrid { index: 0 })
        ));

        let mut config = SimulationConfig::vacuum_2d();
        config.boundary = Boundary::Replay;
        assert!(matches!(
            config.check(),
            Err(ConfigurationError::ReplayBoundaryRequiresLine { height: 200 })
        ));
    }

    #[test]
    fn missing_files_are_reported() {
        let error = Config::from_path("does/not/exist.toml").unwrap_err();
        assert!(matches!(error, LoadConfigError::Io { .. }));
    }

    #[test]
    fn grid_sizes() {
        assert!(GridSize::new(3, 1).check().is_ok());
        assert!(GridSize::new(3, 2).check().is_err());
        assert!(GridSize::new(2, 3).check().is_err());
        assert_eq!(GridSize::new(200, 200).center(), Point2::new(100, 100));
        assert_eq!(GridSize::line(200).center(), Point2::new(100, 0));
    }
}
