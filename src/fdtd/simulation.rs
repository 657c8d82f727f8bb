use nalgebra::{
    Point2,
    Vector2,
};

use crate::{
    config::SimulationConfig,
    error::ConfigurationError,
    fdtd::{
        boundary::BoundaryState,
        coefficients::{
            Coefficients,
            coefficient_map,
        },
        source::Source,
        threading::{
            LatticeForEach,
            SingleThreaded,
        },
    },
    lattice::Lattice,
    material::MaterialRegion,
    util::format_size,
};

#[derive(derive_more::Debug)]
pub struct Simulation<Threading = SingleThreaded> {
    coefficients: Coefficients,

    tick: usize,
    energy: f64,

    /// `Ez`, at integer cells.
    #[debug(ignore)]
    ez: Lattice<f64>,

    /// `Hx`, offset by half a cell along y.
    #[debug(ignore)]
    hx: Lattice<f64>,

    /// `Hy`, offset by half a cell along x.
    #[debug(ignore)]
    hy: Lattice<f64>,

    /// Per-cell E gain.
    #[debug(ignore)]
    cb: Lattice<f64>,

    #[debug(ignore)]
    boundary: BoundaryState,

    sources: Vec<Source>,
    materials: Vec<MaterialRegion>,

    #[debug(ignore)]
    threading: Threading,
}

impl Simulation {
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigurationError> {
        Self::with_threading(config, SingleThreaded)
    }
}

impl<Threading> Simulation<Threading>
where
    Threading: LatticeForEach,
{
    pub fn with_threading(
        config: &SimulationConfig,
        threading: Threading,
    ) -> Result<Self, ConfigurationError> {
        config.check()?;

        let size = config.grid.size();
        let cb = coefficient_map(size, &config.coefficients, &config.materials);

        tracing::debug!(
            width = size.x,
            height = size.y,
            courant = config.coefficients.courant_number(),
            materials = config.materials.len(),
            sources = config.sources.len(),
            memory_usage = %format_size(config.grid.memory_usage_estimate()),
            "creating simulation"
        );

        Ok(Self {
            coefficients: config.coefficients,
            tick: 0,
            energy: 0.0,
            ez: Lattice::from_element(size, 0.0),
            hx: Lattice::from_element(size, 0.0),
            hy: Lattice::from_element(size, 0.0),
            cb,
            boundary: BoundaryState::new(&config.boundary, size),
            sources: config.sources.clone(),
            materials: config.materials.clone(),
            threading,
        })
    }

    /// Zeroes all fields and rewinds to tick 0. Materials and sources are
    /// kept.
    pub fn reset(&mut self) {
        self.tick = 0;
        self.energy = 0.0;
        self.ez.fill(0.0);
        self.hx.fill(0.0);
        self.hy.fill(0.0);
        self.boundary.reset();
    }

    /// Applies all sources for the current tick.
    ///
    /// This is called before [`Self::step`], so a hard source sets the value
    /// the E update then builds on.
    pub fn inject(&mut self) {
        for source in &self.sources {
            source.inject(self.tick, &mut self.ez);
        }
    }

    /// Injects sources and advances one tick.
    pub fn advance(&mut self) {
        self.inject();
        self.step();
    }

    /// Advances the fields by one tick: H from `Ez`, then `Ez` from the new H.
    ///
    /// Edge cells of `Ez` are never updated by the interior equation. They stay
    /// zero, or are written by the replay boundary.
    pub fn step(&mut self) {
        let width = self.ez.width();
        let height = self.ez.height();
        let is_line = height == 1;
        let ch = self.coefficients.magnetic;

        // H passes. Each row sums `H_old * H_new`, which is the magnetic part
        // of the discrete energy at the time `Ez` currently holds.
        let ez = self.ez.as_slice();
        let mut magnetic = 0.0;

        if !is_line {
            magnetic += self.threading.for_each_row(
                self.hx.as_mut_slice(),
                width,
                0..height - 1,
                |y, hx| {
                    let ez0 = &ez[y * width..(y + 1) * width];
                    let ez1 = &ez[(y + 1) * width..(y + 2) * width];
                    let mut energy = 0.0;
                    for x in 0..width {
                        let old = hx[x];
                        hx[x] = old - ch * (ez1[x] - ez0[x]);
                        energy += old * hx[x];
                    }
                    energy
                },
            );
        }

        magnetic += self.threading.for_each_row(
            self.hy.as_mut_slice(),
            width,
            0..height,
            |y, hy| {
                let ez = &ez[y * width..(y + 1) * width];
                let mut energy = 0.0;
                for x in 0..width - 1 {
                    let old = hy[x];
                    hy[x] = old + ch * (ez[x + 1] - ez[x]);
                    energy += old * hy[x];
                }
                energy
            },
        );

        if let BoundaryState::Replay(buffers) = &self.boundary {
            buffers.apply(self.ez.as_mut_slice());
        }

        // E pass over the interior.
        let hx = self.hx.as_slice();
        let hy = self.hy.as_slice();
        let cb = self.cb.as_slice();
        let loss = self.boundary.loss().map(|loss| loss.as_slice());
        let rows = if is_line { 0..1 } else { 1..height - 1 };

        let electric = self
            .threading
            .for_each_row(self.ez.as_mut_slice(), width, rows, |y, ez| {
                let row = y * width;
                let mut energy = 0.0;
                for x in 1..width - 1 {
                    let i = row + x;
                    let mut curl = hy[i] - hy[i - 1];
                    if !is_line {
                        curl -= hx[i] - hx[i - width];
                    }

                    let old = ez[x];
                    let loss = loss.map_or(0.0, |loss| loss[i]);
                    ez[x] = if loss > 0.0 {
                        old * (1.0 - loss) + cb[i] * curl
                    }
                    else {
                        old + cb[i] * curl
                    };

                    energy += old * old * (2.0 - loss) / (2.0 * cb[i]);
                }
                energy
            });

        if let BoundaryState::Replay(buffers) = &mut self.boundary {
            buffers.capture(self.ez.as_slice());
        }

        self.tick += 1;
        self.energy = electric + magnetic / ch;
    }

    pub fn tick(&self) -> usize {
        self.tick
    }

    pub fn size(&self) -> Vector2<usize> {
        self.ez.size()
    }

    pub fn is_line(&self) -> bool {
        self.ez.height() == 1
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    pub fn ez(&self) -> &Lattice<f64> {
        &self.ez
    }

    pub fn hx(&self) -> &Lattice<f64> {
        &self.hx
    }

    pub fn hy(&self) -> &Lattice<f64> {
        &self.hy
    }

    /// Per-cell E gain `Cb`.
    pub fn coefficient_map(&self) -> &Lattice<f64> {
        &self.cb
    }

    /// Per-cell loss, if the grid has a graded loss layer.
    pub fn loss_map(&self) -> Option<&Lattice<f64>> {
        self.boundary.loss()
    }

    pub fn materials(&self) -> &[MaterialRegion] {
        &self.materials
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn threading(&self) -> &Threading {
        &self.threading
    }

    /// Discrete energy of the leapfrog scheme at the start of the last step.
    ///
    /// ```text
    /// W = sum(Ez^2 * (2 - loss) / (2 * Cb)) + sum(H_old * H_new) / Ch
    /// ```
    ///
    /// The E sum runs over interior cells with `Ez` as it was after injection,
    /// the H sums over the half steps around it. Without sources and loss this
    /// is constant up to rounding, and with loss it never increases. The plain
    /// sum of squares oscillates from step to step, since E and H are sampled
    /// half a tick apart.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// `sum(Ez^2)` over the whole grid.
    pub fn electric_energy(&self) -> f64 {
        self.ez.as_slice().iter().map(|ez| ez * ez).sum()
    }

    /// `sum(Ez^2 + Hx^2 + Hy^2)` of the current fields.
    pub fn field_energy(&self) -> f64 {
        let magnetic = self
            .hx
            .as_slice()
            .iter()
            .chain(self.hy.as_slice())
            .map(|h| h * h)
            .sum::<f64>();
        self.electric_energy() + magnetic
    }

    /// Value of `Ez` at a cell.
    pub fn probe(&self, point: &Point2<usize>) -> Option<f64> {
        self.ez.get(point).copied()
    }
}
