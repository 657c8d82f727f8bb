use std::{
    convert::Infallible,
    time::{
        Duration,
        Instant,
    },
};

use crate::{
    error::RunError,
    fdtd::{
        simulation::Simulation,
        threading::{
            LatticeForEach,
            SingleThreaded,
        },
    },
    lattice::Lattice,
    material::MaterialRegion,
};

/// Read-only view of the simulation after a tick.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    /// The tick that produced this frame, starting at 0.
    pub tick: usize,
    pub ez: &'a Lattice<f64>,
    pub materials: &'a [MaterialRegion],
    pub energy: f64,
}

impl<'a> Frame<'a> {
    pub fn new<Threading>(tick: usize, simulation: &'a Simulation<Threading>) -> Self
    where
        Threading: LatticeForEach,
    {
        Self {
            tick,
            ez: simulation.ez(),
            materials: simulation.materials(),
            energy: simulation.energy(),
        }
    }
}

/// Receives a frame after every tick.
pub trait Observer {
    type Error: std::error::Error + 'static;

    fn observe(&mut self, frame: &Frame) -> Result<(), Self::Error>;
}

impl Observer for () {
    type Error = Infallible;

    fn observe(&mut self, _frame: &Frame) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RunSummary {
    pub ticks: usize,
    pub elapsed: Duration,
    pub energy: f64,
}

/// Drives a simulation for a fixed number of ticks.
#[derive(Debug)]
pub struct Runner<Threading = SingleThreaded> {
    simulation: Simulation<Threading>,
    ticks: usize,
    progress_interval: usize,
}

impl<Threading> Runner<Threading>
where
    Threading: LatticeForEach,
{
    pub fn new(simulation: Simulation<Threading>, ticks: usize) -> Self {
        Self {
            simulation,
            ticks,
            progress_interval: 100,
        }
    }

    /// Log progress every `interval` ticks. 0 disables progress logging.
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn simulation(&self) -> &Simulation<Threading> {
        &self.simulation
    }

    pub fn into_simulation(self) -> Simulation<Threading> {
        self.simulation
    }

    /// Runs the remaining ticks, calling `observer` after each one.
    ///
    /// Every tick injects the sources, then updates the fields. An observer
    /// error stops the run after the failing tick, the simulation stays
    /// consistent and can be resumed.
    pub fn run<O>(&mut self, observer: &mut O) -> Result<RunSummary, RunError<O::Error>>
    where
        O: Observer,
    {
        let start = self.simulation.tick();
        let time_start = Instant::now();

        tracing::info!(start, ticks = self.ticks, "running simulation");

        for tick in start..self.ticks {
            self.simulation.advance();

            observer
                .observe(&Frame::new(tick, &self.simulation))
                .map_err(|error| RunError { tick, error })?;

            let done = tick + 1;
            if self.progress_interval > 0 && done % self.progress_interval == 0 {
                tracing::info!(
                    tick = done,
                    ticks = self.ticks,
                    energy = self.simulation.energy(),
                    "progress"
                );
            }
        }

        let summary = RunSummary {
            ticks: self.simulation.tick() - start,
            elapsed: time_start.elapsed(),
            energy: self.simulation.energy(),
        };

        tracing::info!(
            ticks = summary.ticks,
            elapsed = ?summary.elapsed,
            energy = summary.energy,
            "simulation finished"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::SimulationConfig,
        fdtd::simulation::Simulation,
        runner::{
            Frame,
            Observer,
            Runner,
        },
    };

    #[derive(Debug, thiserror::Error)]
    #[error("observer gave up")]
    struct GiveUp;

    #[derive(Debug, Default)]
    struct Recorder {
        ticks: Vec<usize>,
        fail_at: Option<usize>,
    }

    impl Observer for Recorder {
        type Error = GiveUp;

        fn observe(&mut self, frame: &Frame) -> Result<(), Self::Error> {
            if self.fail_at == Some(frame.tick) {
                return Err(GiveUp);
            }
            self.ticks.push(frame.tick);
            Ok(())
        }
    }

    fn runner(ticks: usize) -> Runner {
        let simulation = Simulation::new(&SimulationConfig::reference_1d()).unwrap();
        Runner::new(simulation, ticks).with_progress_interval(0)
    }

    #[test]
    fn observes_every_tick() {
        let mut runner = runner(12);
        let mut recorder = Recorder::default();
        let summary = runner.run(&mut recorder).unwrap();

        assert_eq!(recorder.ticks, (0..12).collect::<Vec<_>>());
        assert_eq!(summary.ticks, 12);
        assert_eq!(runner.simulation().tick(), 12);
    }

    #[test]
    fn observer_errors_stop_the_run() {
        let mut runner = runner(50);
        let mut recorder = Recorder {
            fail_at: Some(7),
            ..Default::default()
        };

        let error = runner.run(&mut recorder).unwrap_err();
        assert_eq!(error.tick, 7);
        assert_eq!(recorder.ticks, (0..7).collect::<Vec<_>>());
        assert_eq!(runner.simulation().tick(), 8);

        // resumes where it stopped
        recorder.fail_at = None;
        let summary = runner.run(&mut recorder).unwrap();
        assert_eq!(summary.ticks, 42);
        assert_eq!(recorder.ticks, (0..50).filter(|t| *t != 7).collect::<Vec<_>>());
    }

    #[test]
    fn runs_match_manual_stepping() {
        let config = SimulationConfig::reference_1d();
        let mut runner = runner(30);
        runner.run(&mut ()).unwrap();

        let mut simulation = Simulation::new(&config).unwrap();
        for _ in 0..30 {
            simulation.advance();
        }
        assert_eq!(runner.simulation().ez().as_slice(), simulation.ez().as_slice());
    }
}
