use std::path::PathBuf;

use clap::{
    Parser,
    Subcommand,
};
use color_eyre::eyre::Error;
use dotenvy::dotenv;
use fdtd_wave::{
    config::{
        Config,
        Preset,
    },
    fdtd::{
        LatticeForEach,
        Simulation,
    },
    output::{
        ColorMap,
        FrameExporter,
        FrameFormat,
    },
    runner::Runner,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Error> {
    let _ = dotenv();
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match args.command {
        Command::Run(args) => args.run()?,
        Command::DumpConfig { preset, output } => {
            let config = toml::to_string_pretty(&Config::from_preset(preset))?;
            if let Some(output) = &output {
                std::fs::write(output, &config)?;
            }
            else {
                println!("{config}");
            }
        }
    }

    Ok(())
}

#[derive(Debug, Parser)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a simulation and export frames.
    Run(RunArgs),

    /// Print the config of a preset, as a starting point for a config file.
    DumpConfig {
        #[clap(long, value_enum, default_value = "reference-2d")]
        preset: Preset,

        #[clap(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// TOML config file.
    #[clap(short, long, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Built-in setup to run if no config file is given.
    #[clap(short, long, value_enum)]
    preset: Option<Preset>,

    /// Overrides the number of ticks.
    #[clap(long)]
    ticks: Option<usize>,

    /// Output directory.
    #[clap(short, long)]
    output: Option<PathBuf>,

    #[clap(long, value_enum)]
    format: Option<FrameFormat>,

    /// Export every n-th tick.
    #[clap(long)]
    every: Option<usize>,

    #[clap(long, value_enum)]
    color_map: Option<ColorMap>,

    /// Field values are multiplied by this before they're mapped to colors.
    #[clap(long)]
    amplification: Option<f64>,

    /// Don't outline material regions.
    #[clap(long)]
    no_overlay: bool,

    /// Log progress every n ticks.
    #[clap(long, default_value = "100")]
    progress: usize,

    /// Number of worker threads. Uses all cores if not set.
    #[cfg(feature = "rayon")]
    #[clap(long)]
    threads: Option<usize>,

    /// Step on the calling thread only.
    #[cfg(feature = "rayon")]
    #[clap(long, conflicts_with = "threads")]
    single_threaded: bool,
}

impl RunArgs {
    fn config(&self) -> Result<Config, Error> {
        let mut config = if let Some(path) = &self.config {
            Config::from_path(path)?
        }
        else {
            Config::from_preset(self.preset.unwrap_or(Preset::Reference2d))
        };

        if let Some(ticks) = self.ticks {
            config.simulation.ticks = ticks;
        }

        let output = &mut config.output;
        if let Some(directory) = &self.output {
            output.directory = directory.clone();
        }
        if let Some(format) = self.format {
            output.format = format;
        }
        if let Some(every) = self.every {
            output.every = every;
        }
        if let Some(color_map) = self.color_map {
            output.color_map = color_map;
        }
        if let Some(amplification) = self.amplification {
            output.amplification = amplification;
        }
        if self.no_overlay {
            output.overlay_materials = false;
        }

        Ok(config)
    }

    fn run(self) -> Result<(), Error> {
        let config = self.config()?;

        #[cfg(feature = "rayon")]
        {
            use fdtd_wave::fdtd::threading::MultiThreaded;

            if !self.single_threaded {
                let threading = match self.threads {
                    Some(num_threads) => MultiThreaded::from_num_threads(num_threads)?,
                    None => MultiThreaded::from_default_thread_pool(),
                };
                tracing::debug!(threads = threading.num_threads(), "multi-threaded");
                let simulation = Simulation::with_threading(&config.simulation, threading)?;
                return run(simulation, &config, self.progress);
            }
        }

        let simulation = Simulation::new(&config.simulation)?;
        run(simulation, &config, self.progress)
    }
}

fn run<Threading>(
    simulation: Simulation<Threading>,
    config: &Config,
    progress: usize,
) -> Result<(), Error>
where
    Threading: LatticeForEach,
{
    let mut exporter = FrameExporter::new(&config.output, simulation.size())?;
    let mut runner =
        Runner::new(simulation, config.simulation.ticks).with_progress_interval(progress);

    runner.run(&mut exporter)?;
    exporter.finish()?;

    Ok(())
}
