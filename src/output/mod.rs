//! Rendering of `Ez` frames to image files.

pub mod gif;
pub mod ppm;

use std::{
    fs::File,
    io::BufWriter,
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

use colorgrad::Gradient;
use image::RgbaImage;
use nalgebra::{
    Point2,
    Vector2,
};
use palette::Srgba;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    error::OutputError,
    lattice::Lattice,
    material::MaterialRegion,
    output::{
        gif::GifOutput,
        ppm::PpmOutput,
    },
    runner::{
        Frame,
        Observer,
    },
};

/// Rows a 1D frame is stretched to, so that it's visible as an image.
pub const LINE_HEIGHT: u32 = 32;

pub const GIF_FILE_NAME: &str = "fdtd_simulation.gif";

pub const GIF_FRAME_DELAY: Duration = Duration::from_millis(50);

pub const OUTLINE_COLOR: Srgba<u8> = Srgba::new(255, 255, 0, 255);

pub trait WriteImage {
    type Error;

    fn size(&self) -> Vector2<u32>;

    fn write_image(&mut self, f: impl FnMut(&mut RgbaImage)) -> Result<(), Self::Error>;

    fn write_colors(
        &mut self,
        mut color_at: impl FnMut(&Point2<u32>) -> Srgba<u8>,
    ) -> Result<(), Self::Error> {
        self.write_image(|image| {
            image.enumerate_pixels_mut().for_each(|(x, y, pixel)| {
                let color: [u8; 4] = color_at(&Point2::new(x, y)).into();
                *pixel = color.into();
            });
        })
    }
}

/// Maps field values to colors.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ColorMap {
    /// Red for positive, blue for negative values, fading to a dark tint at
    /// zero.
    #[default]
    Heat,

    /// Diverging red-white-blue gradient. Positive values are red.
    #[value(name = "rdbu")]
    RdBu,
}

impl ColorMap {
    /// Color of a field value that was already scaled and clamped to
    /// `[-1, 1]`.
    pub fn color(&self, value: f64) -> Srgba<u8> {
        self.palette().color(value)
    }

    /// Prepares the map for coloring many values.
    pub fn palette(&self) -> Palette {
        match self {
            ColorMap::Heat => Palette::Heat,
            ColorMap::RdBu => Palette::Table(sample_gradient(&colorgrad::preset::rd_bu())),
        }
    }
}

/// Number of colors sampled from a gradient.
const GRADIENT_SAMPLES: usize = 256;

#[derive(Clone, Debug)]
pub enum Palette {
    Heat,

    /// Colors for values from 1 down to -1.
    Table(Vec<Srgba<u8>>),
}

impl Palette {
    pub fn color(&self, value: f64) -> Srgba<u8> {
        match self {
            Palette::Heat => heat(value),
            Palette::Table(colors) => {
                let last = colors.len().saturating_sub(1);
                let index = (0.5 * (1.0 - value) * last as f64).round() as usize;
                colors
                    .get(index.min(last))
                    .copied()
                    .unwrap_or(Srgba::new(0, 0, 0, 255))
            }
        }
    }
}

fn heat(value: f64) -> Srgba<u8> {
    if value > 0.0 {
        Srgba::new((value * 255.0) as u8, 0, ((1.0 - value) * 20.0) as u8, 255)
    }
    else {
        let value = value.abs();
        Srgba::new(((1.0 - value) * 20.0) as u8, 0, (value * 255.0) as u8, 255)
    }
}

fn sample_gradient(gradient: &impl Gradient) -> Vec<Srgba<u8>> {
    (0..GRADIENT_SAMPLES)
        .map(|i| {
            let t = i as f32 / (GRADIENT_SAMPLES - 1) as f32;
            let color: Srgba = gradient.at(t).to_array().into();
            color.into_format::<u8, u8>()
        })
        .collect()
}

/// How a frame is turned into pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameStyle {
    pub color_map: ColorMap,

    /// Field values are multiplied by this before clamping to `[-1, 1]`.
    pub amplification: f64,

    pub overlay_materials: bool,
}

impl FrameStyle {
    pub fn value(&self, ez: f64) -> f64 {
        (ez * self.amplification).clamp(-1.0, 1.0)
    }

    pub fn image_size(&self, size: Vector2<usize>) -> Vector2<u32> {
        let height = if size.y == 1 { LINE_HEIGHT } else { size.y as u32 };
        Vector2::new(size.x as u32, height)
    }

    /// Renders `ez` into `output`, with region outlines on top.
    pub fn render<W>(
        &self,
        ez: &Lattice<f64>,
        materials: &[MaterialRegion],
        output: &mut W,
    ) -> Result<(), W::Error>
    where
        W: WriteImage,
    {
        let outline = if self.overlay_materials {
            material_outline(ez, materials)
        }
        else {
            Lattice::from_element(ez.size(), false)
        };

        let palette = self.color_map.palette();
        let is_line = ez.height() == 1;
        output.write_colors(|point| {
            let cell = if is_line {
                Point2::new(point.x as usize, 0)
            }
            else {
                point.cast()
            };

            if outline.get(&cell).copied().unwrap_or_default() {
                OUTLINE_COLOR
            }
            else {
                let value = ez.get(&cell).copied().unwrap_or_default();
                palette.color(self.value(value))
            }
        })
    }
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self {
            color_map: ColorMap::Heat,
            amplification: 10.0,
            overlay_materials: true,
        }
    }
}

fn material_outline(ez: &Lattice<f64>, materials: &[MaterialRegion]) -> Lattice<bool> {
    let mut outline = Lattice::from_element(ez.size(), false);
    let strider = *ez.strider();
    for region in materials {
        for point in region.outline(&strider) {
            if let Some(cell) = outline.get_mut(&point) {
                *cell = true;
            }
        }
    }
    outline
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum FrameFormat {
    /// One binary PPM file per frame.
    #[default]
    Ppm,

    /// One PNG file per frame.
    Png,

    /// A single looping animated GIF.
    Gif,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,

    pub format: FrameFormat,

    /// Export every n-th tick.
    pub every: usize,

    pub color_map: ColorMap,

    pub amplification: f64,

    pub overlay_materials: bool,
}

impl OutputConfig {
    pub fn style(&self) -> FrameStyle {
        FrameStyle {
            color_map: self.color_map,
            amplification: self.amplification,
            overlay_materials: self.overlay_materials,
        }
    }

    /// Whether the frame of `tick` is exported.
    pub fn exports(&self, tick: usize) -> bool {
        self.every > 0 && tick % self.every == 0
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        let style = FrameStyle::default();
        Self {
            directory: PathBuf::from("output"),
            format: FrameFormat::default(),
            every: 5,
            color_map: style.color_map,
            amplification: style.amplification,
            overlay_materials: style.overlay_materials,
        }
    }
}

/// PNG file for a single frame.
#[derive(Debug)]
pub struct PngOutput {
    path: PathBuf,
    size: Vector2<u32>,
}

impl PngOutput {
    pub fn new(path: impl Into<PathBuf>, size: Vector2<u32>) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

impl WriteImage for PngOutput {
    type Error = image::ImageError;

    fn size(&self) -> Vector2<u32> {
        self.size
    }

    fn write_image(&mut self, mut f: impl FnMut(&mut RgbaImage)) -> Result<(), Self::Error> {
        let mut image = RgbaImage::new(self.size.x, self.size.y);
        f(&mut image);
        image.save_with_format(&self.path, image::ImageFormat::Png)
    }
}

/// Writes every n-th frame of a run to the output directory.
#[derive(derive_more::Debug)]
pub struct FrameExporter {
    config: OutputConfig,
    style: FrameStyle,
    image_size: Vector2<u32>,
    #[debug(ignore)]
    gif: Option<GifOutput<BufWriter<File>>>,
    frames_written: usize,
}

impl FrameExporter {
    /// Creates the output directory and, for GIF output, the animation file.
    pub fn new(config: &OutputConfig, grid_size: Vector2<usize>) -> Result<Self, OutputError> {
        let style = config.style();
        let image_size = style.image_size(grid_size);

        std::fs::create_dir_all(&config.directory)?;

        let gif = match config.format {
            FrameFormat::Gif => {
                let path = config.directory.join(GIF_FILE_NAME);
                let writer = BufWriter::new(File::create(&path)?);
                Some(GifOutput::new(writer, image_size, GIF_FRAME_DELAY)?)
            }
            FrameFormat::Ppm | FrameFormat::Png => None,
        };

        tracing::info!(
            directory = %config.directory.display(),
            format = ?config.format,
            every = config.every,
            "exporting frames"
        );

        Ok(Self {
            config: config.clone(),
            style,
            image_size,
            gif,
            frames_written: 0,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Path of the file a frame at `tick` is written to.
    pub fn frame_path(&self, tick: usize) -> PathBuf {
        let directory = &self.config.directory;
        match self.config.format {
            FrameFormat::Ppm => directory.join(format!("sim_{tick}.ppm")),
            FrameFormat::Png => directory.join(format!("sim_{tick:04}.png")),
            FrameFormat::Gif => directory.join(GIF_FILE_NAME),
        }
    }

    pub fn export(&mut self, frame: &Frame) -> Result<(), OutputError> {
        if !self.config.exports(frame.tick) {
            return Ok(());
        }

        match self.config.format {
            FrameFormat::Ppm => {
                let file = File::create(self.frame_path(frame.tick))?;
                let mut output = PpmOutput::new(BufWriter::new(file), self.image_size);
                self.style.render(frame.ez, frame.materials, &mut output)?;
                output.finish()?;
            }
            FrameFormat::Png => {
                let mut output = PngOutput::new(self.frame_path(frame.tick), self.image_size);
                self.style.render(frame.ez, frame.materials, &mut output)?;
            }
            FrameFormat::Gif => {
                if let Some(gif) = &mut self.gif {
                    self.style.render(frame.ez, frame.materials, gif)?;
                }
            }
        }

        self.frames_written += 1;
        tracing::trace!(tick = frame.tick, "exported frame");

        Ok(())
    }

    /// Closes the animation, if any.
    pub fn finish(self) -> Result<(), OutputError> {
        if let Some(gif) = self.gif {
            gif.finish()?;
        }
        tracing::info!(frames = self.frames_written, "finished export");
        Ok(())
    }
}

impl Observer for FrameExporter {
    type Error = OutputError;

    fn observe(&mut self, frame: &Frame) -> Result<(), Self::Error> {
        self.export(frame)
    }
}
