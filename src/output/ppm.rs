use std::io::Write;

use image::RgbaImage;
use nalgebra::Vector2;

use crate::output::WriteImage;

/// Binary PPM (`P6`) writer for a single frame.
///
/// The header is `P6\n<width> <height>\n255\n`, followed by the RGB bytes of
/// all pixels, row by row from the top. Alpha is dropped.
#[derive(Debug)]
pub struct PpmOutput<W> {
    writer: W,
    size: Vector2<u32>,
}

impl<W> PpmOutput<W>
where
    W: Write,
{
    pub fn new(writer: W, size: Vector2<u32>) -> Self {
        Self { writer, size }
    }

    /// Flushes and returns the writer.
    pub fn finish(mut self) -> Result<W, std::io::Error> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W> WriteImage for PpmOutput<W>
where
    W: Write,
{
    type Error = std::io::Error;

    fn size(&self) -> Vector2<u32> {
        self.size
    }

    fn write_image(&mut self, mut f: impl FnMut(&mut RgbaImage)) -> Result<(), Self::Error> {
        let mut image = RgbaImage::new(self.size.x, self.size.y);
        f(&mut image);

        write!(self.writer, "P6\n{} {}\n255\n", self.size.x, self.size.y)?;
        for pixel in image.pixels() {
            self.writer.write_all(&pixel.0[..3])?;
        }

        Ok(())
    }
}
