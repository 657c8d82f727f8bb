use std::{
    cell::RefCell,
    io::{
        self,
        Write,
    },
    rc::Rc,
    time::Duration,
};

use image::{
    Delay,
    Frame,
    RgbaImage,
    codecs::gif::{
        GifEncoder,
        Repeat,
    },
};
use nalgebra::Vector2;

use crate::output::WriteImage;

/// Animated GIF. Every written image becomes one frame.
///
/// The encoder only writes the GIF trailer when it's dropped and swallows any
/// error doing so, so it writes through a shared handle that remembers the
/// first error. [`GifOutput::finish`] reports it, together with the final
/// flush.
#[derive(derive_more::Debug)]
pub struct GifOutput<W>
where
    W: Write,
{
    size: Vector2<u32>,
    #[debug("image::GifEncoder {{ ... }}")]
    gif_encoder: GifEncoder<SharedWriter<W>>,
    #[debug(ignore)]
    writer: Rc<RefCell<WriterState<W>>>,
    frame_delay: Delay,
    frames: usize,
}

impl<W> GifOutput<W>
where
    W: Write,
{
    pub fn new(
        writer: W,
        size: Vector2<u32>,
        frame_delay: Duration,
    ) -> Result<Self, image::ImageError> {
        let writer = Rc::new(RefCell::new(WriterState {
            writer,
            error: None,
        }));

        let mut gif_encoder = GifEncoder::new(SharedWriter {
            state: writer.clone(),
        });
        gif_encoder.set_repeat(Repeat::Infinite)?;

        Ok(Self {
            size,
            gif_encoder,
            writer,
            frame_delay: Delay::from_saturating_duration(frame_delay),
            frames: 0,
        })
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Writes the trailer and flushes the underlying writer.
    pub fn finish(self) -> Result<(), io::Error> {
        let Self {
            gif_encoder,
            writer,
            frames,
            ..
        } = self;

        drop(gif_encoder);

        let mut state = writer.borrow_mut();
        if let Some(error) = state.error.take() {
            return Err(error);
        }
        state.writer.flush()?;

        tracing::debug!(frames, "finished gif");
        Ok(())
    }
}

impl<W> WriteImage for GifOutput<W>
where
    W: Write,
{
    type Error = image::ImageError;

    fn size(&self) -> Vector2<u32> {
        self.size
    }

    fn write_image(&mut self, mut f: impl FnMut(&mut RgbaImage)) -> Result<(), Self::Error> {
        // unfortunately we have to allocate a new image buffer for each frame
        let mut image = RgbaImage::new(self.size.x, self.size.y);
        f(&mut image);
        self.gif_encoder
            .encode_frame(Frame::from_parts(image, 0, 0, self.frame_delay))?;
        self.frames += 1;
        Ok(())
    }
}

#[derive(Debug)]
struct WriterState<W> {
    writer: W,
    error: Option<io::Error>,
}

impl<W> WriterState<W> {
    fn record<T>(&mut self, result: io::Result<T>) -> io::Result<T> {
        if let Err(error) = &result {
            if error.kind() != io::ErrorKind::Interrupted && self.error.is_none() {
                self.error = Some(io::Error::new(error.kind(), error.to_string()));
            }
        }
        result
    }
}

/// Handle the encoder writes through.
#[derive(Debug)]
struct SharedWriter<W> {
    state: Rc<RefCell<WriterState<W>>>,
}

impl<W> Write for SharedWriter<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        let result = state.writer.write(buf);
        state.record(result)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        let result = state.writer.flush();
        state.record(result)
    }
}
