use std::ops::Range;

/// Defines how a single update pass iterates over the rows of a field.
///
/// Every pass is finished before the next one starts, so a multi-threaded
/// pass never sees a partially updated field from another pass.
pub trait LatticeForEach: Send + Sync + 'static {
    /// Calls `f(y, row)` for every row `y` in `rows` of `data` and sums the
    /// returned values.
    fn for_each_row<F>(&self, data: &mut [f64], width: usize, rows: Range<usize>, f: F) -> f64
    where
        F: Fn(usize, &mut [f64]) -> f64 + Send + Sync;
}

/// Use single-threading
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleThreaded;

impl LatticeForEach for SingleThreaded {
    fn for_each_row<F>(&self, data: &mut [f64], width: usize, rows: Range<usize>, f: F) -> f64
    where
        F: Fn(usize, &mut [f64]) -> f64 + Send + Sync,
    {
        let y0 = rows.start;
        data[rows.start * width..rows.end * width]
            .chunks_mut(width)
            .enumerate()
            .map(|(i, row)| f(y0 + i, row))
            .sum()
    }
}

/// Use multi-threading
#[cfg(feature = "rayon")]
#[derive(Clone, Debug)]
pub struct MultiThreaded {
    thread_pool: Option<std::sync::Arc<rayon::ThreadPool>>,
}

#[cfg(feature = "rayon")]
impl LatticeForEach for MultiThreaded {
    fn for_each_row<F>(&self, data: &mut [f64], width: usize, rows: Range<usize>, f: F) -> f64
    where
        F: Fn(usize, &mut [f64]) -> f64 + Send + Sync,
    {
        use rayon::{
            iter::{
                IndexedParallelIterator as _,
                ParallelIterator as _,
            },
            slice::ParallelSliceMut as _,
        };

        let y0 = rows.start;
        let data = &mut data[rows.start * width..rows.end * width];
        let mut run = || {
            data.par_chunks_mut(width)
                .enumerate()
                .map(|(i, row)| f(y0 + i, row))
                .sum::<f64>()
        };

        if let Some(thread_pool) = &self.thread_pool {
            thread_pool.install(run)
        }
        else {
            run()
        }
    }
}

#[cfg(feature = "rayon")]
impl MultiThreaded {
    /// Use default number of threads (see [`rayon::current_num_threads`])
    pub fn from_default_thread_pool() -> Self {
        Self { thread_pool: None }
    }

    pub fn from_num_threads(num_threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        Ok(Self::from_thread_pool(
            rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build()?,
        ))
    }

    pub fn from_thread_pool(thread_pool: rayon::ThreadPool) -> Self {
        Self {
            thread_pool: Some(std::sync::Arc::new(thread_pool)),
        }
    }

    pub fn num_threads(&self) -> usize {
        self.thread_pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, |thread_pool| {
                thread_pool.current_num_threads()
            })
    }
}

#[cfg(feature = "rayon")]
impl Default for MultiThreaded {
    fn default() -> Self {
        Self::from_default_thread_pool()
    }
}
