use std::ops::{
    Bound,
    Range,
    RangeBounds,
};

use nalgebra::{
    Point2,
    Vector2,
};

/// Row-major 2D storage.
///
/// A lattice with height 1 is used for 1D simulations.
#[derive(Clone, Debug)]
pub struct Lattice<T> {
    strider: Strider,
    data: Box<[T]>,
}

impl<T> Lattice<T> {
    pub fn new(size: Vector2<usize>, mut init: impl FnMut(Point2<usize>) -> T) -> Self {
        let strider = Strider::new(size);
        let data = strider.iter(..).map(|(_index, point)| init(point)).collect();
        Self { strider, data }
    }

    pub fn from_element(size: Vector2<usize>, value: T) -> Self
    where
        T: Clone,
    {
        let strider = Strider::new(size);
        let data = vec![value; strider.len()].into_boxed_slice();
        Self { strider, data }
    }

    pub fn strider(&self) -> &Strider {
        &self.strider
    }

    pub fn size(&self) -> Vector2<usize> {
        self.strider.size
    }

    pub fn width(&self) -> usize {
        self.strider.size.x
    }

    pub fn height(&self) -> usize {
        self.strider.size.y
    }

    pub fn get(&self, point: &Point2<usize>) -> Option<&T> {
        let index = self.strider.index(point)?;
        Some(&self.data[index])
    }

    pub fn get_mut(&mut self, point: &Point2<usize>) -> Option<&mut T> {
        let index = self.strider.index(point)?;
        Some(&mut self.data[index])
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Returns row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y` is outside the lattice.
    pub fn row(&self, y: usize) -> &[T] {
        let width = self.width();
        &self.data[y * width..(y + 1) * width]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Point2<usize>, &T)> {
        self.data
            .iter()
            .enumerate()
            .map(|(index, value)| (self.strider.point_unchecked(index), value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Point2<usize>, &mut T)> {
        let strider = self.strider;
        self.data
            .iter_mut()
            .enumerate()
            .map(move |(index, value)| (strider.point_unchecked(index), value))
    }

    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        self.data.fill(value);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Strider {
    size: Vector2<usize>,
}

impl Strider {
    pub fn new(size: Vector2<usize>) -> Self {
        Self { size }
    }

    pub fn size(&self) -> &Vector2<usize> {
        &self.size
    }

    pub fn len(&self) -> usize {
        self.size.x * self.size.y
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn point_unchecked(&self, index: usize) -> Point2<usize> {
        Point2::new(index % self.size.x, index / self.size.x)
    }

    pub fn point(&self, index: usize) -> Option<Point2<usize>> {
        (index < self.len()).then(|| self.point_unchecked(index))
    }

    pub fn index_unchecked(&self, point: &Point2<usize>) -> usize {
        point.y * self.size.x + point.x
    }

    pub fn index(&self, point: &Point2<usize>) -> Option<usize> {
        self.is_inside(point).then(|| self.index_unchecked(point))
    }

    pub fn is_inside(&self, point: &Point2<usize>) -> bool {
        point.x < self.size.x && point.y < self.size.y
    }

    pub fn iter(&self, range: impl RangeBounds<Point2<usize>>) -> StriderIter {
        StriderIter {
            points: iter_points(range, self.size),
            strider: *self,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StriderIter {
    points: PointIter,
    strider: Strider,
}

impl Iterator for StriderIter {
    type Item = (usize, Point2<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        let point = self.points.next()?;
        let index = self.strider.index_unchecked(&point);
        Some((index, point))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.points.size_hint()
    }
}

impl ExactSizeIterator for StriderIter where PointIter: ExactSizeIterator {}

pub fn iter_points(range: impl RangeBounds<Point2<usize>>, size: Vector2<usize>) -> PointIter {
    let Range { start, end } = normalize_point_bounds(range, size);
    let empty = start.x == end.x || start.y == end.y;

    PointIter {
        x0: start.coords,
        x1: end.coords,
        x: (!empty).then_some(start.coords),
    }
}

pub fn normalize_point_bounds(
    range: impl RangeBounds<Point2<usize>>,
    size: Vector2<usize>,
) -> Range<Point2<usize>> {
    let start = match range.start_bound() {
        Bound::Included(start) => *start,
        Bound::Excluded(start) => start + Vector2::repeat(1),
        Bound::Unbounded => Point2::origin(),
    };

    let end = match range.end_bound() {
        Bound::Included(end) => end + Vector2::repeat(1),
        Bound::Excluded(end) => *end,
        Bound::Unbounded => size.into(),
    };

    let end = start
        .coords
        .zip_map(&end.coords, |x0, x1| x0.max(x1))
        .into();

    Range { start, end }
}

/// Iterates over the points in a rectangle, row by row.
#[derive(Clone, Copy, Debug)]
pub struct PointIter {
    x0: Vector2<usize>,
    x1: Vector2<usize>,
    x: Option<Vector2<usize>>,
}

impl Iterator for PointIter {
    type Item = Point2<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = |mut x_n: Vector2<usize>| {
            x_n.x += 1;
            if x_n.x >= self.x1.x {
                x_n.x = self.x0.x;
                x_n.y += 1;
                if x_n.y >= self.x1.y {
                    return None;
                }
            }
            Some(x_n)
        };

        let x = self.x?;
        self.x = next(x);
        Some(Point2::from(x))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.x.map_or(0, |x| {
            let width = self.x1.x - self.x0.x;
            (self.x1.y - x.y) * width - (x.x - self.x0.x)
        });
        (n, Some(n))
    }
}

impl ExactSizeIterator for PointIter {}
