use nalgebra::Point2;
use serde::{
    Deserialize,
    Serialize,
};

use crate::lattice::Strider;

// todo: conductivity, once the update equations carry a per-cell `Ca`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// epsilon_r
    pub relative_permittivity: f64,
}

impl Material {
    pub const VACUUM: Self = Self {
        relative_permittivity: 1.0,
    };

    /// Glass-like dielectric with refractive index 2.
    pub const GLASS: Self = Self {
        relative_permittivity: 4.0,
    };

    pub fn refractive_index(&self) -> f64 {
        self.relative_permittivity.sqrt()
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::VACUUM
    }
}

pub trait Rasterize {
    /// Cells covered by the shape, clipped to the lattice.
    fn rasterize(&self, strider: &Strider) -> impl Iterator<Item = Point2<usize>> + '_;

    fn contains(&self, point: &Point2<usize>) -> bool;
}

/// Region geometry in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    /// Axis-aligned block. `max` is exclusive.
    Block {
        min: Point2<usize>,
        max: Point2<usize>,
    },
    Disk {
        center: Point2<usize>,
        radius: f64,
    },
}

impl Shape {
    /// Block spanning the full height between `x0` and `x1` (exclusive).
    pub fn slab(x0: usize, x1: usize, height: usize) -> Self {
        Self::Block {
            min: Point2::new(x0, 0),
            max: Point2::new(x1, height),
        }
    }

    /// Whether the shape's anchor lies inside a lattice with the given
    /// strider. Disks may extend past the edge and are clipped.
    pub fn fits(&self, strider: &Strider) -> bool {
        let size = strider.size();
        match self {
            Shape::Block { min, max } => {
                min.x <= max.x && min.y <= max.y && max.x <= size.x && max.y <= size.y
            }
            Shape::Disk { center, radius } => {
                strider.is_inside(center) && radius.is_finite() && *radius >= 0.0
            }
        }
    }
}

impl Rasterize for Shape {
    fn rasterize(&self, strider: &Strider) -> impl Iterator<Item = Point2<usize>> + '_ {
        let size = strider.size();
        let (x0, x1) = match self {
            Shape::Block { min, max } => {
                (*min, Point2::new(max.x.min(size.x), max.y.min(size.y)))
            }
            Shape::Disk { center, radius } => {
                // no disk covers more than the whole lattice
                let r = radius.max(0.0).ceil().min(size.x.max(size.y) as f64) as usize;
                (
                    Point2::new(center.x.saturating_sub(r), center.y.saturating_sub(r)),
                    Point2::new(
                        center.x.saturating_add(r + 1).min(size.x),
                        center.y.saturating_add(r + 1).min(size.y),
                    ),
                )
            }
        };

        strider
            .iter(x0..x1)
            .map(|(_index, point)| point)
            .filter(move |point| self.contains(point))
    }

    fn contains(&self, point: &Point2<usize>) -> bool {
        match self {
            Shape::Block { min, max } => {
                point.x >= min.x && point.x < max.x && point.y >= min.y && point.y < max.y
            }
            Shape::Disk { center, radius } => {
                let d = point.cast::<f64>() - center.cast::<f64>();
                d.norm_squared() <= radius * radius
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialRegion {
    pub shape: Shape,
    pub material: Material,
}

impl MaterialRegion {
    /// Cells of the region that have a 4-neighbour outside of it.
    ///
    /// Used to draw material interfaces on top of rendered frames.
    pub fn outline<'a>(&'a self, strider: &'a Strider) -> impl Iterator<Item = Point2<usize>> + 'a {
        self.shape.rasterize(strider).filter(move |point| {
            let outside = |dx: isize, dy: isize| {
                match (
                    point.x.checked_add_signed(dx),
                    point.y.checked_add_signed(dy),
                ) {
                    (Some(x), Some(y)) => {
                        let neighbour = Point2::new(x, y);
                        strider.is_inside(&neighbour) && !self.shape.contains(&neighbour)
                    }
                    _ => false,
                }
            };
            outside(-1, 0) || outside(1, 0) || outside(0, -1) || outside(0, 1)
        })
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{
        Point2,
        Vector2,
    };

    use crate::{
        lattice::Strider,
        material::{
            Material,
            MaterialRegion,
            Rasterize,
            Shape,
        },
    };

    #[test]
    fn block_rasterizes_half_open() {
        let strider = Strider::new(Vector2::new(10, 10));
        let block = Shape::Block {
            min: Point2::new(2, 3),
            max: Point2::new(4, 5),
        };
        let points = block.rasterize(&strider).collect::<Vec<_>>();
        assert_eq!(
            points,
            vec![
                Point2::new(2, 3),
                Point2::new(3, 3),
                Point2::new(2, 4),
                Point2::new(3, 4),
            ]
        );
    }

    #[test]
    fn disk_is_clipped_to_lattice() {
        let strider = Strider::new(Vector2::new(5, 5));
        let disk = Shape::Disk {
            center: Point2::new(0, 0),
            radius: 1.0,
        };
        assert!(disk.fits(&strider));
        let mut points = disk.rasterize(&strider).collect::<Vec<_>>();
        points.sort_by_key(|p| (p.y, p.x));
        assert_eq!(
            points,
            vec![Point2::new(0, 0), Point2::new(1, 0), Point2::new(0, 1)]
        );
    }

    #[test]
    fn huge_disks_cover_the_lattice() {
        let strider = Strider::new(Vector2::new(6, 4));
        let disk = Shape::Disk {
            center: Point2::new(3, 2),
            radius: 1e30,
        };
        assert!(disk.fits(&strider));
        assert_eq!(disk.rasterize(&strider).count(), 24);
    }

    #[test]
    fn block_must_fit() {
        let strider = Strider::new(Vector2::new(10, 10));
        assert!(Shape::slab(2, 10, 10).fits(&strider));
        assert!(!Shape::slab(2, 11, 10).fits(&strider));
        assert!(!Shape::slab(5, 4, 10).fits(&strider));
    }

    #[test]
    fn slab_outline_marks_interfaces_only() {
        let strider = Strider::new(Vector2::new(8, 3));
        let region = MaterialRegion {
            shape: Shape::slab(3, 6, 3),
            material: Material::GLASS,
        };
        let mut xs = region.outline(&strider).map(|p| p.x).collect::<Vec<_>>();
        xs.sort();
        xs.dedup();
        assert_eq!(xs, vec![3, 5]);
    }

    #[test]
    fn glass_has_refractive_index_two() {
        assert_eq!(Material::GLASS.refractive_index(), 2.0);
        assert_eq!(Material::default(), Material::VACUUM);
    }
}
