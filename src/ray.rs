use crate::point::Point3;
use crate::utils;
use crate::vector::Vector3;

use std::cell::Cell;

// `max_t` shrinks during BVH traversal as closer hits are found, so it is
// kept in a Cell: intersection routines take `&Ray`, not `&mut Ray`, which
// lets the BVH hand out shared references to a single ray while every
// primitive test along the way narrows the search window. See bvh.rs.
pub struct Ray {
    pub origin: Point3,
    pub dir: Vector3,
    pub min_t: f64,
    pub max_t: Cell<f64>,
}

impl Ray {
    // A fresh primary/camera ray, using the renderer-wide default bounds.
    pub fn new(origin: Point3, dir: Vector3) -> Ray {
        Ray::new_bounded(origin, dir, utils::T_MIN, utils::T_MAX)
    }

    // A ray with an explicit min_t (e.g. a shadow ray offset past the
    // surface it left) and/or a pre-shrunk max_t.
    pub fn new_bounded(origin: Point3, dir: Vector3, min_t: f64, max_t: f64) -> Ray {
        Ray {
            origin: origin,
            dir: dir,
            min_t: min_t,
            max_t: Cell::new(max_t),
        }
    }

    pub fn point_at(&self, t: f64) -> Point3 {
        self.origin + (self.dir * t)
    }
}
