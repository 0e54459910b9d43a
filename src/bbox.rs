use crate::point::Point3;
use crate::ray::Ray;
use crate::vector::{Axis, Vector3, AXES};

use std::mem;

// Axis aligned bounding box. `min`/`max` both default to the origin for a
// box with no volume yet, which is what `new_empty` plus repeated
// `expand`/`union` calls builds up during BVH construction.
pub struct BBox {
    pub min: Point3,
    pub max: Point3,
}

impl Copy for BBox {}
impl Clone for BBox {
    fn clone(&self) -> BBox {
        *self
    }
}

impl BBox {
    pub fn new(min: Point3, max: Point3) -> BBox {
        BBox { min: min, max: max }
    }

    pub fn new_empty() -> BBox {
        BBox {
            min: Point3::origin(),
            max: Point3::origin(),
        }
    }

    pub fn union(box1: &BBox, box2: &BBox) -> BBox {
        BBox {
            min: Point3::min(box1.min, box2.min),
            max: Point3::max(box1.max, box2.max),
        }
    }

    pub fn union_point(box1: &BBox, point: &Point3) -> BBox {
        BBox {
            min: Point3::min(box1.min, *point),
            max: Point3::max(box1.max, *point),
        }
    }

    pub fn expand(&self, other: &BBox) -> BBox {
        BBox::union(self, other)
    }

    pub fn centroid(&self) -> Point3 {
        Point3::new(
            self.min.x() * 0.5_f64 + self.max.x() * 0.5_f64,
            self.min.y() * 0.5_f64 + self.max.y() * 0.5_f64,
            self.min.z() * 0.5_f64 + self.max.z() * 0.5_f64,
        )
    }

    pub fn extent(&self) -> Vector3 {
        self.max - self.min
    }

    // `intersect` answers only whether the slab window [t_min, t_max]
    // contains a hit; `intersect_range` additionally hands back
    // (t_enter, t_exit) so the BVH can order child traversal.
    pub fn intersect(&self, r: &Ray, t_min: f64, t_max: f64) -> bool {
        let (t_enter, t_exit) = self.slabs(r, t_min, t_max);
        t_exit > t_enter
    }

    pub fn intersect_range(&self, r: &Ray) -> Option<(f64, f64)> {
        let (t_enter, t_exit) = self.slabs(r, r.min_t, r.max_t.get());
        if t_exit > 0.0_f64 && t_enter < t_exit {
            Some((t_enter, t_exit))
        } else {
            None
        }
    }

    fn slabs(&self, r: &Ray, t_min: f64, t_max: f64) -> (f64, f64) {
        let mut t_enter = t_min;
        let mut t_exit = t_max;
        for axis in AXES.iter() {
            let (t0, t1) = self.slab(r, *axis);
            t_enter = if t0 > t_enter { t0 } else { t_enter };
            t_exit = if t1 < t_exit { t1 } else { t_exit };
            if t_exit <= t_enter {
                return (t_enter, t_exit);
            }
        }
        (t_enter, t_exit)
    }

    fn slab(&self, r: &Ray, axis: Axis) -> (f64, f64) {
        let inverse_direction = 1.0_f64 / r.dir[axis];
        let mut t0 = (self.min[axis] - r.origin[axis]) * inverse_direction;
        let mut t1 = (self.max[axis] - r.origin[axis]) * inverse_direction;
        if inverse_direction < 0.0_f64 {
            mem::swap(&mut t0, &mut t1);
        }
        (t0, t1)
    }
}

#[cfg(test)]
mod bbox_tests {
    use super::*;
    use crate::vector::Vector3;

    #[test]
    fn slab_intersection_hits_a_box_straddling_the_ray() {
        let bb = BBox::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let r = Ray::new(Point3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(bb.intersect(&r, r.min_t, r.max_t.get()));
    }

    #[test]
    fn slab_intersection_misses_a_box_off_to_the_side() {
        let bb = BBox::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let r = Ray::new(Point3::new(10.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(!bb.intersect(&r, r.min_t, r.max_t.get()));
    }

    #[test]
    fn inflating_a_box_never_loses_an_existing_hit_and_t_enter_does_not_increase() {
        let bb = BBox::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let bigger = BBox::new(Point3::new(-2.0, -2.0, -2.0), Point3::new(2.0, 2.0, 2.0));
        let r = Ray::new(Point3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));

        let (t_enter, _) = bb.intersect_range(&r).unwrap();
        let (bigger_t_enter, _) = bigger.intersect_range(&r).unwrap();
        assert!(bigger_t_enter <= t_enter);
    }

    #[test]
    fn zero_direction_component_does_not_panic_and_follows_ieee_754_semantics() {
        let bb = BBox::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        // Ray travels parallel to the x=const slab but starts inside its span.
        let r = Ray::new(Point3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(bb.intersect(&r, r.min_t, r.max_t.get()));

        // And a ray that starts outside the slab's span, parallel to it, must miss.
        let r_outside = Ray::new(Point3::new(5.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(!bb.intersect(&r_outside, r_outside.min_t, r_outside.max_t.get()));
    }

    #[test]
    fn centroid_is_the_midpoint_of_min_and_max() {
        let bb = BBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 4.0, 6.0));
        let c = bb.centroid();
        assert_eq!(c.x(), 1.0);
        assert_eq!(c.y(), 2.0);
        assert_eq!(c.z(), 3.0);
    }
}
