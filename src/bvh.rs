use crate::bbox::BBox;
use crate::primitive::{AnyPrimitive, Intersection, Primitive};
use crate::ray::Ray;
use crate::vector::{Axis, AXES};

use std::sync::atomic::{AtomicUsize, Ordering};

// One entry in the flat arena. A node is a leaf iff `right_offset` is
// `None`; its primitives are the contiguous range `[start, end)` of the
// BVH's (permuted, never reordered again) primitive array. The left
// child of an internal node is implicitly the next arena slot; the right
// child sits `right_offset` slots ahead.
struct BVHNode {
    bb: BBox,
    start: usize,
    end: usize,
    right_offset: Option<usize>,
}

pub struct BVH {
    nodes: Vec<BVHNode>,
    primitives: Vec<AnyPrimitive>,
    total_isects: AtomicUsize,
}

impl BVH {
    pub fn new(primitives: Vec<AnyPrimitive>, max_leaf_size: usize) -> BVH {
        let mut primitives = primitives;
        let mut nodes = Vec::new();
        if !primitives.is_empty() {
            let end = primitives.len();
            build(&mut nodes, &mut primitives, 0, end, max_leaf_size);
        }
        BVH {
            nodes: nodes,
            primitives: primitives,
            total_isects: AtomicUsize::new(0),
        }
    }

    pub fn total_isects(&self) -> usize {
        self.total_isects.load(Ordering::Relaxed)
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.nodes.first().map(|n| n.bb)
    }

    pub fn has_intersection(&self, r: &Ray) -> bool {
        debug_assert!(
            r.dir.squared_length() > 0.0_f64,
            "ray direction must be non-zero"
        );
        if self.nodes.is_empty() {
            return false;
        }

        let mut to_explore = vec![0_usize];

        while let Some(cur_idx) = to_explore.pop() {
            let node = &self.nodes[cur_idx];
            if node.bb.intersect_range(r).is_none() {
                continue;
            }

            match node.right_offset {
                None => {
                    for idx in node.start..node.end {
                        self.total_isects.fetch_add(1, Ordering::Relaxed);
                        if self.primitives[idx].has_intersection(r) {
                            return true;
                        }
                    }
                }
                Some(offset) => self.push_children(&mut to_explore, r, cur_idx, offset),
            }
        }

        false
    }

    pub fn intersect(&self, r: &Ray, isect: &mut Intersection) -> bool {
        debug_assert!(
            r.dir.squared_length() > 0.0_f64,
            "ray direction must be non-zero"
        );
        if self.nodes.is_empty() {
            return false;
        }

        let mut to_explore = vec![0_usize];
        let mut hit = false;

        while let Some(cur_idx) = to_explore.pop() {
            let node = &self.nodes[cur_idx];
            if node.bb.intersect_range(r).is_none() {
                continue;
            }

            match node.right_offset {
                None => {
                    for idx in node.start..node.end {
                        self.total_isects.fetch_add(1, Ordering::Relaxed);
                        hit = self.primitives[idx].intersect(r, isect) || hit;
                    }
                }
                Some(offset) => self.push_children(&mut to_explore, r, cur_idx, offset),
            }
        }

        hit
    }

    // Pushes whichever children the ray can still reach onto the explicit
    // stack, nearer entry distance last (so it pops, i.e. is visited,
    // first) and a child the ray's current max_t has already pruned past
    // not pushed at all. Both are correctness-preserving optimizations --
    // `intersect` still visits every reachable child and `has_intersection`
    // doesn't depend on visit order to be correct -- but skipping a
    // provably-out-of-range child here saves the redundant bbox test and
    // stack push that popping it would otherwise cost.
    fn push_children(&self, to_explore: &mut Vec<usize>, r: &Ray, cur_idx: usize, right_offset: usize) {
        let left = cur_idx + 1;
        let right = cur_idx + right_offset;
        let left_t_enter = self.nodes[left].bb.intersect_range(r).map(|(t_enter, _)| t_enter);
        let right_t_enter = self.nodes[right].bb.intersect_range(r).map(|(t_enter, _)| t_enter);

        match (left_t_enter, right_t_enter) {
            (None, None) => {}
            (Some(_), None) => to_explore.push(left),
            (None, Some(_)) => to_explore.push(right),
            (Some(lt), Some(rt)) => {
                if lt <= rt {
                    to_explore.push(right);
                    to_explore.push(left);
                } else {
                    to_explore.push(left);
                    to_explore.push(right);
                }
            }
        }
    }
}

fn build(
    nodes: &mut Vec<BVHNode>,
    primitives: &mut Vec<AnyPrimitive>,
    start: usize,
    end: usize,
    max_leaf_size: usize,
) {
    let mut total_bounds = BBox::new_empty();
    let mut first = true;
    for idx in start..end {
        let bb = primitives[idx].bbox();
        total_bounds = if first {
            bb
        } else {
            BBox::union(&total_bounds, &bb)
        };
        first = false;
    }

    if end - start <= max_leaf_size {
        nodes.push(BVHNode {
            bb: total_bounds,
            start: start,
            end: end,
            right_offset: None,
        });
        return;
    }

    // Mean and variance of centroids over the range, one pass each axis.
    let mut mean = [0.0_f64; 3];
    let mut mean_sq = [0.0_f64; 3];
    let count = (end - start) as f64;
    for idx in start..end {
        let c = primitives[idx].bbox().centroid();
        for axis in AXES.iter() {
            let v = c[*axis];
            mean[axis_index(*axis)] += v / count;
            mean_sq[axis_index(*axis)] += (v * v) / count;
        }
    }
    let variance: Vec<f64> = (0..3).map(|i| mean_sq[i] - mean[i] * mean[i]).collect();

    let mut cut_axis = Axis::X;
    for axis in [Axis::Y, Axis::Z].iter() {
        if variance[axis_index(*axis)] > variance[axis_index(cut_axis)] {
            cut_axis = *axis;
        }
    }
    let mid = mean[axis_index(cut_axis)];

    // In-place partition: everything with centroid[axis] <= mid moves to
    // the front of the range, the rest to the back. A pure permutation;
    // no side vectors are allocated.
    let mut split = start;
    for idx in start..end {
        if primitives[idx].bbox().centroid()[cut_axis] <= mid {
            primitives.swap(idx, split);
            split += 1;
        }
    }

    if split == start || split == end {
        // Degenerate/collinear range: every centroid landed on one side.
        // Recursing again would loop forever, so keep this range as a leaf.
        nodes.push(BVHNode {
            bb: total_bounds,
            start: start,
            end: end,
            right_offset: None,
        });
        return;
    }

    let node_idx = nodes.len();
    nodes.push(BVHNode {
        bb: total_bounds,
        start: start,
        end: end,
        right_offset: Some(0), // placeholder, fixed up below
    });

    build(nodes, primitives, start, split, max_leaf_size);

    let right_offset = nodes.len() - node_idx;
    nodes[node_idx].right_offset = Some(right_offset);

    build(nodes, primitives, split, end, max_leaf_size);
}

fn axis_index(axis: Axis) -> usize {
    match axis {
        Axis::X => 0,
        Axis::Y => 1,
        Axis::Z => 2,
    }
}

#[cfg(test)]
mod bvh_tests {
    use super::*;
    use crate::bsdf::{Diffuse, BSDF};
    use crate::color::RGB;
    use crate::point::Point3;
    use crate::primitive::Sphere;
    use crate::vector::Vector3;
    use std::sync::Arc;

    fn diffuse_bsdf() -> Arc<BSDF> {
        Arc::new(BSDF::Diffuse(Diffuse {
            albedo: RGB::new(1.0, 1.0, 1.0),
        }))
    }

    fn sphere_at(x: f64) -> AnyPrimitive {
        AnyPrimitive::Sphere(Sphere::new(Point3::new(x, 0.0, 0.0), 0.5, diffuse_bsdf()))
    }

    #[test]
    fn every_primitive_is_reachable_through_traversal() {
        let spheres: Vec<AnyPrimitive> = (0..20).map(|i| sphere_at(i as f64 * 3.0)).collect();
        let bvh = BVH::new(spheres, 2);

        for i in 0..20 {
            let x = i as f64 * 3.0;
            let r = Ray::new(Point3::new(x, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
            let mut isect = Intersection::new_empty();
            assert!(bvh.intersect(&r, &mut isect), "expected a hit near x={}", x);
        }
    }

    #[test]
    fn a_ray_between_spheres_misses_everything() {
        let spheres: Vec<AnyPrimitive> = (0..10).map(|i| sphere_at(i as f64 * 3.0)).collect();
        let bvh = BVH::new(spheres, 2);

        let r = Ray::new(Point3::new(1.5, 5.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(!bvh.has_intersection(&r));
    }

    #[test]
    fn closest_hit_is_the_nearest_along_the_ray() {
        let spheres = vec![sphere_at(0.0), sphere_at(10.0)];
        let bvh = BVH::new(spheres, 1);

        let r = Ray::new(Point3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        let mut isect = Intersection::new_empty();
        assert!(bvh.intersect(&r, &mut isect));
        assert!((isect.t - 4.5).abs() < 1e-9);
    }

    #[test]
    fn total_isects_counts_at_least_one_primitive_test_per_query() {
        let spheres: Vec<AnyPrimitive> = (0..5).map(|i| sphere_at(i as f64 * 3.0)).collect();
        let bvh = BVH::new(spheres, 2);
        let r = Ray::new(Point3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        let mut isect = Intersection::new_empty();
        bvh.intersect(&r, &mut isect);
        assert!(bvh.total_isects() >= 1);
    }

    // Mirrors Sphere::test/intersect's quadratic solve, used below as an
    // independent (non-BVH) ground truth.
    fn brute_force_nearest(
        spheres: &[(Point3, f64)],
        origin: Point3,
        dir: Vector3,
        min_t: f64,
    ) -> Option<f64> {
        let mut best: Option<f64> = None;
        for (center, radius) in spheres {
            let towards_origin = origin - *center;
            let b = towards_origin.dot(dir);
            let c = towards_origin.dot(towards_origin) - (radius * radius);
            let delta = b * b - c;
            if delta < 0.0_f64 {
                continue;
            }
            let sqrt_delta = delta.sqrt();
            for t in [-b - sqrt_delta, -b + sqrt_delta].iter() {
                if *t >= min_t && best.map_or(true, |cur| *t < cur) {
                    best = Some(*t);
                }
            }
        }
        best
    }

    // S5: for many random spheres and many random rays, the BVH's reported
    // closest hit agrees with a brute-force linear scan over every
    // primitive. Seeded so the case is reproducible across runs.
    #[test]
    fn closest_hit_matches_brute_force_over_random_spheres_and_rays() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(0xB0A7);

        let centers_radii: Vec<(Point3, f64)> = (0..300)
            .map(|_| {
                let center = Point3::new(
                    rng.gen_range(-20.0, 20.0),
                    rng.gen_range(-20.0, 20.0),
                    rng.gen_range(-20.0, 20.0),
                );
                let radius = rng.gen_range(0.1, 2.0);
                (center, radius)
            })
            .collect();

        let spheres: Vec<AnyPrimitive> = centers_radii
            .iter()
            .map(|(c, r)| AnyPrimitive::Sphere(Sphere::new(*c, *r, diffuse_bsdf())))
            .collect();
        let bvh = BVH::new(spheres, 4);

        for _ in 0..300 {
            let origin = Point3::new(
                rng.gen_range(-30.0, 30.0),
                rng.gen_range(-30.0, 30.0),
                rng.gen_range(-30.0, 30.0),
            );
            let dir = Vector3::new(
                rng.gen_range(-1.0, 1.0),
                rng.gen_range(-1.0, 1.0),
                rng.gen_range(-1.0, 1.0),
            )
            .normalized();

            let r = Ray::new(origin, dir);
            let mut isect = Intersection::new_empty();
            let bvh_hit = bvh.intersect(&r, &mut isect);
            let expected = brute_force_nearest(&centers_radii, origin, dir, r.min_t);

            assert_eq!(
                bvh_hit,
                expected.is_some(),
                "hit mismatch at origin=({}, {}, {}) dir=({}, {}, {})",
                origin.x(),
                origin.y(),
                origin.z(),
                dir.x(),
                dir.y(),
                dir.z()
            );
            if let Some(expected_t) = expected {
                assert!(
                    (isect.t - expected_t).abs() < 1e-6,
                    "t mismatch: bvh={} brute_force={}",
                    isect.t,
                    expected_t
                );
            }
        }
    }
}
