use crate::bbox::BBox;
use crate::bsdf::BSDF;
use crate::point::Point3;
use crate::ray::Ray;
use crate::vector::Vector3;

use std::sync::Arc;

// Populated only by a successful `intersect` call. `t` always lands in
// `[ray.min_t, ray.max_t]` at the point of return.
pub struct Intersection {
    pub t: f64,
    pub n: Vector3,
    pub bsdf: Arc<BSDF>,
}

impl Intersection {
    pub fn new_empty() -> Intersection {
        Intersection {
            t: 0.0_f64,
            n: Vector3::new_empty(),
            bsdf: Arc::new(BSDF::Diffuse(crate::bsdf::Diffuse {
                albedo: crate::color::RGB::black(),
            })),
        }
    }
}

pub trait Primitive {
    fn bbox(&self) -> BBox;
    fn has_intersection(&self, r: &Ray) -> bool;
    fn intersect(&self, r: &Ray, isect: &mut Intersection) -> bool;
}

pub struct Sphere {
    pub center: Point3,
    pub radius: f64,
    pub bsdf: Arc<BSDF>,
}

impl Sphere {
    pub fn new(center: Point3, radius: f64, bsdf: Arc<BSDF>) -> Sphere {
        Sphere {
            center: center,
            radius: radius,
            bsdf: bsdf,
        }
    }

    // Returns both roots, near then far, unordered by validity.
    fn test(&self, r: &Ray) -> Option<(f64, f64)> {
        debug_assert!(self.radius > 0.0_f64, "sphere radius must be positive");
        let towards_origin = r.origin - self.center;
        let b = towards_origin.dot(r.dir);
        let c = towards_origin.dot(towards_origin) - (self.radius * self.radius);
        let delta = b * b - c;

        if delta < 0.0_f64 {
            return None;
        }

        let sqrt_delta = delta.sqrt();
        Some((-b - sqrt_delta, -b + sqrt_delta))
    }
}

impl Primitive for Sphere {
    fn bbox(&self) -> BBox {
        BBox::new(
            self.center - Vector3::new(self.radius, self.radius, self.radius),
            self.center + Vector3::new(self.radius, self.radius, self.radius),
        )
    }

    fn has_intersection(&self, r: &Ray) -> bool {
        match self.test(r) {
            Some((t1, t2)) => {
                let max_t = r.max_t.get();
                (t1 >= r.min_t && t1 <= max_t) || (t2 >= r.min_t && t2 <= max_t)
            }
            None => false,
        }
    }

    fn intersect(&self, r: &Ray, isect: &mut Intersection) -> bool {
        let (t1, t2) = match self.test(r) {
            Some(roots) => roots,
            None => return false,
        };

        let max_t = r.max_t.get();
        // The near root's outward normal points away from the center; the
        // far root (ray origin inside the sphere) is flipped to face the
        // same way the ray entered.
        let (t, n) = if t1 >= r.min_t && t1 <= max_t {
            (t1, (r.point_at(t1) - self.center).normalized())
        } else if t2 >= r.min_t && t2 <= max_t {
            (t2, -(r.point_at(t2) - self.center).normalized())
        } else {
            return false;
        };

        isect.t = t;
        isect.n = n;
        isect.bsdf = Arc::clone(&self.bsdf);
        r.max_t.set(t);
        true
    }
}

pub struct TriangleMesh {
    pub vertices: Vec<Point3>,
    pub bsdf: Arc<BSDF>,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<Point3>, bsdf: Arc<BSDF>) -> TriangleMesh {
        TriangleMesh {
            vertices: vertices,
            bsdf: bsdf,
        }
    }
}

pub struct Triangle {
    pub mesh: Arc<TriangleMesh>,
    pub v0: usize,
    pub v1: usize,
    pub v2: usize,
}

impl Triangle {
    pub fn new(mesh: Arc<TriangleMesh>, v0: usize, v1: usize, v2: usize) -> Triangle {
        Triangle {
            mesh: mesh,
            v0: v0,
            v1: v1,
            v2: v2,
        }
    }

    fn vertices(&self) -> (Point3, Point3, Point3) {
        (
            self.mesh.vertices[self.v0],
            self.mesh.vertices[self.v1],
            self.mesh.vertices[self.v2],
        )
    }

    // Moller-Trumbore ray-triangle intersection, no backface culling.
    // https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm
    fn test(&self, r: &Ray) -> Option<f64> {
        let (vertex0, vertex1, vertex2) = self.vertices();

        let edge1 = vertex1 - vertex0;
        let edge2 = vertex2 - vertex0;
        debug_assert!(
            edge1.squared_length() > 0.0_f64 && edge2.squared_length() > 0.0_f64,
            "triangle vertices must not coincide"
        );
        let p_vec = r.dir.cross(edge2);
        let determinant = edge1.dot(p_vec);

        if determinant > -std::f64::EPSILON && determinant < std::f64::EPSILON {
            return None;
        }

        let inverse_determinant = 1.0_f64 / determinant;
        let t_vec = r.origin - vertex0;
        let u = t_vec.dot(p_vec) * inverse_determinant;
        if u < 0.0_f64 || u > 1.0_f64 {
            return None;
        }

        let q_vec = t_vec.cross(edge1);
        let v = r.dir.dot(q_vec) * inverse_determinant;
        if v < 0.0_f64 || u + v > 1.0_f64 {
            return None;
        }

        let t_hit = edge2.dot(q_vec) * inverse_determinant;
        let max_t = r.max_t.get();
        if t_hit > r.min_t && t_hit < max_t {
            Some(t_hit)
        } else {
            None
        }
    }

    fn geometric_normal(&self, r: &Ray) -> Vector3 {
        let (vertex0, vertex1, vertex2) = self.vertices();
        let edge1 = vertex1 - vertex0;
        let edge2 = vertex2 - vertex0;
        let p_vec = r.dir.cross(edge2);
        let determinant = edge1.dot(p_vec);

        let mut normal = edge1.cross(edge2).normalized();
        if determinant < 0.0_f64 {
            normal = -normal;
        }
        normal
    }
}

impl Primitive for Triangle {
    fn bbox(&self) -> BBox {
        let (vertex0, vertex1, vertex2) = self.vertices();
        BBox::new(
            Point3::min(vertex0, Point3::min(vertex1, vertex2)),
            Point3::max(vertex0, Point3::max(vertex1, vertex2)),
        )
    }

    fn has_intersection(&self, r: &Ray) -> bool {
        self.test(r).is_some()
    }

    fn intersect(&self, r: &Ray, isect: &mut Intersection) -> bool {
        match self.test(r) {
            Some(t) => {
                isect.t = t;
                isect.n = self.geometric_normal(r);
                isect.bsdf = Arc::clone(&self.mesh.bsdf);
                r.max_t.set(t);
                true
            }
            None => false,
        }
    }
}

// A primitive owns either concrete shape, erased behind a closed enum
// (rather than `Box<dyn Primitive>`) so the BVH's per-node array stays a
// flat, cache-friendly `Vec` with no per-element heap indirection.
pub enum AnyPrimitive {
    Sphere(Sphere),
    Triangle(Triangle),
}

impl Primitive for AnyPrimitive {
    fn bbox(&self) -> BBox {
        match self {
            AnyPrimitive::Sphere(s) => s.bbox(),
            AnyPrimitive::Triangle(t) => t.bbox(),
        }
    }

    fn has_intersection(&self, r: &Ray) -> bool {
        match self {
            AnyPrimitive::Sphere(s) => s.has_intersection(r),
            AnyPrimitive::Triangle(t) => t.has_intersection(r),
        }
    }

    fn intersect(&self, r: &Ray, isect: &mut Intersection) -> bool {
        match self {
            AnyPrimitive::Sphere(s) => s.intersect(r, isect),
            AnyPrimitive::Triangle(t) => t.intersect(r, isect),
        }
    }
}
