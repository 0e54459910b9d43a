use crate::vector::Vector3;

use rand;
use std::f64;

pub const T_MIN: f64 = 0.001_f64;
pub const T_MAX: f64 = std::f64::MAX;

pub fn random_unit_disk() -> Vector3 {
    let x = 2.0_f64 * rand::random::<f64>() - 1.0_f64;
    let y = (1.0_f64 - x * x).sqrt();
    Vector3::new(x, y, 0.0_f64)
}

pub fn unit_sphere_random() -> Vector3 {
    let azimuth = rand::random::<f64>() * std::f64::consts::PI * 2.0_f64;
    let y = rand::random::<f64>();
    let sin_elevation = (1.0_f64 - y * y).sqrt();
    let x = sin_elevation * azimuth.cos();
    let z = sin_elevation * azimuth.sin();

    Vector3::new(x, y, z)
}

// Cosine-weighted direction in the local frame where z is "up" (the
// surface normal). Used to importance-sample the Lambertian BRDF.
pub fn random_cosine_direction() -> Vector3 {
    let r1 = rand::random::<f64>();
    let r2 = rand::random::<f64>();
    let z = (1.0_f64 - r2).sqrt();

    let phi = 2.0_f64 * f64::consts::PI * r1;
    let x = phi.cos() * r2.sqrt();
    let y = phi.sin() * r2.sqrt();

    Vector3::new(x, y, z)
}

// Direction toward a sphere light's solid angle cone, local frame z-up.
pub fn random_to_sphere(radius: f64, distance_squared: f64) -> Vector3 {
    let r1 = rand::random::<f64>();
    let r2 = rand::random::<f64>();
    let z = 1.0_f64
        + r2 * (float_max(1.0_f64 - radius * radius / distance_squared, 0.0_f64).sqrt() - 1.0_f64);

    let phi = 2.0_f64 * f64::consts::PI * r1;
    let x = phi.cos() * float_max(1.0_f64 - z * z, 0.0_f64).sqrt();
    let y = phi.sin() * float_max(1.0_f64 - z * z, 0.0_f64).sqrt();

    Vector3::new(x, y, z)
}

pub fn clamp(v: f64, min: f64, max: f64) -> f64 {
    if v > max {
        max
    } else if v < min {
        min
    } else {
        v
    }
}

pub fn float_max(f: f64, max: f64) -> f64 {
    if f > max {
        f
    } else {
        max
    }
}

pub fn float_min(f: f64, min: f64) -> f64 {
    if f < min {
        f
    } else {
        min
    }
}

pub fn lerp(t: f64, a: f64, b: f64) -> f64 {
    return (1_f64 - t) * a + t * b;
}

pub struct OrthonormalBasis {
    axis: [Vector3; 3],
}

impl OrthonormalBasis {
    pub fn new(v: &Vector3) -> OrthonormalBasis {
        let mut o = OrthonormalBasis {
            axis: [Vector3::new_empty(); 3],
        };
        o.axis[2] = *v;
        let a = if v.x().abs() > 0.9_f64 {
            Vector3::new(0.0_f64, 1.0_f64, 0.0_f64)
        } else {
            Vector3::new(1.0_f64, 0.0_f64, 0.0_f64)
        };
        o.axis[1] = v.cross(a).normalized();
        o.axis[0] = v.cross(o.axis[1]);
        return o;
    }

    pub fn local(&self, v: &Vector3) -> Vector3 {
        (v.x() * self.axis[0]) + (v.y() * self.axis[1]) + (v.z() * self.axis[2])
    }

    // The inverse of `local`: projects a world-space direction into this
    // basis's (u, v, w) frame.
    pub fn local_to_world_inverse(&self, world_dir: &Vector3) -> Vector3 {
        Vector3::new(
            world_dir.dot(self.u()),
            world_dir.dot(self.v()),
            world_dir.dot(self.w()),
        )
    }

    pub fn u(&self) -> Vector3 {
        self.axis[0]
    }

    pub fn v(&self) -> Vector3 {
        self.axis[1]
    }

    pub fn w(&self) -> Vector3 {
        self.axis[2]
    }
}
